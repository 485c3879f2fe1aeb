use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Body, Method, Request, Response};
use serde_json::json;

use burrow_common::router::{Handler, Router, WildcardRouter};
use burrow_engine::{StorageEngine, WaiterRegistry};

use crate::router::{
    accounts::{DeleteAccountsHandler, GetAccountsHandler},
    messages::{
        CreateMessageHandler,
        DeleteMessageHandler,
        DeleteMessagesHandler,
        GetMessageHandler,
        GetMessagesHandler,
        UpdateMessageHandler,
        UpdateMessagesHandler,
    },
    queues::{DeleteQueuesHandler, GetQueuesHandler},
};

mod accounts;
mod messages;
mod queues;

/// What every handler in this crate is invoked with: the storage engine and
/// the waiter registry the HTTP-edge wait loop parks on.
pub(crate) type Args = (Arc<dyn StorageEngine>, Arc<WaiterRegistry>);

struct RootHandler;

#[async_trait]
impl Handler<Args> for RootHandler {
    async fn handle(&self, _args: Args, _req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        crate::routes::BurrowResponse::json_pretty(burrow_common::Status::Ok, &json!(["v1.0"])).into_response()
    }
}

struct MessageSubRouter {
    account:      String,
    queue:        String,
    default_ttl:  i64,
    default_hide: i64,
}

impl WildcardRouter<Args> for MessageSubRouter {
    fn with_segment(&self, segment: &str) -> Router<Args> {
        let account = self.account.clone();
        let queue = self.queue.clone();
        let message = segment.to_string();
        Router::default()
            .with_handler(Method::GET, GetMessageHandler {
                account: account.clone(),
                queue: queue.clone(),
                message: message.clone(),
            })
            .with_handler(Method::DELETE, DeleteMessageHandler {
                account: account.clone(),
                queue: queue.clone(),
                message: message.clone(),
            })
            .with_handler(Method::POST, UpdateMessageHandler {
                account: account.clone(),
                queue: queue.clone(),
                message: message.clone(),
            })
            .with_handler(Method::PUT, CreateMessageHandler {
                account,
                queue,
                message,
                default_ttl: self.default_ttl,
                default_hide: self.default_hide,
            })
    }
}

struct QueueSubRouter {
    account:      String,
    default_ttl:  i64,
    default_hide: i64,
}

impl WildcardRouter<Args> for QueueSubRouter {
    fn with_segment(&self, segment: &str) -> Router<Args> {
        let account = self.account.clone();
        let queue = segment.to_string();
        Router::default()
            .with_handler(Method::GET, GetMessagesHandler {
                account: account.clone(),
                queue: queue.clone(),
            })
            .with_handler(Method::DELETE, DeleteMessagesHandler {
                account: account.clone(),
                queue: queue.clone(),
            })
            .with_handler(Method::POST, UpdateMessagesHandler {
                account: account.clone(),
                queue: queue.clone(),
            })
            .with_wildcard(MessageSubRouter {
                account,
                queue,
                default_ttl: self.default_ttl,
                default_hide: self.default_hide,
            })
    }
}

struct AccountSubRouter {
    default_ttl:  i64,
    default_hide: i64,
}

impl WildcardRouter<Args> for AccountSubRouter {
    fn with_segment(&self, segment: &str) -> Router<Args> {
        let account = segment.to_string();
        Router::default()
            .with_handler(Method::GET, GetQueuesHandler { account: account.clone() })
            .with_handler(Method::DELETE, DeleteQueuesHandler { account: account.clone() })
            .with_wildcard(QueueSubRouter {
                account,
                default_ttl: self.default_ttl,
                default_hide: self.default_hide,
            })
    }
}

/// Build the `/v1.0/{account}/{queue}/{message}` router. `default_ttl` and
/// `default_hide` are used by `create_message` whenever the caller omits the
/// corresponding query parameter.
pub fn make_router(default_ttl: i64, default_hide: i64) -> Router<(Arc<dyn StorageEngine>, Arc<WaiterRegistry>)> {
    Router::new_simple(Method::GET, RootHandler).with_route(
        "v1.0",
        Router::default()
            .with_handler(Method::GET, GetAccountsHandler)
            .with_handler(Method::DELETE, DeleteAccountsHandler)
            .with_wildcard(AccountSubRouter { default_ttl, default_hide }),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use burrow_common::{read_body, test::make_runtime};
    use hyper::StatusCode;

    fn engine_args() -> Args {
        let waiters = Arc::new(WaiterRegistry::new());
        let engine: Arc<dyn StorageEngine> = Arc::new(burrow_engine::InMemoryEngine::new(waiters.clone()));
        (engine, waiters)
    }

    fn req(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::default()).unwrap()
    }

    #[test]
    fn root_lists_versions() {
        let router = make_router(0, 0);
        let handler = router.route(&Method::GET, "/".split('/')).unwrap();
        let rt = make_runtime();
        let mut response = rt.block_on(async { handler.handle(engine_args(), req(Method::GET, "/"), Vec::new()).await });
        assert_eq!(response.status(), StatusCode::OK);
        let body = rt.block_on(async { read_body(response.body_mut(), None).await.unwrap().unwrap() });
        assert_eq!(body, b"[\n  \"v1.0\"\n]".to_vec());
    }

    #[test]
    fn create_then_list_then_delete() {
        let router = make_router(0, 0);
        let args = engine_args();
        let rt = make_runtime();

        let create = router.route(&Method::PUT, "/v1.0/a/q/m1".split('/')).unwrap();
        let response = rt.block_on(async {
            create
                .handle(args.clone(), req(Method::PUT, "/v1.0/a/q/m1"), b"hello".to_vec())
                .await
        });
        assert_eq!(response.status(), StatusCode::CREATED);

        let list = router.route(&Method::GET, "/v1.0/a/q".split('/')).unwrap();
        let mut response = rt.block_on(async { list.handle(args.clone(), req(Method::GET, "/v1.0/a/q"), Vec::new()).await });
        assert_eq!(response.status(), StatusCode::OK);
        let body = rt.block_on(async { read_body(response.body_mut(), None).await.unwrap().unwrap() });
        assert!(!body.is_empty());

        let delete = router.route(&Method::DELETE, "/v1.0/a/q/m1".split('/')).unwrap();
        let response = rt.block_on(async { delete.handle(args, req(Method::DELETE, "/v1.0/a/q/m1"), Vec::new()).await });
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
