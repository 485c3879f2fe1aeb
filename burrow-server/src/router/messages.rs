use async_trait::async_trait;
use hyper::{Body, Request, Response};

use burrow_common::MessageDetail;

use crate::{query::Query, router::Args, routes::messages};

macro_rules! parsed {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return crate::routes::BurrowResponse::from_engine_error(err).into_response(),
        }
    };
}

pub(crate) struct GetMessagesHandler {
    pub(crate) account: String,
    pub(crate) queue:   String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for GetMessagesHandler {
    async fn handle(&self, (engine, waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let filter = parsed!(query.filter());
        let detail = parsed!(query.message_detail(MessageDetail::All));
        messages::get_messages(engine.as_ref(), waiters.as_ref(), &self.account, &self.queue, &filter, detail)
            .await
            .into_response()
    }
}

pub(crate) struct DeleteMessagesHandler {
    pub(crate) account: String,
    pub(crate) queue:   String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for DeleteMessagesHandler {
    async fn handle(&self, (engine, waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let filter = parsed!(query.filter());
        let detail = parsed!(query.message_detail(MessageDetail::None));
        messages::delete_messages(engine.as_ref(), waiters.as_ref(), &self.account, &self.queue, &filter, detail)
            .await
            .into_response()
    }
}

pub(crate) struct UpdateMessagesHandler {
    pub(crate) account: String,
    pub(crate) queue:   String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for UpdateMessagesHandler {
    async fn handle(&self, (engine, waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let filter = parsed!(query.filter());
        let detail = parsed!(query.message_detail(MessageDetail::None));
        let attrs = parsed!(query.attrs());
        messages::update_messages(engine.as_ref(), waiters.as_ref(), &self.account, &self.queue, &filter, attrs, detail)
            .await
            .into_response()
    }
}

pub(crate) struct GetMessageHandler {
    pub(crate) account: String,
    pub(crate) queue:   String,
    pub(crate) message: String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for GetMessageHandler {
    async fn handle(&self, (engine, _waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let detail = parsed!(query.message_detail(MessageDetail::All));
        messages::get_message(engine.as_ref(), &self.account, &self.queue, &self.message, detail)
            .await
            .into_response()
    }
}

pub(crate) struct DeleteMessageHandler {
    pub(crate) account: String,
    pub(crate) queue:   String,
    pub(crate) message: String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for DeleteMessageHandler {
    async fn handle(&self, (engine, _waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let detail = parsed!(query.message_detail(MessageDetail::None));
        messages::delete_message(engine.as_ref(), &self.account, &self.queue, &self.message, detail)
            .await
            .into_response()
    }
}

pub(crate) struct UpdateMessageHandler {
    pub(crate) account: String,
    pub(crate) queue:   String,
    pub(crate) message: String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for UpdateMessageHandler {
    async fn handle(&self, (engine, _waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let detail = parsed!(query.message_detail(MessageDetail::None));
        let attrs = parsed!(query.attrs());
        messages::update_message(engine.as_ref(), &self.account, &self.queue, &self.message, attrs, detail)
            .await
            .into_response()
    }
}

pub(crate) struct CreateMessageHandler {
    pub(crate) account:      String,
    pub(crate) queue:        String,
    pub(crate) message:      String,
    pub(crate) default_ttl:  i64,
    pub(crate) default_hide: i64,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for CreateMessageHandler {
    fn needs_body(&self) -> bool {
        true
    }

    async fn handle(&self, (engine, _waiters): Args, req: Request<Body>, body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let attrs = parsed!(query.attrs());
        messages::create_message(
            engine.as_ref(),
            &self.account,
            &self.queue,
            &self.message,
            body,
            attrs,
            self.default_ttl,
            self.default_hide,
        )
        .await
        .into_response()
    }
}
