use async_trait::async_trait;
use hyper::{Body, Request, Response};

use burrow_common::EntityDetail;

use crate::{query::Query, router::Args, routes::accounts};

pub(crate) struct GetAccountsHandler;

#[async_trait]
impl burrow_common::router::Handler<Args> for GetAccountsHandler {
    async fn handle(&self, (engine, _waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let filter = match query.filter() {
            Ok(filter) => filter,
            Err(err) => return crate::routes::BurrowResponse::from_engine_error(err).into_response(),
        };
        let detail = match query.entity_detail(EntityDetail::Id) {
            Ok(detail) => detail,
            Err(err) => return crate::routes::BurrowResponse::from_engine_error(err).into_response(),
        };
        accounts::get_accounts(engine.as_ref(), &filter, detail).await.into_response()
    }
}

pub(crate) struct DeleteAccountsHandler;

#[async_trait]
impl burrow_common::router::Handler<Args> for DeleteAccountsHandler {
    async fn handle(&self, (engine, _waiters): Args, req: Request<Body>, _body: Vec<u8>) -> Response<Body> {
        let query = Query::from_request(&req);
        let filter = match query.filter() {
            Ok(filter) => filter,
            Err(err) => return crate::routes::BurrowResponse::from_engine_error(err).into_response(),
        };
        let detail = match query.entity_detail(EntityDetail::None) {
            Ok(detail) => detail,
            Err(err) => return crate::routes::BurrowResponse::from_engine_error(err).into_response(),
        };
        accounts::delete_accounts(engine.as_ref(), &filter, detail).await.into_response()
    }
}
