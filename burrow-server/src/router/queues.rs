use async_trait::async_trait;
use hyper::{Body, Request, Response};

use burrow_common::EntityDetail;

use crate::{query::Query, router::Args, routes::queues};

pub(crate) struct GetQueuesHandler {
    pub(crate) account: String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for GetQueuesHandler {
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
        queues::get_queues(engine.as_ref(), &self.account, &filter, detail)
            .await
            .into_response()
    }
}

pub(crate) struct DeleteQueuesHandler {
    pub(crate) account: String,
}

#[async_trait]
impl burrow_common::router::Handler<Args> for DeleteQueuesHandler {
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
        queues::delete_queues(engine.as_ref(), &self.account, &filter, detail)
            .await
            .into_response()
    }
}
