use burrow_common::{EntityDetail, Filter};
use burrow_engine::StorageEngine;

use crate::routes::{entity_list_response, BurrowResponse};

pub(crate) async fn get_queues(engine: &dyn StorageEngine, account: &str, filter: &Filter, detail: EntityDetail) -> BurrowResponse {
    match engine.get_queues(account, filter, detail).await {
        Ok(queues) => entity_list_response(&queues),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

pub(crate) async fn delete_queues(engine: &dyn StorageEngine, account: &str, filter: &Filter, detail: EntityDetail) -> BurrowResponse {
    match engine.delete_queues(account, filter, detail).await {
        Ok(queues) => entity_list_response(&queues),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}
