use burrow_common::{EntityDetail, Filter};
use burrow_engine::StorageEngine;

use crate::routes::{entity_list_response, BurrowResponse};

pub(crate) async fn get_accounts(engine: &dyn StorageEngine, filter: &Filter, detail: EntityDetail) -> BurrowResponse {
    match engine.get_accounts(filter, detail).await {
        Ok(accounts) => entity_list_response(&accounts),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

pub(crate) async fn delete_accounts(engine: &dyn StorageEngine, filter: &Filter, detail: EntityDetail) -> BurrowResponse {
    match engine.delete_accounts(filter, detail).await {
        Ok(accounts) => entity_list_response(&accounts),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}
