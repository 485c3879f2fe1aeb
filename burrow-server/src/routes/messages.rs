use std::time::Duration;
use tokio::time::Instant;

use burrow_common::{Attrs, EngineError, EngineResult, Filter, MessageDetail, Status};
use burrow_engine::{now, MessageProjection, ScanMode, StorageEngine, WaiterRegistry};

use crate::routes::{message_list_response, single_message_response, BurrowResponse};

/// Run a queue-level scan, blocking on the waiter registry and retrying
/// while the result is empty and `filter.wait` hasn't elapsed yet. A plain
/// read with data present never parks (spec.md §5's suspension-point rule).
async fn scan_with_wait(
    engine: &dyn StorageEngine,
    waiters: &WaiterRegistry,
    account: &str,
    queue: &str,
    filter: &Filter,
    mode: ScanMode,
    update: Option<Attrs>,
    detail: MessageDetail,
) -> EngineResult<Vec<MessageProjection>> {
    let deadline = Instant::now() + Duration::from_secs(filter.wait);
    loop {
        let mut items = Vec::new();
        let result = engine
            .scan_messages(account, queue, filter, mode, update, detail, now(), &mut |p| items.push(p))
            .await;
        match result {
            Ok(()) => return Ok(items),
            Err(EngineError::NotFound(message)) => {
                if filter.wait == 0 {
                    return Err(EngineError::NotFound(message));
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(EngineError::NotFound(message));
                }
                waiters.wait(account, queue, remaining).await;
                if Instant::now() >= deadline {
                    return Err(EngineError::NotFound(message));
                }
            },
            Err(other) => return Err(other),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn create_message(
    engine: &dyn StorageEngine,
    account: &str,
    queue: &str,
    id: &str,
    body: Vec<u8>,
    mut attrs: Attrs,
    default_ttl: i64,
    default_hide: i64,
) -> BurrowResponse {
    if attrs.ttl.is_none() {
        attrs.ttl = Some(default_ttl);
    }
    if attrs.hide.is_none() {
        attrs.hide = Some(default_hide);
    }
    match engine.create_message(account, queue, id, body, attrs, now()).await {
        Ok(true) => {
            info!("Created message {} in {}/{}", id, account, queue);
            BurrowResponse::empty(Status::Created)
        },
        Ok(false) => {
            info!("Replaced message {} in {}/{}", id, account, queue);
            BurrowResponse::empty(Status::NoContent)
        },
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

pub(crate) async fn get_message(engine: &dyn StorageEngine, account: &str, queue: &str, id: &str, detail: MessageDetail) -> BurrowResponse {
    match engine.get_message(account, queue, id, detail, now()).await {
        Ok(projection) => single_message_response(Status::Ok, detail, projection),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

pub(crate) async fn delete_message(engine: &dyn StorageEngine, account: &str, queue: &str, id: &str, detail: MessageDetail) -> BurrowResponse {
    match engine.delete_message(account, queue, id, detail, now()).await {
        Ok(projection) => single_message_response(Status::Ok, detail, projection),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

pub(crate) async fn update_message(
    engine: &dyn StorageEngine,
    account: &str,
    queue: &str,
    id: &str,
    attrs: Attrs,
    detail: MessageDetail,
) -> BurrowResponse {
    match engine.update_message(account, queue, id, attrs, detail, now()).await {
        Ok(projection) => single_message_response(Status::Ok, detail, projection),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

pub(crate) async fn get_messages(
    engine: &dyn StorageEngine,
    waiters: &WaiterRegistry,
    account: &str,
    queue: &str,
    filter: &Filter,
    detail: MessageDetail,
) -> BurrowResponse {
    match scan_with_wait(engine, waiters, account, queue, filter, ScanMode::Get, None, detail).await {
        Ok(items) => message_list_response(&items),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

pub(crate) async fn delete_messages(
    engine: &dyn StorageEngine,
    waiters: &WaiterRegistry,
    account: &str,
    queue: &str,
    filter: &Filter,
    detail: MessageDetail,
) -> BurrowResponse {
    match scan_with_wait(engine, waiters, account, queue, filter, ScanMode::Delete, None, detail).await {
        Ok(items) => message_list_response(&items),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn update_messages(
    engine: &dyn StorageEngine,
    waiters: &WaiterRegistry,
    account: &str,
    queue: &str,
    filter: &Filter,
    attrs: Attrs,
    detail: MessageDetail,
) -> BurrowResponse {
    match scan_with_wait(engine, waiters, account, queue, filter, ScanMode::Get, Some(attrs), detail).await {
        Ok(items) => message_list_response(&items),
        Err(err) => BurrowResponse::from_engine_error(err),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use burrow_engine::InMemoryEngine;
    use std::sync::Arc;

    fn engine() -> (InMemoryEngine, Arc<WaiterRegistry>) {
        let waiters = Arc::new(WaiterRegistry::new());
        (InMemoryEngine::new(waiters.clone()), waiters)
    }

    #[tokio::test]
    async fn create_then_get_then_delete() {
        let (engine, _waiters) = engine();
        let response = create_message(&engine, "a", "q", "m1", b"hi".to_vec(), Attrs::default(), 0, 0).await;
        assert!(matches!(response, BurrowResponse::Empty(Status::Created)));

        let response = get_message(&engine, "a", "q", "m1", MessageDetail::Body).await;
        assert!(matches!(response, BurrowResponse::Scalar(Status::Ok, body) if body == b"hi".to_vec()));

        let response = delete_message(&engine, "a", "q", "m1", MessageDetail::None).await;
        assert!(matches!(response, BurrowResponse::Empty(Status::NoContent)));

        let response = get_message(&engine, "a", "q", "m1", MessageDetail::Id).await;
        assert!(matches!(response, BurrowResponse::Json(Status::NotFound, _)));
    }

    #[tokio::test]
    async fn wait_returns_once_message_arrives() {
        let (engine, waiters) = engine();
        let engine = Arc::new(engine);

        let mut filter = Filter::default();
        filter.wait = 5;
        let waiting = tokio::spawn({
            let engine = engine.clone();
            let waiters = waiters.clone();
            async move { get_messages(engine.as_ref(), waiters.as_ref(), "a", "q", &filter, MessageDetail::Id).await }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        create_message(engine.as_ref(), "a", "q", "m1", Vec::new(), Attrs::default(), 0, 0).await;

        let response = tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("wait loop should have woken up")
            .unwrap();
        assert!(matches!(response, BurrowResponse::Json(Status::Ok, _)));
    }

    #[tokio::test]
    async fn wait_expires_with_not_found() {
        let (engine, waiters) = engine();
        let mut filter = Filter::default();
        filter.wait = 1;
        let response = get_messages(&engine, &waiters, "a", "q", &filter, MessageDetail::Id).await;
        assert!(matches!(response, BurrowResponse::Json(Status::NotFound, _)));
    }
}
