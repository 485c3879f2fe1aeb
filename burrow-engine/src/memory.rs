//! In-memory `StorageEngine` implementation: a three-level
//! account -> queue -> message tree of `OrderedIndex`es behind a single
//! coarse mutex. No method ever suspends, so the mutex is never held
//! across an await point; every operation runs to completion before
//! yielding control back to the runtime.

use async_trait::async_trait;
use burrow_common::{absolutize, relativize, Attrs, EngineError, EngineResult, EntityDetail, Filter, MessageDetail};
use std::sync::{Arc, Mutex};

use crate::{
    engine::{EntityProjection, MessageProjection, ScanMode, StorageEngine},
    index::{OrderedIndex, ScanControl},
    waiter::WaiterRegistry,
};

struct Message {
    ttl:  i64,
    hide: i64,
    body: Vec<u8>,
}

#[derive(Default)]
struct Queue {
    messages: OrderedIndex<Message>,
}

#[derive(Default)]
struct Account {
    queues: OrderedIndex<Queue>,
}

pub struct InMemoryEngine {
    state:   Mutex<OrderedIndex<Account>>,
    waiters: Arc<WaiterRegistry>,
}

impl InMemoryEngine {
    pub fn new(waiters: Arc<WaiterRegistry>) -> Self {
        InMemoryEngine {
            state: Mutex::new(OrderedIndex::new()),
            waiters,
        }
    }

    fn account_not_found(account: &str) -> EngineError {
        EngineError::not_found(format!("account '{}' not found", account))
    }

    fn queue_not_found(queue: &str) -> EngineError {
        EngineError::not_found(format!("queue '{}' not found", queue))
    }

    fn message_not_found(id: &str) -> EngineError {
        EngineError::not_found(format!("message '{}' not found", id))
    }

    fn project(id: &str, message: &Message, detail: MessageDetail, now: i64) -> Option<MessageProjection> {
        match detail {
            MessageDetail::None => None,
            MessageDetail::Id => Some(MessageProjection::Id(id.to_string())),
            MessageDetail::Body => Some(MessageProjection::Body(message.body.clone())),
            MessageDetail::Attributes => Some(MessageProjection::Attributes {
                id:   id.to_string(),
                ttl:  relativize(message.ttl, now),
                hide: relativize(message.hide, now),
            }),
            MessageDetail::All => Some(MessageProjection::All {
                id:   id.to_string(),
                ttl:  relativize(message.ttl, now),
                hide: relativize(message.hide, now),
                body: message.body.clone(),
            }),
        }
    }

    fn project_entity(id: &str, detail: EntityDetail) -> Option<EntityProjection> {
        match detail {
            EntityDetail::None => None,
            EntityDetail::Id => Some(EntityProjection::Id(id.to_string())),
            EntityDetail::All => Some(EntityProjection::All(id.to_string())),
        }
    }

    /// Remove the queue from its account if it has no messages left, and
    /// the account from the root if it has no queues left.
    fn cascade_cleanup(state: &mut OrderedIndex<Account>, account: &str, queue: &str) {
        let queue_empty = state
            .get(account)
            .and_then(|acc| acc.queues.get(queue))
            .map(|q| q.messages.is_empty())
            .unwrap_or(false);
        if queue_empty {
            if let Some(acc) = state.get_mut(account) {
                acc.queues.remove(queue);
            }
        }
        let account_empty = state.get(account).map(|acc| acc.queues.is_empty()).unwrap_or(false);
        if account_empty {
            state.remove(account);
        }
    }
}

#[async_trait]
impl StorageEngine for InMemoryEngine {
    async fn create_message(
        &self,
        account: &str,
        queue: &str,
        id: &str,
        body: Vec<u8>,
        attrs: Attrs,
        now: i64,
    ) -> EngineResult<bool> {
        let ttl = absolutize(attrs.ttl.unwrap_or(0), now);
        let hide = absolutize(attrs.hide.unwrap_or(0), now);

        let created = {
            let mut state = self.state.lock().unwrap();
            if !state.contains(account) {
                state.push_back(account.to_string(), Account::default());
            }
            let acc = state.get_mut(account).unwrap();
            if !acc.queues.contains(queue) {
                acc.queues.push_back(queue.to_string(), Queue::default());
            }
            let q = acc.queues.get_mut(queue).unwrap();
            if let Some(existing) = q.messages.get_mut(id) {
                existing.ttl = ttl;
                existing.hide = hide;
                existing.body = body;
                false
            } else {
                q.messages.push_back(id.to_string(), Message { ttl, hide, body });
                true
            }
        };

        if created || hide == 0 {
            self.waiters.notify(account, queue);
        }
        Ok(created)
    }

    async fn get_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail, now: i64) -> EngineResult<MessageProjection> {
        let state = self.state.lock().unwrap();
        let acc = state.get(account).ok_or_else(|| Self::account_not_found(account))?;
        let q = acc.queues.get(queue).ok_or_else(|| Self::queue_not_found(queue))?;
        let message = q.messages.get(id).ok_or_else(|| Self::message_not_found(id))?;
        Ok(Self::project(id, message, detail, now).unwrap_or(MessageProjection::Id(id.to_string())))
    }

    async fn delete_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail, now: i64) -> EngineResult<MessageProjection> {
        let mut state = self.state.lock().unwrap();
        let projected = {
            let acc = state.get_mut(account).ok_or_else(|| Self::account_not_found(account))?;
            let q = acc.queues.get_mut(queue).ok_or_else(|| Self::queue_not_found(queue))?;
            let message = q.messages.get(id).ok_or_else(|| Self::message_not_found(id))?;
            let projected = Self::project(id, message, detail, now).unwrap_or(MessageProjection::Id(id.to_string()));
            q.messages.remove(id);
            projected
        };
        Self::cascade_cleanup(&mut state, account, queue);
        Ok(projected)
    }

    async fn update_message(
        &self,
        account: &str,
        queue: &str,
        id: &str,
        attrs: Attrs,
        detail: MessageDetail,
        now: i64,
    ) -> EngineResult<MessageProjection> {
        let (projected, notify) = {
            let mut state = self.state.lock().unwrap();
            let acc = state.get_mut(account).ok_or_else(|| Self::account_not_found(account))?;
            let q = acc.queues.get_mut(queue).ok_or_else(|| Self::queue_not_found(queue))?;
            let message = q.messages.get_mut(id).ok_or_else(|| Self::message_not_found(id))?;
            if let Some(ttl) = attrs.ttl {
                message.ttl = absolutize(ttl, now);
            }
            let mut notify = false;
            if let Some(hide) = attrs.hide {
                message.hide = absolutize(hide, now);
                if message.hide == 0 {
                    notify = true;
                }
            }
            let projected = Self::project(id, message, detail, now).unwrap_or(MessageProjection::Id(id.to_string()));
            (projected, notify)
        };
        if notify {
            self.waiters.notify(account, queue);
        }
        Ok(projected)
    }

    async fn scan_messages(
        &self,
        account: &str,
        queue: &str,
        filter: &Filter,
        mode: ScanMode,
        update: Option<Attrs>,
        detail: MessageDetail,
        now: i64,
        visit: &mut (dyn FnMut(MessageProjection) + Send),
    ) -> EngineResult<()> {
        let (count, notify) = {
            let mut state = self.state.lock().unwrap();
            let acc = state.get_mut(account).ok_or_else(|| Self::account_not_found(account))?;
            let q = acc.queues.get_mut(queue).ok_or_else(|| Self::queue_not_found(queue))?;

            let mut count: u64 = 0;
            let mut notify = false;
            let limit = filter.limit;
            let match_hidden = filter.match_hidden;

            q.messages.scan(filter.marker.as_deref(), |id, message| {
                if !match_hidden && message.hide != 0 {
                    return ScanControl::CONTINUE;
                }
                if let Some(attrs) = update {
                    if let Some(ttl) = attrs.ttl {
                        message.ttl = absolutize(ttl, now);
                    }
                    if let Some(hide) = attrs.hide {
                        message.hide = absolutize(hide, now);
                        if message.hide == 0 {
                            notify = true;
                        }
                    }
                }
                if let Some(projection) = Self::project(id, message, detail, now) {
                    visit(projection);
                }
                count += 1;
                let stop = matches!(limit, Some(l) if count >= l);
                ScanControl {
                    remove: mode == ScanMode::Delete,
                    stop,
                }
            });

            (count, notify)
        };

        if count == 0 {
            return Err(EngineError::not_found(format!("no messages found in queue '{}'", queue)));
        }

        {
            let mut state = self.state.lock().unwrap();
            Self::cascade_cleanup(&mut state, account, queue);
        }

        if notify {
            self.waiters.notify(account, queue);
        }
        Ok(())
    }

    async fn get_accounts(&self, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let state = self.state.lock().unwrap();
        let mut result = Vec::new();
        let mut count: u64 = 0;
        for (id, _account) in state.iter_from(filter.marker.as_deref()) {
            count += 1;
            if let Some(projection) = Self::project_entity(id, detail) {
                result.push(projection);
            }
            if matches!(filter.limit, Some(l) if count >= l) {
                break;
            }
        }
        if count == 0 {
            return Err(EngineError::not_found("no accounts found"));
        }
        Ok(result)
    }

    async fn delete_accounts(&self, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let mut state = self.state.lock().unwrap();
        let mut result = Vec::new();
        let mut count: u64 = 0;
        let limit = filter.limit;
        state.scan(filter.marker.as_deref(), |id, _account| {
            count += 1;
            if let Some(projection) = Self::project_entity(id, detail) {
                result.push(projection);
            }
            ScanControl {
                remove: true,
                stop:   matches!(limit, Some(l) if count >= l),
            }
        });
        if count == 0 {
            return Err(EngineError::not_found("no accounts to delete"));
        }
        Ok(result)
    }

    async fn get_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let state = self.state.lock().unwrap();
        let acc = state.get(account).ok_or_else(|| Self::account_not_found(account))?;
        let mut result = Vec::new();
        let mut count: u64 = 0;
        for (id, _queue) in acc.queues.iter_from(filter.marker.as_deref()) {
            count += 1;
            if let Some(projection) = Self::project_entity(id, detail) {
                result.push(projection);
            }
            if matches!(filter.limit, Some(l) if count >= l) {
                break;
            }
        }
        if count == 0 {
            return Err(EngineError::not_found(format!("no queues found for account '{}'", account)));
        }
        Ok(result)
    }

    async fn delete_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let mut state = self.state.lock().unwrap();
        let (result, count) = {
            let acc = state.get_mut(account).ok_or_else(|| Self::account_not_found(account))?;
            let mut result = Vec::new();
            let mut count: u64 = 0;
            let limit = filter.limit;
            acc.queues.scan(filter.marker.as_deref(), |id, _queue| {
                count += 1;
                if let Some(projection) = Self::project_entity(id, detail) {
                    result.push(projection);
                }
                ScanControl {
                    remove: true,
                    stop:   matches!(limit, Some(l) if count >= l),
                }
            });
            (result, count)
        };
        if count == 0 {
            return Err(EngineError::not_found(format!("no queues to delete for account '{}'", account)));
        }
        if state.get(account).map(|acc| acc.queues.is_empty()).unwrap_or(false) {
            state.remove(account);
        }
        Ok(result)
    }

    async fn clean(&self, now: i64) {
        let mut state = self.state.lock().unwrap();
        let account_ids: Vec<String> = state.iter_from(None).map(|(id, _)| id.to_string()).collect();
        let mut to_notify = Vec::new();

        for account_id in account_ids {
            let queue_ids: Vec<String> = match state.get(&account_id) {
                Some(acc) => acc.queues.iter_from(None).map(|(id, _)| id.to_string()).collect(),
                None => continue,
            };
            for queue_id in queue_ids {
                let mut queue_notify = false;
                if let Some(acc) = state.get_mut(&account_id) {
                    if let Some(q) = acc.queues.get_mut(&queue_id) {
                        q.messages.scan(None, |_id, message| {
                            if message.ttl > 0 && message.ttl <= now {
                                ScanControl::remove()
                            } else {
                                if message.hide > 0 && message.hide <= now {
                                    message.hide = 0;
                                    queue_notify = true;
                                }
                                ScanControl::CONTINUE
                            }
                        });
                    }
                }
                if queue_notify {
                    to_notify.push((account_id.clone(), queue_id.clone()));
                }
                Self::cascade_cleanup(&mut state, &account_id, &queue_id);
            }
        }

        drop(state);
        for (account_id, queue_id) in to_notify {
            self.waiters.notify(&account_id, &queue_id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn engine() -> InMemoryEngine {
        InMemoryEngine::new(Arc::new(WaiterRegistry::new()))
    }

    fn filter() -> Filter {
        Filter::default()
    }

    #[tokio::test]
    async fn create_get_delete_round_trip() {
        let engine = engine();
        let created = engine
            .create_message("acct", "q", "m1", b"hello".to_vec(), Attrs::default(), 1000)
            .await
            .unwrap();
        assert!(created);

        let got = engine.get_message("acct", "q", "m1", MessageDetail::Body, 1000).await.unwrap();
        assert_eq!(got, MessageProjection::Body(b"hello".to_vec()));

        let deleted = engine
            .delete_message("acct", "q", "m1", MessageDetail::Id, 1000)
            .await
            .unwrap();
        assert_eq!(deleted, MessageProjection::Id("m1".to_string()));

        let err = engine.get_message("acct", "q", "m1", MessageDetail::Id, 1000).await.unwrap_err();
        assert_eq!(err, EngineError::not_found("message 'm1' not found"));

        // the queue and account auto-destroyed when emptied
        let err = engine.get_queues("acct", &filter(), EntityDetail::Id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn overwrite_preserves_position_and_reports_replaced() {
        let engine = engine();
        engine
            .create_message("acct", "q", "m1", b"a".to_vec(), Attrs::default(), 1000)
            .await
            .unwrap();
        engine
            .create_message("acct", "q", "m2", b"b".to_vec(), Attrs::default(), 1000)
            .await
            .unwrap();
        let replaced = engine
            .create_message("acct", "q", "m1", b"c".to_vec(), Attrs::default(), 1000)
            .await
            .unwrap();
        assert!(!replaced);

        let mut seen = Vec::new();
        engine
            .scan_messages(
                "acct",
                "q",
                &filter(),
                ScanMode::Get,
                None,
                MessageDetail::Id,
                1000,
                &mut |p| {
                    if let MessageProjection::Id(id) = p {
                        seen.push(id);
                    }
                },
            )
            .await
            .unwrap();
        assert_eq!(seen, vec!["m1".to_string(), "m2".to_string()]);
    }

    #[tokio::test]
    async fn marker_pagination_and_unknown_marker_fallback() {
        let engine = engine();
        for id in ["m1", "m2", "m3"] {
            engine
                .create_message("acct", "q", id, Vec::new(), Attrs::default(), 1000)
                .await
                .unwrap();
        }

        let mut f = filter();
        f.marker = Some("m1".to_string());
        let mut seen = Vec::new();
        engine
            .scan_messages("acct", "q", &f, ScanMode::Get, None, MessageDetail::Id, 1000, &mut |p| {
                if let MessageProjection::Id(id) = p {
                    seen.push(id);
                }
            })
            .await
            .unwrap();
        assert_eq!(seen, vec!["m2".to_string(), "m3".to_string()]);

        let mut f = filter();
        f.marker = Some("does-not-exist".to_string());
        let mut seen = Vec::new();
        engine
            .scan_messages("acct", "q", &f, ScanMode::Get, None, MessageDetail::Id, 1000, &mut |p| {
                if let MessageProjection::Id(id) = p {
                    seen.push(id);
                }
            })
            .await
            .unwrap();
        assert_eq!(seen, vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]);
    }

    #[tokio::test]
    async fn hide_unhide_notifies_waiters() {
        let waiters = Arc::new(WaiterRegistry::new());
        let engine = InMemoryEngine::new(waiters.clone());
        let mut attrs = Attrs::default();
        attrs.hide = Some(100);
        engine
            .create_message("acct", "q", "m1", Vec::new(), attrs, 1000)
            .await
            .unwrap();

        let waiter = tokio::spawn({
            let waiters = waiters.clone();
            async move {
                waiters.wait("acct", "q", std::time::Duration::from_secs(2)).await;
            }
        });
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        let mut unhide = Attrs::default();
        unhide.hide = Some(0);
        engine
            .update_message("acct", "q", "m1", unhide, MessageDetail::None, 1000)
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("notify should have woken the waiter")
            .unwrap();
    }

    #[tokio::test]
    async fn ttl_reap_cascades_removal() {
        let engine = engine();
        let mut attrs = Attrs::default();
        attrs.ttl = Some(10);
        engine
            .create_message("acct", "q", "m1", Vec::new(), attrs, 1000)
            .await
            .unwrap();

        engine.clean(1005).await;
        let err = engine.get_accounts(&filter(), EntityDetail::Id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn bulk_delete_with_no_filters_wipes_account() {
        let engine = engine();
        for id in ["q1", "q2"] {
            engine
                .create_message("acct", id, "m1", Vec::new(), Attrs::default(), 1000)
                .await
                .unwrap();
        }
        let deleted = engine.delete_accounts(&filter(), EntityDetail::Id).await.unwrap();
        assert_eq!(deleted, vec![EntityProjection::Id("acct".to_string())]);

        let err = engine.delete_accounts(&filter(), EntityDetail::None).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
