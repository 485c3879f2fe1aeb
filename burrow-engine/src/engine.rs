//! The storage-backend-agnostic operation surface. Both the in-memory
//! engine and the relational engine implement this trait; the HTTP
//! frontend never talks to either one directly.

use async_trait::async_trait;
use burrow_common::{Attrs, EngineResult, EntityDetail, Filter, MessageDetail};

/// Projection of an account or a queue id under a given `EntityDetail`.
/// `Id` and `All` carry the same content (accounts/queues are bare ids) but
/// are rendered with a different shape at the HTTP edge: `Id` as a raw
/// string, `All` as a `{"id": ...}` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityProjection {
    Id(String),
    All(String),
}

/// Projection of a message under a given `MessageDetail`. `ttl`/`hide` are
/// already relativized ("seconds from now") by the time they reach this
/// type; engines never hand out absolute timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageProjection {
    Id(String),
    Attributes { id: String, ttl: i64, hide: i64 },
    Body(Vec<u8>),
    All { id: String, ttl: i64, hide: i64, body: Vec<u8> },
}

/// What a message range scan should do with the messages it visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Leave visited messages in place.
    Get,
    /// Remove each visited message from its queue.
    Delete,
}

#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Materialize the account and queue if necessary, then insert a new
    /// message or overwrite an existing one in place (preserving its
    /// position). Returns `true` if a new message was created, `false` if
    /// an existing one was replaced. Notifies waiters on `account/queue`
    /// when the message is created, or replaced with `hide` resolving to 0.
    async fn create_message(
        &self,
        account: &str,
        queue: &str,
        id: &str,
        body: Vec<u8>,
        attrs: Attrs,
        now: i64,
    ) -> EngineResult<bool>;

    /// Fetch a single message by id without removing it. `NotFound` if the
    /// account, queue, or message doesn't exist.
    async fn get_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail, now: i64) -> EngineResult<MessageProjection>;

    /// Remove a single message by id, projecting it first. Cascades to
    /// remove the queue (and account) if this was its last message.
    async fn delete_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail, now: i64) -> EngineResult<MessageProjection>;

    /// Update a single message's `ttl`/`hide`, projecting the result.
    /// Notifies waiters if `hide` was explicitly set to 0.
    async fn update_message(
        &self,
        account: &str,
        queue: &str,
        id: &str,
        attrs: Attrs,
        detail: MessageDetail,
        now: i64,
    ) -> EngineResult<MessageProjection>;

    /// Scan the messages in `account/queue` starting strictly after
    /// `filter.marker` (or the head, if absent/unknown), up to
    /// `filter.limit` matches, skipping hidden messages unless
    /// `filter.match_hidden` is set. For each visited message: if `update`
    /// is given, applies the attribute change first; if `detail` is not
    /// `None`, projects the (possibly just-updated) message and passes it
    /// to `visit`; if `mode` is `Delete`, removes it afterwards.
    /// Implementations visit messages lazily, one at a time, rather than
    /// collecting the whole range up front. `NotFound` if the range is
    /// empty (including "queue doesn't exist"). Notifies waiters at most
    /// once, only if at least one message had `hide` explicitly set to 0.
    #[allow(clippy::too_many_arguments)]
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
    ) -> EngineResult<()>;

    /// List accounts starting strictly after `filter.marker`, up to
    /// `filter.limit`. `NotFound` if there are none.
    async fn get_accounts(&self, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>>;

    /// Delete accounts (and all their queues and messages) starting
    /// strictly after `filter.marker`, up to `filter.limit`. With no
    /// filters this wipes every account. `NotFound` if there are none to
    /// delete.
    async fn delete_accounts(&self, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>>;

    /// List the queues of `account` starting strictly after
    /// `filter.marker`, up to `filter.limit`. `NotFound` if the account
    /// doesn't exist or has no matching queues.
    async fn get_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>>;

    /// Delete queues of `account` (and all their messages) starting
    /// strictly after `filter.marker`, up to `filter.limit`. With no
    /// filters this wipes every queue of the account, cascading to remove
    /// the account itself. `NotFound` if there are none to delete.
    async fn delete_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>>;

    /// Delete every message whose `ttl` has passed, cascading to remove
    /// emptied queues/accounts, and unhide every message whose `hide` has
    /// passed, notifying each affected queue's waiters at most once.
    /// Called roughly once a second by the reaper.
    async fn clean(&self, now: i64);
}
