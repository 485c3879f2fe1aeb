use std::{net::SocketAddr, str::FromStr, sync::Arc};

use burrow_engine::{InMemoryEngine, StorageEngine, WaiterRegistry};
use burrow_sqlite::SqliteEngine;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Err(_) => default,
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{} must be a valid number, got '{}'", name, value)),
    }
}

/// Build the storage engine named by `DATABASE_URL`. Unset or empty yields
/// the in-memory engine; `sqlite://path` (empty path included) yields the
/// relational engine.
pub fn build_engine(waiters: Arc<WaiterRegistry>) -> Arc<dyn StorageEngine> {
    match std::env::var("DATABASE_URL") {
        Err(_) => Arc::new(InMemoryEngine::new(waiters)),
        Ok(url) if url.is_empty() => Arc::new(InMemoryEngine::new(waiters)),
        Ok(url) => {
            let engine = SqliteEngine::open(&url, waiters).unwrap_or_else(|err| panic!("Failed to open {}: {}", url, err));
            Arc::new(engine)
        },
    }
}

/// The largest message body `create_message` will accept, in bytes.
pub fn max_message_size() -> usize {
    parse_env("MAX_MESSAGE_SIZE", 1024 * 1024)
}

/// Default `ttl` (relative seconds, 0 = never) for `create_message` calls
/// that omit it.
pub fn default_ttl() -> i64 {
    parse_env("DEFAULT_TTL", 0)
}

/// Default `hide` (relative seconds, 0 = visible now) for `create_message`
/// calls that omit it.
pub fn default_hide() -> i64 {
    parse_env("DEFAULT_HIDE", 0)
}

/// Address the HTTP server binds to.
pub fn bind_address() -> SocketAddr {
    let value = env_or("BIND_ADDRESS", "0.0.0.0:8080");
    value
        .parse()
        .unwrap_or_else(|_| panic!("BIND_ADDRESS must be a socket address, got '{}'", value))
}

/// Size of the tokio worker pool the server runs on.
pub fn worker_threads() -> usize {
    parse_env("WORKER_THREADS", 4)
}
