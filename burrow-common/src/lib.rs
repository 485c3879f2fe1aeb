//! Shared wire vocabulary and HTTP plumbing for the Burrow workspace.
//!
//! Everything here is independent of a particular storage engine: the
//! account/queue/message filter and detail vocabulary (spec-level `detail`,
//! `marker`, `limit`, `match_hidden`, `ttl`, `hide`), the error kinds engine
//! operations raise, the trace-id-per-request plumbing, and the generic
//! segment router used by the HTTP frontend.

#[macro_use]
extern crate log;

use hyper::{
    body::{Buf, HttpBody},
    header::{HeaderMap, HeaderName},
    Body,
};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

pub mod logger;
pub mod router;
pub mod server;
pub mod status;

pub use status::Status;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const TRACE_ID_HEADER: TraceIdHeader = TraceIdHeader {};

/// The `x-trace-id` request/response header, propagated through a single
/// request so every log line it causes can be correlated.
pub struct TraceIdHeader {}

impl TraceIdHeader {
    pub fn name(&self) -> HeaderName {
        HeaderName::from_static("x-trace-id")
    }

    /// Parse the trace id carried by a request's `x-trace-id` header, if any.
    pub fn get(&self, headers: &HeaderMap) -> Option<Uuid> {
        headers
            .get(self.name())
            .and_then(|value| value.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Detail projection for an account or a queue. Accounts and queues only
/// ever carry their id, so `all` and `id` coincide in content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityDetail {
    None,
    Id,
    All,
}

impl EntityDetail {
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        match s {
            "none" => Ok(Self::None),
            "id" => Ok(Self::Id),
            "all" => Ok(Self::All),
            _ => Err(EngineError::invalid_arguments(s)),
        }
    }
}

/// Detail projection for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDetail {
    None,
    Id,
    Attributes,
    Body,
    All,
}

impl MessageDetail {
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        match s {
            "none" => Ok(Self::None),
            "id" => Ok(Self::Id),
            "attributes" => Ok(Self::Attributes),
            "body" => Ok(Self::Body),
            "all" => Ok(Self::All),
            _ => Err(EngineError::invalid_arguments(s)),
        }
    }
}

/// The filter bundle accepted by every range operation (spec.md §4.2).
/// `wait` is parsed here but only ever consumed by the HTTP frontend: the
/// engine itself never blocks.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub marker:       Option<String>,
    pub limit:        Option<u64>,
    pub match_hidden: bool,
    pub wait:         u64,
}

/// Relative (wire-form) `ttl`/`hide` attributes as supplied by a caller.
/// `None` means "leave unchanged" for update operations, and "use the
/// frontend default" for creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attrs {
    pub ttl:  Option<i64>,
    pub hide: Option<i64>,
}

/// Kinds an engine operation can raise, per spec.md §7. These are kinds,
/// not a closed set of Rust types the caller pattern-matches structurally
/// beyond the two variants below; anything else is a transport/unexpected
/// failure and is not represented here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NotFound(String),
    InvalidArguments(String),
}

impl EngineError {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_arguments<S: Into<String>>(what: S) -> Self {
        Self::InvalidArguments(what.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m) | Self::InvalidArguments(m) => m,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(m) => write!(f, "not found: {}", m),
            Self::InvalidArguments(m) => write!(f, "invalid arguments: {}", m),
        }
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;

/// Convert an absolute wall-clock instant (seconds since epoch, 0 = never)
/// into the wire-form relative representation ("seconds from now", 0 stays
/// 0). Mirrors `burrow/backend/sqlite.py::_message_detail`.
pub fn relativize(absolute: i64, now: i64) -> i64 {
    if absolute > 0 {
        absolute - now
    } else {
        absolute
    }
}

/// Convert a wire-form relative value (seconds from now, 0 = none) into an
/// absolute wall-clock instant. Mirrors
/// `burrow/backend/__init__.py::Backend._get_attributes`.
pub fn absolutize(relative: i64, now: i64) -> i64 {
    if relative > 0 {
        relative + now
    } else {
        relative
    }
}

pub async fn read_body(body: &mut Body, max_size: Option<usize>) -> Result<Option<Vec<u8>>, hyper::Error> {
    let mut chunks = Vec::new();
    let mut total_length = 0;

    while let Some(chunk) = body.data().await {
        let bytes = chunk?;
        total_length += bytes.len();
        if let Some(max_length) = max_size {
            if total_length > max_length {
                return Ok(None);
            }
        }
        chunks.push(bytes);
    }

    let mut result = Vec::with_capacity(total_length);
    for chunk in chunks {
        result.extend_from_slice(chunk.chunk());
    }

    Ok(Some(result))
}

/// Test helpers shared across crates in this workspace. Kept ungated by
/// `cfg(test)` so `burrow-server`/`burrow-client`'s own test modules can
/// depend on it as a regular dependency.
pub mod test {
    use hyper::Body;
    use tokio::runtime::{Builder, Runtime};

    pub fn make_runtime() -> Runtime {
        Builder::new_current_thread().enable_all().build().unwrap()
    }

    pub fn read_body(body: &mut Body) -> Vec<u8> {
        let rt = make_runtime();
        rt.block_on(async { crate::read_body(body, None).await.unwrap().unwrap() })
    }
}

#[cfg(test)]
mod vocab_test {
    use super::*;

    #[test]
    fn relativize_zero_stays_zero() {
        assert_eq!(relativize(0, 1000), 0);
    }

    #[test]
    fn relativize_subtracts_now() {
        assert_eq!(relativize(1500, 1000), 500);
    }

    #[test]
    fn absolutize_zero_stays_zero() {
        assert_eq!(absolutize(0, 1000), 0);
    }

    #[test]
    fn absolutize_adds_now() {
        assert_eq!(absolutize(500, 1000), 1500);
    }

    #[test]
    fn detail_parse_rejects_unknown() {
        assert_eq!(
            MessageDetail::parse("bogus"),
            Err(EngineError::invalid_arguments("bogus"))
        );
        assert_eq!(EntityDetail::parse("all"), Ok(EntityDetail::All));
    }
}
