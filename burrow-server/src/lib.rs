#![warn(
    missing_docs,
    rust_2018_idioms,
    future_incompatible,
    missing_copy_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused,
    unused_qualifications,
    variant_size_differences
)]
#![cfg_attr(test, deny(warnings))]

//! HTTP frontend: maps the `/v1.0/{account}/{queue}/{message}` URL
//! hierarchy and its query-parameter vocabulary onto `StorageEngine`
//! operations, and renders the results as JSON or raw bytes.

#[macro_use]
extern crate log;

/// Engine construction from environment variables.
pub mod config;
pub(crate) mod query;
pub(crate) mod router;
pub(crate) mod routes;

pub use config::build_engine;
pub use router::make_router;
