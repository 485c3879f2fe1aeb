use log::Level;

use crate::logger::json::Logger;
use std::{
    borrow::Borrow,
    env,
    io::{stdout, Stdout, Write},
};

/// A logger implementation which writes each log messages as a json encoded object.
pub mod json;
mod trace_id;

pub use trace_id::*;

/// Create a new json logger writing to stdout. Looks up the `LOG_LEVEL` environment
/// variable and uses it (if it is one of `trace`, `debug`, `info`, `warn`, or `error`)
/// as the log level, falling back to `default_log_level` otherwise.
pub fn new_json_logger(default_log_level: Level) -> Logger<Stdout> {
    let level = match env::var("LOG_LEVEL") {
        Err(_) => default_log_level,
        Ok(s) => match s.borrow() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" => Level::Warn,
            "error" => Level::Error,
            _ => default_log_level,
        },
    };

    Logger::new(level, stdout())
}

/// Set the given json logger as the current logger and set the log level to the level specified
/// by the json logger.
pub fn configure_logger<W: Write + Send>(logger: &'static Logger<W>) {
    log::set_logger(logger)
        .map(|()| log::set_max_level(logger.level().to_level_filter()))
        .unwrap();
}
