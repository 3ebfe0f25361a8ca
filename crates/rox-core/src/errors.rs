use std::path::PathBuf;
use thiserror::Error;

/// Operational errors raised while loading configuration files.
///
/// Validation problems (missing project fields, unconfigured servers, an
/// explicitly-set config path that does not exist) are NOT errors here; they
/// are accumulated as strings by `Config::validate`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Misuse of the test run lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("testRun.start() was not called; call it when the test suite starts running")]
    EndBeforeStart,

    #[error("testRun.end() was not called; call it when the test suite has finished running")]
    NotEnded,
}
