pub mod annotations;
pub mod config;
pub mod env;
pub mod errors;
pub mod payload;
pub mod test_run;

pub use config::{Config, ConfigLoader, ConfigOverrides};
pub use env::EnvSource;
pub use errors::{ConfigError, UsageError};
pub use test_run::{ResultOptions, TestResult, TestRun};
