//! Publish orchestration: validate, serialize, cache, upload.

use crate::errors::PublishError;
use crate::publisher;
use crate::transport::HttpTransport;
use crate::uid::resolve_uid;
use rox_core::config::{Config, ConfigLoader, ConfigOverrides};
use rox_core::errors::{ConfigError, UsageError};
use rox_core::payload::serialize_v1;
use rox_core::test_run::TestRun;
use rox_core::EnvSource;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to a processed test run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    /// True when the payload was accepted by the server.
    pub published: bool,
    /// Validation problems. Non-empty means publishing was aborted before
    /// any network activity; all messages are surfaced at once.
    pub errors: Vec<String>,
}

/// Entry point tying configuration, aggregation and publishing together.
pub struct Client<E> {
    loader: ConfigLoader<E>,
    transport: Arc<dyn HttpTransport>,
}

impl<E: EnvSource> Client<E> {
    pub fn new(env: E, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            loader: ConfigLoader::new(env),
            transport,
        }
    }

    /// Uses a preconfigured loader (tests point it at temporary
    /// directories).
    pub fn with_loader(loader: ConfigLoader<E>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { loader, transport }
    }

    /// Resolves a fresh configuration.
    pub fn load_config(&self, overrides: Option<ConfigOverrides>) -> Result<Config, ConfigError> {
        self.loader.load(overrides)
    }

    /// Creates a started test run owning the given configuration.
    pub fn start_test_run(&self, config: Config) -> TestRun {
        let uid = resolve_uid(&config);
        let mut test_run = TestRun::new(config);
        test_run.start(uid);
        test_run
    }

    /// Validates, serializes and publishes an ended test run.
    ///
    /// Validation problems are returned in the outcome, not raised; when any
    /// are present no network call is made. Operational failures (usage,
    /// I/O, resolution, upload) abort the attempt as errors. There are no
    /// retries.
    pub async fn process(&self, test_run: &TestRun) -> Result<ProcessOutcome, PublishError> {
        if test_run.end_time.is_none() {
            return Err(UsageError::NotEnded.into());
        }

        let config = &test_run.config;
        let mut errors = Vec::new();
        config.validate(&mut errors);
        test_run.validate(&mut errors);
        if !errors.is_empty() {
            warn!(problems = errors.len(), "test run failed validation, not publishing");
            return Ok(ProcessOutcome {
                published: false,
                errors,
            });
        }

        let payload = serialize_v1(test_run);
        let payload_json = serde_json::to_string(&payload)?;

        if let Some(workspace) = &config.workspace {
            let dir = workspace.join("jasmine");
            std::fs::create_dir_all(&dir).map_err(|source| PublishError::Cache {
                path: dir.clone(),
                source,
            })?;
            let path = dir.join("payload.json");
            let pretty = serde_json::to_string_pretty(&payload)?;
            std::fs::write(&path, pretty).map_err(|source| PublishError::Cache {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "payload cached");
        }

        if config.payload.print {
            info!(payload = %serde_json::to_string_pretty(&payload)?, "serialized payload");
        }

        if !config.publish {
            info!("publishing is disabled, not sending payload");
            return Ok(ProcessOutcome {
                published: false,
                errors: Vec::new(),
            });
        }

        publisher::upload(self.transport.as_ref(), &config.server_options(), &payload_json).await?;
        Ok(ProcessOutcome {
            published: true,
            errors: Vec::new(),
        })
    }
}
