//! Layered configuration resolution.
//!
//! Configuration is merged from five layers, lowest precedence first:
//! built-in defaults, `~/.rox/config.yml`, the project file (`$ROX_CONFIG`
//! or `rox.yml`), caller-supplied overrides, and environment variables.
//! Scalar fields are overwritten by later layers; `project.tags` and
//! `project.tickets` are unioned across layers.

use crate::env::EnvSource;
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_PUBLISH: &str = "ROX_PUBLISH";
pub const ENV_SERVER: &str = "ROX_SERVER";
pub const ENV_WORKSPACE: &str = "ROX_WORKSPACE";
pub const ENV_CACHE_PAYLOAD: &str = "ROX_CACHE_PAYLOAD";
pub const ENV_PRINT_PAYLOAD: &str = "ROX_PRINT_PAYLOAD";
pub const ENV_SAVE_PAYLOAD: &str = "ROX_SAVE_PAYLOAD";
pub const ENV_TEST_RUN_UID: &str = "ROX_TEST_RUN_UID";
pub const ENV_CONFIG: &str = "ROX_CONFIG";

const PROJECT_CONFIG_DEFAULT: &str = "rox.yml";

/// One mergeable configuration layer.
///
/// This is both the shape of the YAML configuration files and the type of
/// the programmatic overrides accepted by [`ConfigLoader::load`]; every
/// field is optional so a layer only contributes what it defines.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    pub publish: Option<bool>,
    pub project: Option<ProjectOverrides>,
    pub servers: Option<BTreeMap<String, ServerConfig>>,
    pub server: Option<String>,
    pub workspace: Option<String>,
    pub payload: Option<PayloadOverrides>,
    pub test_run_uid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectOverrides {
    pub api_id: Option<String>,
    pub version: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub tickets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PayloadOverrides {
    pub cache: Option<bool>,
    pub print: Option<bool>,
    pub save: Option<bool>,
}

/// Connection settings for one named server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub api_url: Option<String>,
    pub api_key_id: Option<String>,
    pub api_key_secret: Option<String>,
    /// Overrides `project.apiId` when this server is selected.
    pub project_api_id: Option<String>,
}

/// Resolved project settings.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    pub api_id: Option<String>,
    pub version: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub tickets: Vec<String>,
}

/// Resolved payload handling flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadFlags {
    pub cache: bool,
    pub print: bool,
    pub save: bool,
}

/// Fully resolved configuration, immutable after load.
#[derive(Debug, Clone)]
pub struct Config {
    pub publish: bool,
    pub project: ProjectConfig,
    pub servers: BTreeMap<String, ServerConfig>,
    /// Key of the selected server in `servers`.
    pub server: Option<String>,
    pub workspace: Option<PathBuf>,
    pub payload: PayloadFlags,
    /// Only ever populated from the environment or programmatic overrides,
    /// never from a configuration file.
    pub test_run_uid: Option<String>,
    /// Project config path that was explicitly set via `$ROX_CONFIG` but did
    /// not exist at load time. Reported by `validate`, not by `load`.
    missing_project_config: Option<PathBuf>,
}

impl Config {
    /// The selected server's settings, or defaults when no server is
    /// selected or the key is unknown.
    pub fn server_options(&self) -> ServerConfig {
        self.server
            .as_ref()
            .and_then(|name| self.servers.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Project settings with `api_id` overridden by the selected server's
    /// `projectApiId` when present.
    pub fn project_options(&self) -> ProjectConfig {
        let mut options = self.project.clone();
        if let Some(api_id) = self.server_options().project_api_id {
            options.api_id = Some(api_id);
        }
        options
    }

    /// Appends human-readable problems to `errors`. Nothing is thrown; the
    /// caller surfaces all accumulated messages at once.
    pub fn validate(&self, errors: &mut Vec<String>) {
        if let Some(path) = &self.missing_project_config {
            errors.push(format!(
                "No project configuration file found at {} (set with ${} environment variable)",
                path.display(),
                ENV_CONFIG
            ));
        }

        if self.project.api_id.is_none() {
            errors.push(
                "Project API ID is not set (set \"project.apiId\" in configuration file)"
                    .to_string(),
            );
        }
        if self.project.version.is_none() {
            errors.push(
                "Project version is not set (set \"project.version\" in configuration file)"
                    .to_string(),
            );
        }

        if self.servers.is_empty() {
            errors.push("No rox server is configured (set \"servers\" in configuration file)".to_string());
        } else {
            for (name, server) in &self.servers {
                if server.api_url.is_none() {
                    errors.push(format!(
                        "No API URL is set for rox server {name} (set \"servers.{name}.apiUrl\" in configuration file)"
                    ));
                }
                if server.api_key_id.is_none() {
                    errors.push(format!(
                        "No API key ID is set for rox server {name} (set \"servers.{name}.apiKeyId\" in configuration file)"
                    ));
                }
                if server.api_key_secret.is_none() {
                    errors.push(format!(
                        "No API key secret is set for rox server {name} (set \"servers.{name}.apiKeySecret\" in configuration file)"
                    ));
                }
            }
        }
    }
}

/// Resolves configuration from files, overrides and the environment.
///
/// The environment is injected so the loader never reads the process
/// environment ambiently.
pub struct ConfigLoader<E> {
    env: E,
    home_dir: Option<PathBuf>,
    project_dir: PathBuf,
}

impl<E: EnvSource> ConfigLoader<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            home_dir: dirs::home_dir(),
            project_dir: PathBuf::from("."),
        }
    }

    /// Resolves config files against explicit directories instead of the
    /// real home directory and working directory.
    pub fn with_dirs(env: E, home_dir: Option<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            env,
            home_dir,
            project_dir: project_dir.into(),
        }
    }

    /// Loads and merges all configuration layers.
    ///
    /// Always starts from a clean slate; nothing carries over from previous
    /// calls. Missing files are skipped. A `$ROX_CONFIG` path that does not
    /// exist is not an error here; `Config::validate` reports it.
    pub fn load(&self, overrides: Option<ConfigOverrides>) -> Result<Config, ConfigError> {
        let mut merged = ConfigOverrides {
            publish: Some(true),
            project: Some(ProjectOverrides::default()),
            payload: Some(PayloadOverrides::default()),
            ..ConfigOverrides::default()
        };

        if let Some(home) = &self.home_dir {
            let path = home.join(".rox").join("config.yml");
            if let Some(layer) = read_config_file(&path)? {
                merged.merge_from(strip_uid(layer));
            }
        }

        let mut missing_project_config = None;
        let project_config = match self.env.get(ENV_CONFIG) {
            Some(path) => {
                let path = self.project_dir.join(path);
                if !path.exists() {
                    // Deferred to validate() so load() never fails on an
                    // absent file.
                    missing_project_config = Some(path.clone());
                }
                path
            }
            None => self.project_dir.join(PROJECT_CONFIG_DEFAULT),
        };
        if let Some(layer) = read_config_file(&project_config)? {
            merged.merge_from(strip_uid(layer));
        }

        if let Some(overrides) = overrides {
            merged.merge_from(overrides);
        }

        merged.merge_from(self.env_layer());

        Ok(resolve(merged, missing_project_config))
    }

    fn env_layer(&self) -> ConfigOverrides {
        ConfigOverrides {
            publish: self.env.get(ENV_PUBLISH).map(|v| parse_boolean(&v)),
            server: self.env.get(ENV_SERVER),
            workspace: self.env.get(ENV_WORKSPACE),
            payload: Some(PayloadOverrides {
                cache: self.env.get(ENV_CACHE_PAYLOAD).map(|v| parse_boolean(&v)),
                print: self.env.get(ENV_PRINT_PAYLOAD).map(|v| parse_boolean(&v)),
                save: self.env.get(ENV_SAVE_PAYLOAD).map(|v| parse_boolean(&v)),
            }),
            test_run_uid: self.env.get(ENV_TEST_RUN_UID),
            ..ConfigOverrides::default()
        }
    }
}

/// Boolean environment variables: case-insensitive membership in
/// `{1, t, true, y, yes}`; anything else is false.
pub fn parse_boolean(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "t" | "true" | "y" | "yes"
    )
}

fn read_config_file(path: &Path) -> Result<Option<ConfigOverrides>, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, skipping");
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let layer = serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(Some(layer))
}

/// File-sourced layers never contribute a test run UID.
fn strip_uid(mut layer: ConfigOverrides) -> ConfigOverrides {
    layer.test_run_uid = None;
    layer
}

fn resolve(merged: ConfigOverrides, missing_project_config: Option<PathBuf>) -> Config {
    let project = merged.project.unwrap_or_default();
    let payload = merged.payload.unwrap_or_default();
    Config {
        publish: merged.publish.unwrap_or(true),
        project: ProjectConfig {
            api_id: project.api_id,
            version: project.version,
            category: project.category,
            tags: project.tags.unwrap_or_default(),
            tickets: project.tickets.unwrap_or_default(),
        },
        servers: merged.servers.unwrap_or_default(),
        server: merged.server,
        workspace: merged.workspace.map(PathBuf::from),
        payload: PayloadFlags {
            cache: payload.cache.unwrap_or(false),
            print: payload.print.unwrap_or(false),
            save: payload.save.unwrap_or(false),
        },
        test_run_uid: merged.test_run_uid,
        missing_project_config,
    }
}

impl ConfigOverrides {
    fn merge_from(&mut self, layer: ConfigOverrides) {
        merge_scalar(&mut self.publish, layer.publish);
        if let Some(project) = layer.project {
            self.project
                .get_or_insert_with(ProjectOverrides::default)
                .merge_from(project);
        }
        if let Some(servers) = layer.servers {
            let base = self.servers.get_or_insert_with(BTreeMap::new);
            for (name, server) in servers {
                base.entry(name).or_default().merge_from(server);
            }
        }
        merge_scalar(&mut self.server, layer.server);
        merge_scalar(&mut self.workspace, layer.workspace);
        if let Some(payload) = layer.payload {
            let base = self.payload.get_or_insert_with(PayloadOverrides::default);
            merge_scalar(&mut base.cache, payload.cache);
            merge_scalar(&mut base.print, payload.print);
            merge_scalar(&mut base.save, payload.save);
        }
        merge_scalar(&mut self.test_run_uid, layer.test_run_uid);
    }
}

impl ProjectOverrides {
    fn merge_from(&mut self, layer: ProjectOverrides) {
        merge_scalar(&mut self.api_id, layer.api_id);
        merge_scalar(&mut self.version, layer.version);
        merge_scalar(&mut self.category, layer.category);
        union_into(&mut self.tags, layer.tags);
        union_into(&mut self.tickets, layer.tickets);
    }
}

impl ServerConfig {
    fn merge_from(&mut self, layer: ServerConfig) {
        merge_scalar(&mut self.api_url, layer.api_url);
        merge_scalar(&mut self.api_key_id, layer.api_key_id);
        merge_scalar(&mut self.api_key_secret, layer.api_key_secret);
        merge_scalar(&mut self.project_api_id, layer.project_api_id);
    }
}

fn merge_scalar<T>(base: &mut Option<T>, layer: Option<T>) {
    if layer.is_some() {
        *base = layer;
    }
}

/// Tags and tickets are unioned across layers, not overwritten.
fn union_into(base: &mut Option<Vec<String>>, layer: Option<Vec<String>>) {
    if let Some(values) = layer {
        let base = base.get_or_insert_with(Vec::new);
        for value in values {
            if !base.contains(&value) {
                base.push(value);
            }
        }
    }
}
