//! Test run UID resolution.
//!
//! A UID groups the runs of several clients into one server-side report.
//! The environment variable (folded into the config at load time) has the
//! highest precedence; a `uid` file in the shared workspace the lowest.

use rox_core::config::Config;

/// Resolves the UID for a new test run, or `None` when nothing provides one.
pub fn resolve_uid(config: &Config) -> Option<String> {
    if let Some(uid) = &config.test_run_uid {
        return Some(uid.clone());
    }

    let workspace = config.workspace.as_ref()?;
    let contents = std::fs::read_to_string(workspace.join("uid")).ok()?;
    // First line, verbatim.
    let uid = contents.split('\n').next().unwrap_or_default();
    if uid.is_empty() {
        None
    } else {
        Some(uid.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rox_core::config::{ConfigLoader, ConfigOverrides};
    use std::collections::BTreeMap;
    use std::fs;

    fn config(env: &[(&str, &str)], overrides: ConfigOverrides) -> Config {
        let env: BTreeMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigLoader::with_dirs(env, None, "/nonexistent")
            .load(Some(overrides))
            .unwrap()
    }

    #[test]
    fn environment_uid_wins() {
        let workspace = tempfile::tempdir().unwrap();
        fs::write(workspace.path().join("uid"), "file-uid\n").unwrap();

        let config = config(
            &[
                ("ROX_TEST_RUN_UID", "env-uid"),
                ("ROX_WORKSPACE", workspace.path().to_str().unwrap()),
            ],
            ConfigOverrides::default(),
        );
        assert_eq!(resolve_uid(&config).as_deref(), Some("env-uid"));
    }

    #[test]
    fn workspace_uid_file_is_the_fallback() {
        let workspace = tempfile::tempdir().unwrap();
        fs::write(workspace.path().join("uid"), "file-uid\nsecond line\n").unwrap();

        let config = config(
            &[("ROX_WORKSPACE", workspace.path().to_str().unwrap())],
            ConfigOverrides::default(),
        );
        assert_eq!(resolve_uid(&config).as_deref(), Some("file-uid"));
    }

    #[test]
    fn no_uid_when_workspace_has_none() {
        let workspace = tempfile::tempdir().unwrap();
        let config = config(
            &[("ROX_WORKSPACE", workspace.path().to_str().unwrap())],
            ConfigOverrides::default(),
        );
        assert_eq!(resolve_uid(&config), None);
    }

    #[test]
    fn no_uid_without_workspace_or_environment() {
        let config = config(&[], ConfigOverrides::default());
        assert_eq!(resolve_uid(&config), None);
    }
}
