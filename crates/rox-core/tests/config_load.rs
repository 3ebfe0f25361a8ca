//! End-to-end configuration loading against real files.

use rox_core::config::{ConfigLoader, ConfigOverrides, ProjectOverrides};
use rox_core::errors::ConfigError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn write_home_config(home: &Path, yaml: &str) {
    let dir = home.join(".rox");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), yaml).unwrap();
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn loads_defaults_when_no_file_exists() {
    let project_dir = tempfile::tempdir().unwrap();
    let loader = ConfigLoader::with_dirs(env(&[]), None, project_dir.path());
    let config = loader.load(None).unwrap();

    assert!(config.publish);
    assert!(config.project.api_id.is_none());
    assert!(config.servers.is_empty());
    assert!(config.workspace.is_none());
    assert!(!config.payload.cache);
    assert!(config.test_run_uid.is_none());
}

#[test]
fn project_file_overrides_home_file_scalars() {
    let home = tempfile::tempdir().unwrap();
    let project_dir = tempfile::tempdir().unwrap();
    write_home_config(
        home.path(),
        "project:\n  apiId: home-project\n  version: 0.9.0\nserver: home\n",
    );
    fs::write(
        project_dir.path().join("rox.yml"),
        "project:\n  version: 1.0.0\nserver: project\n",
    )
    .unwrap();

    let loader =
        ConfigLoader::with_dirs(env(&[]), Some(home.path().to_path_buf()), project_dir.path());
    let config = loader.load(None).unwrap();

    assert_eq!(config.project.api_id.as_deref(), Some("home-project"));
    assert_eq!(config.project.version.as_deref(), Some("1.0.0"));
    assert_eq!(config.server.as_deref(), Some("project"));
}

#[test]
fn tags_and_tickets_are_unioned_across_files_and_overrides() {
    let home = tempfile::tempdir().unwrap();
    let project_dir = tempfile::tempdir().unwrap();
    write_home_config(home.path(), "project:\n  tags: [a, b]\n");
    fs::write(
        project_dir.path().join("rox.yml"),
        "project:\n  tags: [b, c]\n  tickets: [T-1]\n",
    )
    .unwrap();

    let loader =
        ConfigLoader::with_dirs(env(&[]), Some(home.path().to_path_buf()), project_dir.path());
    let config = loader
        .load(Some(ConfigOverrides {
            project: Some(ProjectOverrides {
                tags: Some(vec!["d".into()]),
                tickets: Some(vec!["T-1".into(), "T-2".into()]),
                ..ProjectOverrides::default()
            }),
            ..ConfigOverrides::default()
        }))
        .unwrap();

    assert_eq!(config.project.tags, vec!["a", "b", "c", "d"]);
    assert_eq!(config.project.tickets, vec!["T-1", "T-2"]);
}

#[test]
fn test_run_uid_is_never_read_from_files() {
    let project_dir = tempfile::tempdir().unwrap();
    fs::write(project_dir.path().join("rox.yml"), "testRunUid: from-file\n").unwrap();

    let loader = ConfigLoader::with_dirs(env(&[]), None, project_dir.path());
    let config = loader.load(None).unwrap();
    assert!(config.test_run_uid.is_none());
}

#[test]
fn test_run_uid_comes_from_overrides_or_environment() {
    let project_dir = tempfile::tempdir().unwrap();
    let loader = ConfigLoader::with_dirs(env(&[]), None, project_dir.path());
    let config = loader
        .load(Some(ConfigOverrides {
            test_run_uid: Some("override-uid".into()),
            ..ConfigOverrides::default()
        }))
        .unwrap();
    assert_eq!(config.test_run_uid.as_deref(), Some("override-uid"));

    let loader = ConfigLoader::with_dirs(
        env(&[("ROX_TEST_RUN_UID", "env-uid")]),
        None,
        project_dir.path(),
    );
    let config = loader
        .load(Some(ConfigOverrides {
            test_run_uid: Some("override-uid".into()),
            ..ConfigOverrides::default()
        }))
        .unwrap();
    assert_eq!(config.test_run_uid.as_deref(), Some("env-uid"));
}

#[test]
fn environment_beats_files_and_overrides() {
    let project_dir = tempfile::tempdir().unwrap();
    fs::write(
        project_dir.path().join("rox.yml"),
        "publish: true\nserver: file-server\n",
    )
    .unwrap();

    let loader = ConfigLoader::with_dirs(
        env(&[
            ("ROX_PUBLISH", "no"),
            ("ROX_SERVER", "env-server"),
            ("ROX_WORKSPACE", "/tmp/rox-ws"),
            ("ROX_CACHE_PAYLOAD", "1"),
            ("ROX_PRINT_PAYLOAD", "TRUE"),
            ("ROX_SAVE_PAYLOAD", "garbage"),
        ]),
        None,
        project_dir.path(),
    );
    let config = loader
        .load(Some(ConfigOverrides {
            server: Some("override-server".into()),
            ..ConfigOverrides::default()
        }))
        .unwrap();

    assert!(!config.publish);
    assert_eq!(config.server.as_deref(), Some("env-server"));
    assert_eq!(config.workspace.as_deref(), Some(Path::new("/tmp/rox-ws")));
    assert!(config.payload.cache);
    assert!(config.payload.print);
    assert!(!config.payload.save);
}

#[test]
fn rox_config_env_var_selects_the_project_file() {
    let project_dir = tempfile::tempdir().unwrap();
    fs::write(project_dir.path().join("rox.yml"), "server: default-file\n").unwrap();
    fs::write(project_dir.path().join("custom.yml"), "server: custom-file\n").unwrap();

    let loader = ConfigLoader::with_dirs(env(&[("ROX_CONFIG", "custom.yml")]), None, project_dir.path());
    let config = loader.load(None).unwrap();
    assert_eq!(config.server.as_deref(), Some("custom-file"));
}

#[test]
fn missing_explicit_config_path_fails_validate_not_load() {
    let project_dir = tempfile::tempdir().unwrap();
    let loader =
        ConfigLoader::with_dirs(env(&[("ROX_CONFIG", "missing.yml")]), None, project_dir.path());

    let config = loader.load(None).unwrap();

    let mut errors = Vec::new();
    config.validate(&mut errors);
    assert!(errors
        .iter()
        .any(|e| e.contains("missing.yml") && e.contains("$ROX_CONFIG")));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let project_dir = tempfile::tempdir().unwrap();
    fs::write(project_dir.path().join("rox.yml"), "publish: [unclosed\n").unwrap();

    let loader = ConfigLoader::with_dirs(env(&[]), None, project_dir.path());
    match loader.load(None) {
        Err(ConfigError::Parse { path, .. }) => {
            assert!(path.ends_with("rox.yml"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn load_starts_from_a_clean_slate() {
    let project_dir = tempfile::tempdir().unwrap();
    fs::write(project_dir.path().join("rox.yml"), "server: from-file\n").unwrap();

    let loader = ConfigLoader::with_dirs(env(&[]), None, project_dir.path());
    let first = loader.load(None).unwrap();
    assert_eq!(first.server.as_deref(), Some("from-file"));

    fs::remove_file(project_dir.path().join("rox.yml")).unwrap();
    let second = loader.load(None).unwrap();
    assert!(second.server.is_none());
}

#[test]
fn full_resolved_config_reads_server_options() {
    let project_dir = tempfile::tempdir().unwrap();
    fs::write(
        project_dir.path().join("rox.yml"),
        concat!(
            "project:\n",
            "  apiId: my-project\n",
            "  version: 1.2.3\n",
            "server: main\n",
            "servers:\n",
            "  main:\n",
            "    apiUrl: https://rox.example.com/api\n",
            "    apiKeyId: key-id\n",
            "    apiKeySecret: key-secret\n",
            "    projectApiId: server-side-project\n",
        ),
    )
    .unwrap();

    let loader = ConfigLoader::with_dirs(env(&[]), None, project_dir.path());
    let config = loader.load(None).unwrap();

    let server = config.server_options();
    assert_eq!(server.api_url.as_deref(), Some("https://rox.example.com/api"));
    assert_eq!(server.api_key_id.as_deref(), Some("key-id"));
    assert_eq!(server.api_key_secret.as_deref(), Some("key-secret"));

    let project = config.project_options();
    assert_eq!(project.api_id.as_deref(), Some("server-side-project"));
    assert_eq!(project.version.as_deref(), Some("1.2.3"));

    let mut errors = Vec::new();
    config.validate(&mut errors);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}
