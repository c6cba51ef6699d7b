//! Tests for configuration loading and layering.

use std::io::Write;
use std::sync::{Mutex, OnceLock};

use pretty_assertions::assert_eq;

use toolmesh::config::{
    MeshConfig, ENV_NAMESPACE_SEPARATOR, ENV_REQUEST_TIMEOUT_MS, ENV_SEARCH_LIMIT,
    ENV_SERVER_NAME, ENV_SESSION_SECRET, ENV_SESSION_TTL_SECS,
};
use toolmesh::error::MeshError;
use toolmesh::tools::Visibility;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 6] = [
    ENV_SERVER_NAME,
    ENV_NAMESPACE_SEPARATOR,
    ENV_SEARCH_LIMIT,
    ENV_REQUEST_TIMEOUT_MS,
    ENV_SESSION_SECRET,
    ENV_SESSION_TTL_SECS,
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clear_config_env() -> EnvGuard {
    let guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    guard
}

#[test]
fn env_overrides_defaults() {
    let _lock = env_lock_guard();
    let _env = clear_config_env();
    std::env::set_var(ENV_SERVER_NAME, "from-env");
    std::env::set_var(ENV_NAMESPACE_SEPARATOR, "__");
    std::env::set_var(ENV_SEARCH_LIMIT, "25");
    std::env::set_var(ENV_SESSION_SECRET, "env-secret-at-least-16");
    std::env::set_var(ENV_SESSION_TTL_SECS, "120");

    let config = MeshConfig::from_env().unwrap();
    assert_eq!(config.server_name, "from-env");
    assert_eq!(config.namespace_separator, "__");
    assert_eq!(config.search_limit(), 25);
    let session = config.session.unwrap();
    assert_eq!(session.secret, "env-secret-at-least-16");
    assert_eq!(session.ttl_secs, 120);
}

#[test]
fn malformed_env_number_is_a_configuration_error() {
    let _lock = env_lock_guard();
    let _env = clear_config_env();
    std::env::set_var(ENV_REQUEST_TIMEOUT_MS, "soon");

    let err = MeshConfig::from_env().unwrap_err();
    assert!(matches!(err, MeshError::Configuration(ref m) if m.contains(ENV_REQUEST_TIMEOUT_MS)));
}

#[test]
fn file_then_env_layering() {
    let _lock = env_lock_guard();
    let _env = clear_config_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
server_name = "from-file"
default_search_limit = 5

[[federation]]
namespace = "git"
url = "http://localhost:9001/mcp"
visibility = "discoverable"
allow = ["status", "log"]
"#
    )
    .unwrap();

    std::env::set_var(ENV_SERVER_NAME, "from-env");
    let config = MeshConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.server_name, "from-env");
    assert_eq!(config.search_limit(), 5);
    assert_eq!(config.federation.len(), 1);
    assert_eq!(config.federation[0].visibility, Visibility::Discoverable);
    assert_eq!(config.federation[0].allow, vec!["status", "log"]);
}

#[test]
fn invalid_file_is_reported_with_its_path() {
    let _lock = env_lock_guard();
    let _env = clear_config_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "default_search_limit = \"many\"").unwrap();

    let err = MeshConfig::load(Some(file.path())).unwrap_err();
    match err {
        MeshError::Configuration(message) => {
            assert!(message.contains(&file.path().display().to_string()), "{message}");
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MeshConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, MeshError::Io(_)));
}

#[test]
fn loaded_config_is_validated() {
    let _lock = env_lock_guard();
    let _env = clear_config_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[session]
secret = "short"
"#
    )
    .unwrap();

    assert!(matches!(
        MeshConfig::load(Some(file.path())),
        Err(MeshError::Configuration(_))
    ));
}
