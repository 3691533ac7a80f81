//! Config file location and loading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "promptcraft.yaml";

/// Overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "PROMPTCRAFT_CONFIG_DIR";

/// Resolve the config directory.
/// Priority: `PROMPTCRAFT_CONFIG_DIR` > `~/.promptcraft/` > `./.promptcraft`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".promptcraft"),
        None => PathBuf::from(".promptcraft"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped tree so `${VAR}` references can be
/// resolved before typed parsing. A missing file yields an empty object.
pub async fn load_raw_config(path: &Path) -> Result<Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as YAML null.
    let value: Value = serde_yaml::from_str::<Option<Value>>(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?
        .unwrap_or_else(|| Value::Object(Default::default()));

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("promptcraft-config-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn missing_file_is_empty_object() {
        let path = config_file_path(&scratch_dir());
        let value = load_raw_config(&path).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn reads_yaml_tree() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(&path, "server:\n  baseUrl: ${BASE}\nreconnect:\n  maxAttempts: 3\n")
            .await
            .unwrap();

        let value = load_raw_config(&path).await.unwrap();
        assert_eq!(value["server"]["baseUrl"], "${BASE}");
        assert_eq!(value["reconnect"]["maxAttempts"], 3);
        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn empty_file_is_empty_object() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(&path, "").await.unwrap();
        assert_eq!(load_raw_config(&path).await.unwrap(), serde_json::json!({}));
        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(&path, "server: [unclosed").await.unwrap();
        let err = load_raw_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn config_file_lives_in_dir() {
        assert_eq!(
            config_file_path(Path::new("/etc/pc")),
            PathBuf::from("/etc/pc/promptcraft.yaml")
        );
    }
}
