//! `promptcraft-config`: client configuration.
//!
//! Provides:
//! - Typed YAML schema (server, auth, reconnect, heartbeat, session, logging)
//! - `${ENV_VAR}` substitution and `PROMPTCRAFT_*` overrides
//! - Default value application and conversion to runtime options
//! - Validation report
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, resolve_env_vars_with, MissingEnvVarError, BASE_URL_ENV, TOKEN_ENV,
};
pub use io::{config_dir, config_file_path, load_raw_config, CONFIG_DIR_ENV};
pub use redact::redact;
pub use schema::PromptCraftConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load a config file against the process environment: substitute
/// `${VAR}`s, apply env overrides and defaults, and log validation findings.
pub async fn load_and_prepare(path: &Path) -> Result<PromptCraftConfig> {
    load_and_prepare_with(path, &std::env::vars().collect()).await
}

/// [`load_and_prepare`] against an explicit environment.
pub async fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<PromptCraftConfig> {
    let raw = load_raw_config(path).await?;
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let config: PromptCraftConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(apply_env_overrides(config, env));

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptcraft_core::SessionMode;
    use tokio::fs;

    #[tokio::test]
    async fn full_pipeline() {
        let dir = std::env::temp_dir().join(format!("promptcraft-load-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(
            &path,
            "auth:\n  token: ${PC_TEST_TOKEN}\nreconnect:\n  maxAttempts: 5\nsession:\n  defaultMode: enhanced-deep\n",
        )
        .await
        .unwrap();

        let env: HashMap<String, String> = [
            ("PC_TEST_TOKEN".to_string(), "file-token".to_string()),
            (BASE_URL_ENV.to_string(), "https://override/api".to_string()),
        ]
        .into_iter()
        .collect();
        let cfg = load_and_prepare_with(&path, &env).await.unwrap();

        assert_eq!(cfg.token(), Some("file-token"));
        assert_eq!(cfg.base_url(), "https://override/api");
        assert_eq!(cfg.reconnect_policy().max_attempts, Some(5));
        assert_eq!(cfg.reconnect_policy().base_delay_ms, 1_000);
        assert_eq!(cfg.default_mode(), SessionMode::EnhancedDeep);
        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_env_var_fails_load() {
        let dir = std::env::temp_dir().join(format!("promptcraft-load-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(&path, "auth:\n  token: ${PC_UNSET_TOKEN}\n").await.unwrap();

        let err = load_and_prepare_with(&path, &HashMap::new()).await.unwrap_err();
        assert!(format!("{err:#}").contains("PC_UNSET_TOKEN"));
        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn no_file_means_defaults() {
        let path = Path::new("/nonexistent/promptcraft/promptcraft.yaml");
        let cfg = load_and_prepare_with(path, &HashMap::new()).await.unwrap();
        assert_eq!(cfg, apply_all_defaults(PromptCraftConfig::default()));
    }
}
