//! Environment variable handling for config values.
//!
//! `${VAR_NAME}` in any string value is replaced at load time; only
//! uppercase `[A-Z_][A-Z0-9_]*` names are recognised and `$${VAR}` stays a
//! literal `${VAR}`. Separately, a few well-known variables override file
//! values outright.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{AuthConfig, PromptCraftConfig, ServerConfig};

/// Overrides `auth.token`.
pub const TOKEN_ENV: &str = "PROMPTCRAFT_TOKEN";
/// Overrides `server.baseUrl`.
pub const BASE_URL_ENV: &str = "PROMPTCRAFT_BASE_URL";

/// An optional leading `$` marks the reference as escaped.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references from `env`. A missing or empty variable
/// is an error naming the config path it was referenced from.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }
    let mut missing: Option<MissingEnvVarError> = None;
    let out = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });
    if let Some(err) = missing {
        bail!(err);
    }
    Ok(out.into_owned())
}

/// Apply `PROMPTCRAFT_TOKEN` / `PROMPTCRAFT_BASE_URL` from `env`. Empty
/// values are ignored.
pub fn apply_env_overrides(
    mut config: PromptCraftConfig,
    env: &HashMap<String, String>,
) -> PromptCraftConfig {
    let set = |name: &str| env.get(name).filter(|v| !v.trim().is_empty()).cloned();
    if let Some(token) = set(TOKEN_ENV) {
        config.auth.get_or_insert_with(AuthConfig::default).token = Some(token);
    }
    if let Some(base_url) = set(BASE_URL_ENV) {
        config.server.get_or_insert_with(ServerConfig::default).base_url = Some(base_url);
    }
    config
}
