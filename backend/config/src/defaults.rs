//! Config defaults, and conversion of a defaulted config into the runtime
//! types the client consumes.

use std::time::Duration;

use promptcraft_core::SessionMode;
use promptcraft_stream::{ConnectOptions, ReconnectPolicy};

use crate::schema::{
    HeartbeatConfig, LoggingConfig, PromptCraftConfig, ReconnectConfig, ServerConfig,
    SessionConfig,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_DECAY_FACTOR: f64 = 1.5;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 45_000;
pub const DEFAULT_SESSION_MODE: &str = "standard";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config. Values the user set are
/// never overwritten.
pub fn apply_all_defaults(config: PromptCraftConfig) -> PromptCraftConfig {
    let config = apply_server_defaults(config);
    let config = apply_reconnect_defaults(config);
    let config = apply_heartbeat_defaults(config);
    let config = apply_session_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: PromptCraftConfig) -> PromptCraftConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server
        .base_url
        .get_or_insert_with(|| DEFAULT_BASE_URL.to_string());
    config
}

/// `maxAttempts` stays unset: unlimited.
fn apply_reconnect_defaults(mut config: PromptCraftConfig) -> PromptCraftConfig {
    let reconnect = config.reconnect.get_or_insert_with(ReconnectConfig::default);
    reconnect.base_delay_ms.get_or_insert(DEFAULT_BASE_DELAY_MS);
    reconnect.decay_factor.get_or_insert(DEFAULT_DECAY_FACTOR);
    reconnect.max_delay_ms.get_or_insert(DEFAULT_MAX_DELAY_MS);
    config
}

fn apply_heartbeat_defaults(mut config: PromptCraftConfig) -> PromptCraftConfig {
    let heartbeat = config.heartbeat.get_or_insert_with(HeartbeatConfig::default);
    heartbeat.timeout_ms.get_or_insert(DEFAULT_HEARTBEAT_TIMEOUT_MS);
    config
}

fn apply_session_defaults(mut config: PromptCraftConfig) -> PromptCraftConfig {
    let session = config.session.get_or_insert_with(SessionConfig::default);
    session
        .default_mode
        .get_or_insert_with(|| DEFAULT_SESSION_MODE.to_string());
    config
}

fn apply_logging_defaults(mut config: PromptCraftConfig) -> PromptCraftConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging
        .dir
        .get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}

impl PromptCraftConfig {
    pub fn base_url(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn token(&self) -> Option<&str> {
        self.auth
            .as_ref()
            .and_then(|a| a.token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let section = self.reconnect.clone().unwrap_or_default();
        ReconnectPolicy {
            base_delay_ms: section.base_delay_ms.unwrap_or(DEFAULT_BASE_DELAY_MS),
            decay_factor: section.decay_factor.unwrap_or(DEFAULT_DECAY_FACTOR),
            max_delay_ms: section.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS),
            max_attempts: section.max_attempts,
        }
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(
            self.heartbeat
                .as_ref()
                .and_then(|h| h.timeout_ms)
                .unwrap_or(DEFAULT_HEARTBEAT_TIMEOUT_MS),
        )
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            policy: self.reconnect_policy(),
            heartbeat_timeout: self.heartbeat_timeout(),
            auto_reconnect: true,
        }
    }

    /// The configured default mode; an unparseable value falls back to
    /// `standard` (validation reports it).
    pub fn default_mode(&self) -> SessionMode {
        self.session
            .as_ref()
            .and_then(|s| s.default_mode.as_deref())
            .and_then(|m| m.parse().ok())
            .unwrap_or(SessionMode::Standard)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .unwrap_or(DEFAULT_LOG_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(PromptCraftConfig::default());
        let reconnect = cfg.reconnect.clone().unwrap();
        assert_eq!(reconnect.base_delay_ms, Some(1_000));
        assert_eq!(reconnect.decay_factor, Some(1.5));
        assert_eq!(reconnect.max_delay_ms, Some(30_000));
        assert_eq!(reconnect.max_attempts, None);
        assert_eq!(cfg.heartbeat.clone().unwrap().timeout_ms, Some(45_000));
        assert_eq!(cfg.default_mode(), SessionMode::Standard);
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn does_not_override_user_values() {
        let cfg = PromptCraftConfig {
            reconnect: Some(ReconnectConfig {
                base_delay_ms: Some(250),
                max_attempts: Some(4),
                ..Default::default()
            }),
            session: Some(SessionConfig {
                default_mode: Some("enhanced-fast".into()),
            }),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        let policy = cfg.reconnect_policy();
        assert_eq!(policy.base_delay_ms, 250);
        assert_eq!(policy.decay_factor, 1.5);
        assert_eq!(policy.max_attempts, Some(4));
        assert_eq!(cfg.default_mode(), SessionMode::EnhancedFast);
    }

    #[test]
    fn connect_options_match_runtime_defaults() {
        let cfg = apply_all_defaults(PromptCraftConfig::default());
        assert_eq!(cfg.connect_options(), ConnectOptions::default());
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let cfg = PromptCraftConfig {
            auth: Some(crate::schema::AuthConfig {
                token: Some("  ".into()),
            }),
            ..Default::default()
        };
        assert_eq!(cfg.token(), None);
    }
}
