//! Config validation with path-qualified errors and warnings.

use promptcraft_core::SessionMode;
use thiserror::Error;

use crate::schema::PromptCraftConfig;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &PromptCraftConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_reconnect(config, &mut report);
    validate_heartbeat(config, &mut report);
    validate_session(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_server(config: &PromptCraftConfig, report: &mut ValidationReport) {
    let Some(base) = config.server.as_ref().and_then(|s| s.base_url.as_deref()) else {
        return;
    };
    if base.trim().is_empty() {
        report.error("server.baseUrl", "baseUrl cannot be empty");
    } else if !(base.starts_with("http://") || base.starts_with("https://")) {
        report.warn(
            "server.baseUrl",
            format!("'{base}' is not an http(s) URL; streaming will likely fail"),
        );
    }
}

fn validate_reconnect(config: &PromptCraftConfig, report: &mut ValidationReport) {
    let Some(reconnect) = &config.reconnect else { return };
    if let Some(factor) = reconnect.decay_factor {
        if !factor.is_finite() || factor <= 0.0 {
            report.error("reconnect.decayFactor", "decayFactor must be a positive number");
        } else if factor < 1.0 {
            report.warn(
                "reconnect.decayFactor",
                format!("decayFactor {factor} < 1 makes delays shrink between attempts"),
            );
        }
    }
    if let (Some(base), Some(max)) = (reconnect.base_delay_ms, reconnect.max_delay_ms) {
        if max < base {
            report.warn(
                "reconnect.maxDelayMs",
                format!("maxDelayMs ({max}) is below baseDelayMs ({base}); every delay is capped to {max}"),
            );
        }
    }
    if reconnect.max_attempts == Some(0) {
        report.warn(
            "reconnect.maxAttempts",
            "maxAttempts 0 gives up on the first dropped connection",
        );
    }
}

fn validate_heartbeat(config: &PromptCraftConfig, report: &mut ValidationReport) {
    if config.heartbeat.as_ref().and_then(|h| h.timeout_ms) == Some(0) {
        report.error("heartbeat.timeoutMs", "timeoutMs must be > 0");
    }
}

fn validate_session(config: &PromptCraftConfig, report: &mut ValidationReport) {
    let Some(mode) = config.session.as_ref().and_then(|s| s.default_mode.as_deref()) else {
        return;
    };
    if let Err(e) = mode.parse::<SessionMode>() {
        report.error("session.defaultMode", e);
    }
}

fn validate_logging(config: &PromptCraftConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        report.warn(
            "logging.level",
            format!("'{level}' is not a plain level; it will be used as a filter directive"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{ReconnectConfig, ServerConfig, SessionConfig};

    #[test]
    fn defaulted_config_is_clean() {
        let report = validate(&apply_all_defaults(PromptCraftConfig::default()));
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn shrinking_backoff_warns() {
        let cfg = PromptCraftConfig {
            reconnect: Some(ReconnectConfig {
                decay_factor: Some(0.5),
                base_delay_ms: Some(5_000),
                max_delay_ms: Some(1_000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        let paths: Vec<_> = report.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(paths, vec!["reconnect.decayFactor", "reconnect.maxDelayMs"]);
    }

    #[test]
    fn non_http_base_warns() {
        let cfg = PromptCraftConfig {
            server: Some(ServerConfig {
                base_url: Some("ftp://example.com".into()),
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert_eq!(report.warnings[0].path, "server.baseUrl");
    }

    #[test]
    fn unknown_mode_is_an_error() {
        let cfg = PromptCraftConfig {
            session: Some(SessionConfig {
                default_mode: Some("turbo".into()),
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "session.defaultMode");
        assert!(report.errors[0].message.contains("turbo"));
    }
}
