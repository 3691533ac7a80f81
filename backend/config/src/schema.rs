//! PromptCraft client configuration schema.
//!
//! Every section and field is optional in the file; [`crate::defaults`]
//! fills the gaps after load. Keys are camelCase on disk.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptCraftConfig {
    /// Where the streaming API lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Credential sent as the stream `token` parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Reconnect backoff policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<ReconnectConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<HeartbeatConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// e.g. `https://api.example.com/api/v1`; streams live under `/stream/{id}/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_factor: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    /// Absent means retry forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// `standard`, `enhanced-fast` or `enhanced-deep`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the rolling JSON log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
server:
  baseUrl: https://api.example.com/v1
reconnect:
  baseDelayMs: 500
  decayFactor: 2.0
  maxAttempts: 10
heartbeat:
  timeoutMs: 30000
session:
  defaultMode: enhanced-deep
"#;
        let cfg: PromptCraftConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            cfg.server.unwrap().base_url.as_deref(),
            Some("https://api.example.com/v1")
        );
        let reconnect = cfg.reconnect.unwrap();
        assert_eq!(reconnect.base_delay_ms, Some(500));
        assert_eq!(reconnect.decay_factor, Some(2.0));
        assert_eq!(reconnect.max_delay_ms, None);
        assert_eq!(reconnect.max_attempts, Some(10));
        assert_eq!(cfg.heartbeat.unwrap().timeout_ms, Some(30_000));
        assert!(cfg.auth.is_none());
    }

    #[test]
    fn empty_sections_serialize_away() {
        let json = serde_json::to_value(PromptCraftConfig::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
