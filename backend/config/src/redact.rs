//! Config redaction for display: secrets keep a short prefix hint and the
//! rest is masked.

use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &["token", "apiKey", "api_key", "secret", "password"];

/// Redact every sensitive string field in a config value tree.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => Value::String(mask(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_auth_token() {
        let v = json!({"auth": {"token": "eyJhbGciOiJIUzI1NiJ9.payload"}});
        let out = redact(&v);
        assert_eq!(out["auth"]["token"], "eyJh***");
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let out = redact(&json!({"auth": {"token": "abc"}}));
        assert_eq!(out["auth"]["token"], "***");
    }

    #[test]
    fn leaves_other_fields() {
        let v = json!({"server": {"baseUrl": "https://h/api"}, "reconnect": {"maxAttempts": 3}});
        assert_eq!(redact(&v), v);
    }
}
