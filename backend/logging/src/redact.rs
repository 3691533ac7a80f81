//! Log Redaction
//!
//! Stream URLs carry their credential as a `token` query parameter, and
//! server error text may echo bearer tokens. Both are scrubbed before
//! anything reaches a log line.

use regex::Regex;
use std::sync::LazyLock;

static TOKEN_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&]token=)[^&#\s]*").unwrap());
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});

/// Replace the value of every `token` query parameter in a URL.
pub fn redact_url(url: &str) -> String {
    TOKEN_PARAM_RE.replace_all(url, "${1}[REDACTED]").into_owned()
}

/// Redacts API keys and bearer tokens in free text.
pub fn redact_sensitive_data(input: &str) -> String {
    API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_token_query_param() {
        assert_eq!(
            redact_url("http://localhost:8000/stream/s1/?token=abc.def"),
            "http://localhost:8000/stream/s1/?token=[REDACTED]"
        );
    }

    #[test]
    fn redacts_token_among_other_params() {
        assert_eq!(
            redact_url("https://h/stream/s1/?a=1&token=xyz&b=2"),
            "https://h/stream/s1/?a=1&token=[REDACTED]&b=2"
        );
    }

    #[test]
    fn leaves_urls_without_token_alone() {
        let url = "https://h/stream/s1/?mytoken=keep";
        assert_eq!(redact_url(url), url);
    }

    #[test]
    fn redacts_bearer_tokens() {
        let raw = "upstream said: Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 rejected";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(clean.contains("[REDACTED_TOKEN]"));
    }
}
