//! Stream endpoint construction.

use std::fmt;

use url::Url;

use crate::error::EndpointError;

/// Query parameter carrying the bearer credential.
pub const TOKEN_PARAM: &str = "token";

/// A bearer credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for an empty or whitespace-only token.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Where a session's stream lives: `{base}/stream/{resource_id}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    base_url: Url,
    resource_id: String,
}

impl StreamEndpoint {
    pub fn new(base_url: &str, resource_id: impl Into<String>) -> Result<Self, EndpointError> {
        let parsed = Url::parse(base_url).map_err(|source| EndpointError::InvalidBase {
            url: base_url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(EndpointError::CannotBeABase(base_url.to_string()));
        }
        let resource_id = resource_id.into();
        if resource_id.trim().is_empty() {
            return Err(EndpointError::EmptyResource);
        }
        Ok(Self {
            base_url: parsed,
            resource_id,
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the stream URL, appending `?token=` only when a credential is
    /// available. Without one the request goes out unauthenticated.
    pub fn url(&self, credential: Option<&Credential>) -> Result<Url, EndpointError> {
        let mut url = self.base_url.clone();
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| EndpointError::CannotBeABase(self.base_url.to_string()))?;
            segments
                .pop_if_empty()
                .push("stream")
                .push(&self.resource_id)
                .push("");
        }
        if let Some(credential) = credential {
            url.query_pairs_mut()
                .append_pair(TOKEN_PARAM, credential.expose());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_stream_path_with_trailing_slash() {
        let ep = StreamEndpoint::new("https://api.example.com/v1/", "tpl-42").unwrap();
        assert_eq!(
            ep.url(None).unwrap().as_str(),
            "https://api.example.com/v1/stream/tpl-42/"
        );
    }

    #[test]
    fn base_without_trailing_slash() {
        let ep = StreamEndpoint::new("https://api.example.com/v1", "s1").unwrap();
        assert_eq!(
            ep.url(None).unwrap().as_str(),
            "https://api.example.com/v1/stream/s1/"
        );
    }

    #[test]
    fn appends_token_when_credential_present() {
        let ep = StreamEndpoint::new("http://localhost:8000", "s1").unwrap();
        let cred = Credential::new("abc.def").unwrap();
        assert_eq!(
            ep.url(Some(&cred)).unwrap().as_str(),
            "http://localhost:8000/stream/s1/?token=abc.def"
        );
    }

    #[test]
    fn resource_id_is_percent_encoded() {
        let ep = StreamEndpoint::new("http://localhost:8000", "a b/c").unwrap();
        assert_eq!(
            ep.url(None).unwrap().as_str(),
            "http://localhost:8000/stream/a%20b%2Fc/"
        );
    }

    #[test]
    fn empty_credential_is_none() {
        assert!(Credential::new("   ").is_none());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("super-secret").unwrap();
        assert!(!format!("{cred:?}").contains("super-secret"));
    }

    #[test]
    fn rejects_bad_base_and_empty_id() {
        assert!(matches!(
            StreamEndpoint::new("not a url", "s1"),
            Err(EndpointError::InvalidBase { .. })
        ));
        assert!(matches!(
            StreamEndpoint::new("mailto:someone@example.com", "s1"),
            Err(EndpointError::CannotBeABase(_))
        ));
        assert!(matches!(
            StreamEndpoint::new("http://localhost", ""),
            Err(EndpointError::EmptyResource)
        ));
    }
}
