//! Platform credential API seam

use async_trait::async_trait;
use url::Url;

use super::credential::{AssertionCredential, RegistrationCredential};
use super::options::{CredentialCreationOptions, CredentialRequestOptions};
use crate::errors::PlatformError;

/// The platform authenticator (browser credential API, OS passkey provider,
/// security key bridge)
///
/// Both calls may wait indefinitely for user interaction. A cancellation or
/// platform timeout must surface as a single `Err`; `Ok(None)` means the
/// platform resolved without producing a credential.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Run the credential-creation ceremony
    ///
    /// # Errors
    ///
    /// Returns the platform's rejection, e.g. `NotAllowedError` when the user
    /// dismissed the prompt or `InvalidStateError` for an excluded credential
    async fn create_credential(
        &self,
        options: &CredentialCreationOptions,
    ) -> Result<Option<RegistrationCredential>, PlatformError>;

    /// Run the credential-retrieval (assertion) ceremony
    ///
    /// # Errors
    ///
    /// Returns the platform's rejection
    async fn get_assertion(
        &self,
        options: &CredentialRequestOptions,
    ) -> Result<Option<AssertionCredential>, PlatformError>;
}

/// Where the client is running, as far as the secure-context rule cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Scheme with trailing colon, e.g. `https:`
    pub protocol: String,
    pub hostname: String,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(protocol: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
        }
    }

    /// Build the context from an origin such as `https://app.example.com`
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid URL
    pub fn from_origin(origin: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(origin)?;
        Ok(Self::new(
            format!("{}:", url.scheme()),
            url.host_str().unwrap_or_default(),
        ))
    }

    /// HTTPS, or a loopback host
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("https:")
            || self.hostname == "localhost"
            || self.hostname == "127.0.0.1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_is_secure() {
        assert!(ExecutionContext::new("https:", "example.com").is_secure());
    }

    #[test]
    fn test_plain_http_on_public_host_is_insecure() {
        assert!(!ExecutionContext::new("http:", "example.com").is_secure());
    }

    #[test]
    fn test_loopback_hosts_are_secure_over_http() {
        assert!(ExecutionContext::new("http:", "localhost").is_secure());
        assert!(ExecutionContext::new("http:", "127.0.0.1").is_secure());
        assert!(!ExecutionContext::new("http:", "127.0.0.2").is_secure());
    }

    #[test]
    fn test_from_origin() {
        let context = ExecutionContext::from_origin("https://app.example.com:8443/login").unwrap();
        assert_eq!(context, ExecutionContext::new("https:", "app.example.com"));

        let context = ExecutionContext::from_origin("http://localhost:3000").unwrap();
        assert!(context.is_secure());

        assert!(ExecutionContext::from_origin("not an origin").is_err());
    }
}
