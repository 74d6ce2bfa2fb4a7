//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{Transport, TransportError, TransportResponse};
use crate::fingerprint::DeviceFingerprint;
use crate::settings::ServiceSettings;

/// HTTP transport talking JSON to the verification service
///
/// Keeps a cookie store for the lifetime of the client so session cookies set
/// by one call are sent on the next. No timeout is imposed beyond what the
/// underlying connection enforces.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    fingerprint_header: String,
}

impl HttpTransport {
    /// Create a transport from service settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The base URL cannot be parsed
    /// - The HTTP client cannot be built
    pub fn new(settings: &ServiceSettings) -> Result<Self, TransportError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| TransportError::InvalidUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Request {
                path: settings.base_url.clone(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            fingerprint_header: settings.fingerprint_header.clone(),
        })
    }

    /// Resolve an endpoint path against the base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid
    pub fn endpoint_url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &Value,
        device: Option<&DeviceFingerprint>,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.endpoint_url(path)?;

        let mut request = self.client.post(url).json(body);
        if let Some(device) = device {
            request = request.header(self.fingerprint_header.as_str(), device.as_str());
        }

        log::debug!("POST {path}");
        let response = request.send().await.map_err(|e| {
            log::error!("Request to {path} failed: {e}");
            TransportError::Request {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let raw = response.text().await.map_err(|e| TransportError::Body {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("POST {path} -> {status}");

        Ok(TransportResponse::new(status, TransportResponse::parse_body(&raw)))
    }
}
