//! Scripted stand-ins for the verification service and the platform

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ceremony::{
    AssertionCredential, CredentialCreationOptions, CredentialRequestOptions,
    PlatformAuthenticator, RegistrationCredential,
};
use crate::errors::PlatformError;
use crate::fingerprint::DeviceFingerprint;
use crate::transport::{Transport, TransportError, TransportResponse};

/// A request seen by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
    /// Fingerprint header value, if one was attached
    pub device: Option<String>,
}

/// In-memory verification service
///
/// Answers each path with the scripted response or error; unscripted paths
/// answer `404`. Every request is recorded, including failed ones.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with `status` and `body`
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), Ok(TransportResponse::new(status, body)));
    }

    /// Fail requests to `path` before any response is read
    pub fn fail(&self, path: &str, error: TransportError) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), Err(error));
    }

    /// All requests in the order they were made
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent request to `path`
    #[must_use]
    pub fn last_request(&self, path: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.path == path)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &Value,
        device: Option<&DeviceFingerprint>,
    ) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                path: path.to_string(),
                body: body.clone(),
                device: device.map(|fingerprint| fingerprint.as_str().to_string()),
            });

        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .unwrap_or_else(|| {
                Ok(TransportResponse::new(
                    404,
                    json!({ "error": format!("no route for {path}") }),
                ))
            })
    }
}

type CreateResult = Result<Option<RegistrationCredential>, PlatformError>;
type GetResult = Result<Option<AssertionCredential>, PlatformError>;

/// Scripted platform authenticator
///
/// Unscripted calls fail with `NotAllowedError`, the way a dismissed prompt
/// does. A scripted credential whose raw id is on the exclusion list fails
/// with `InvalidStateError`.
#[derive(Debug, Default)]
pub struct MockPlatform {
    create_result: Mutex<Option<CreateResult>>,
    get_result: Mutex<Option<GetResult>>,
    creation_options: Mutex<Vec<CredentialCreationOptions>>,
    request_options: Mutex<Vec<CredentialRequestOptions>>,
}

impl MockPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_returns(&self, result: CreateResult) {
        *self
            .create_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(result);
    }

    pub fn get_returns(&self, result: GetResult) {
        *self
            .get_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(result);
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.creation_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.request_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Options passed to the latest `create_credential`
    #[must_use]
    pub fn last_creation_options(&self) -> Option<CredentialCreationOptions> {
        self.creation_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Options passed to the latest `get_assertion`
    #[must_use]
    pub fn last_request_options(&self) -> Option<CredentialRequestOptions> {
        self.request_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn dismissed() -> PlatformError {
        PlatformError::new(
            "NotAllowedError",
            "The operation either timed out or was not allowed.",
        )
    }
}

// A platform refuses to create a credential already on the exclusion list
fn is_excluded(options: &CredentialCreationOptions, raw_id: &[u8]) -> bool {
    options
        .exclude_credentials
        .iter()
        .any(|descriptor| descriptor.id == raw_id)
}

#[async_trait]
impl PlatformAuthenticator for MockPlatform {
    async fn create_credential(
        &self,
        options: &CredentialCreationOptions,
    ) -> Result<Option<RegistrationCredential>, PlatformError> {
        self.creation_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options.clone());

        let result = self
            .create_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| Err(Self::dismissed()))?;
        if let Some(credential) = &result {
            if is_excluded(options, &credential.raw_id) {
                return Err(PlatformError::new(
                    "InvalidStateError",
                    "The user attempted to register an authenticator that contains one of the credentials already registered with the relying party.",
                ));
            }
        }
        Ok(result)
    }

    async fn get_assertion(
        &self,
        options: &CredentialRequestOptions,
    ) -> Result<Option<AssertionCredential>, PlatformError> {
        self.request_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options.clone());

        self.get_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| Err(Self::dismissed()))
    }
}
