//! Ceremony orchestration
//!
//! Each public operation is one invocation: preconditions, options request,
//! platform call, finish request. Every step is logged with the invocation
//! id and every failure is classified before it is returned.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{json, Value};

use super::credential::{AssertionResponseJson, AttestationResponseJson};
use super::options::{RawCreationOptions, RawRequestOptions};
use super::platform::{ExecutionContext, PlatformAuthenticator};
use super::session::SessionStore;
use super::state::{Ceremony, CeremonyKind, CeremonyOutcome, CeremonyState, Verdict};
use crate::errors::CeremonyError;
use crate::fingerprint::{self, DeviceFingerprint, EnvironmentProvider, HostEnvironment};
use crate::settings::{EndpointSettings, PassbindSettings};
use crate::transport::{HttpTransport, Transport, TransportResponse};

// What a ceremony body hands back to `conclude` when it reached the finish endpoint
type FinishResult = Result<(Verdict, Option<String>), CeremonyError>;

/// Drives registration, authentication and password ceremonies against the
/// verification service
///
/// Every call is one independent invocation with its own [`Ceremony`] state
/// machine. Nothing is retried: a failed invocation ends `rejected` and the
/// caller starts over.
pub struct CeremonyClient {
    transport: Arc<dyn Transport>,
    platform: Option<Arc<dyn PlatformAuthenticator>>,
    environment: Arc<dyn EnvironmentProvider>,
    context: ExecutionContext,
    endpoints: EndpointSettings,
    session: SessionStore,
    last_ceremony: Arc<RwLock<Option<Ceremony>>>,
}

impl CeremonyClient {
    /// Client without a platform authenticator; WebAuthn ceremonies fail with
    /// `unsupported-platform` until one is attached with [`Self::with_platform`]
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        environment: Arc<dyn EnvironmentProvider>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            transport,
            platform: None,
            environment,
            context,
            endpoints: EndpointSettings::default(),
            session: SessionStore::new(),
            last_ceremony: Arc::new(RwLock::new(None)),
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Arc<dyn PlatformAuthenticator>) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EndpointSettings) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Client wired to the configured service over HTTP, fingerprinting the host
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The service base URL is invalid
    /// - The configured client origin is not a URL
    /// - The HTTP client cannot be built
    pub fn from_settings(settings: &PassbindSettings) -> Result<Self, CeremonyError> {
        let transport = HttpTransport::new(&settings.service)?;
        let context = ExecutionContext::from_origin(&settings.client.origin).map_err(|e| {
            CeremonyError::InvalidConfiguration {
                setting: "client.origin",
                reason: format!("{}: {e}", settings.client.origin),
            }
        })?;
        let environment = HostEnvironment::new(settings.device.clone());

        Ok(Self::new(Arc::new(transport), Arc::new(environment), context)
            .with_endpoints(settings.endpoints.clone()))
    }

    /// Session-only store holding the password-login device hash
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Fingerprint of the current environment
    #[must_use]
    pub fn device_fingerprint(&self) -> DeviceFingerprint {
        fingerprint::derive(self.environment.as_ref())
    }

    /// The most recently concluded invocation, success or failure
    #[must_use]
    pub fn last_ceremony(&self) -> Option<Ceremony> {
        self.last_ceremony
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a passkey for `email`, bound to this device's fingerprint
    ///
    /// # Errors
    ///
    /// See [`Self::register_with_identity`]
    pub async fn register(&self, email: &str) -> Result<CeremonyOutcome, CeremonyError> {
        let identity = self.device_fingerprint();
        self.register_with_identity(email, &identity).await
    }

    /// Register a passkey for `email`, bound to `identity`
    ///
    /// Returns an outcome once the finish endpoint answered with a success
    /// status; a `"verified": false` acknowledgment yields a not-verified,
    /// rejected outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `email` is empty, no platform authenticator is attached or the
    ///   context is not secure (no network call is made)
    /// - The service rejects either request
    /// - The creation options are missing a required field or fail to decode
    /// - The platform rejects or returns no credential
    pub async fn register_with_identity(
        &self,
        email: &str,
        identity: &DeviceFingerprint,
    ) -> Result<CeremonyOutcome, CeremonyError> {
        let mut ceremony = Ceremony::start(CeremonyKind::Registration);
        log::info!(
            "[{}] Starting registration with device {}",
            ceremony.id(),
            identity
        );
        let result = self.run_registration(&mut ceremony, email, identity).await;
        self.conclude(ceremony, result)
    }

    /// Authenticate `email` with a passkey from this device
    ///
    /// # Errors
    ///
    /// See [`Self::login_with_identity`]
    pub async fn login(&self, email: &str) -> Result<CeremonyOutcome, CeremonyError> {
        let identity = self.device_fingerprint();
        self.login_with_identity(email, &identity).await
    }

    /// Authenticate `email`, reporting `identity` as the device
    ///
    /// The finish response's `verified` flag decides the verdict; anything but
    /// `true` is not verified.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `email` is empty, no platform authenticator is attached or the
    ///   context is not secure (no network call is made)
    /// - The service rejects either request
    /// - The request options are missing the challenge or fail to decode
    /// - The platform rejects or returns no assertion
    pub async fn login_with_identity(
        &self,
        email: &str,
        identity: &DeviceFingerprint,
    ) -> Result<CeremonyOutcome, CeremonyError> {
        let mut ceremony = Ceremony::start(CeremonyKind::Authentication);
        log::info!(
            "[{}] Starting authentication with device {}",
            ceremony.id(),
            identity
        );
        let result = self.run_authentication(&mut ceremony, email, identity).await;
        self.conclude(ceremony, result)
    }

    /// Forward email and password to the login endpoint with the device header
    ///
    /// On success the returned `deviceIdHash` is kept in [`Self::session`] and
    /// echoed on the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if either credential is empty or the service rejects
    /// the login
    pub async fn password_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CeremonyOutcome, CeremonyError> {
        let mut ceremony = Ceremony::start(CeremonyKind::PasswordLogin);
        let result = self.run_password_login(&mut ceremony, email, password).await;
        self.conclude(ceremony, result)
    }

    /// Create a password account; sent without the device header
    ///
    /// # Errors
    ///
    /// Returns an error if either credential is empty or the service rejects
    /// the registration
    pub async fn password_register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CeremonyOutcome, CeremonyError> {
        let mut ceremony = Ceremony::start(CeremonyKind::PasswordRegistration);
        let result = self.run_password_register(&mut ceremony, email, password).await;
        self.conclude(ceremony, result)
    }

    async fn run_registration(
        &self,
        ceremony: &mut Ceremony,
        email: &str,
        identity: &DeviceFingerprint,
    ) -> FinishResult {
        let platform = self.check_preconditions(email)?;

        ceremony.advance(CeremonyState::AwaitingOptions);
        let response = self
            .post(
                &self.endpoints.register_start,
                &json!({ "email": email }),
                Some(identity),
            )
            .await?;
        let options = RawCreationOptions::from_body(response.body)?.validate(email)?;
        ceremony.advance(CeremonyState::OptionsValidated);
        log::debug!(
            "[{}] Creation options for rp {} ({} excluded credentials)",
            ceremony.id(),
            options.rp.id,
            options.exclude_credentials.len()
        );

        ceremony.advance(CeremonyState::AwaitingPlatformCeremony);
        let credential = platform
            .create_credential(&options)
            .await?
            .ok_or(CeremonyError::EmptyCredential)?;
        let attestation = AttestationResponseJson::from_credential(&credential)?;

        ceremony.advance(CeremonyState::AwaitingFinish);
        let body = json!({
            "email": email,
            "attestationResponse": attestation,
            "fpVisitorId": identity.as_str(),
        });
        let response = self
            .post(&self.endpoints.register_finish, &body, Some(identity))
            .await?;

        // The acknowledgment is opaque unless it explicitly says "verified": false
        let verdict = match verified_flag(&response.body) {
            Some(false) => Verdict::NotVerified,
            _ => Verdict::Verified,
        };
        Ok((verdict, None))
    }

    async fn run_authentication(
        &self,
        ceremony: &mut Ceremony,
        email: &str,
        identity: &DeviceFingerprint,
    ) -> FinishResult {
        let platform = self.check_preconditions(email)?;

        ceremony.advance(CeremonyState::AwaitingOptions);
        let response = self
            .post(
                &self.endpoints.login_start,
                &json!({ "email": email }),
                Some(identity),
            )
            .await?;
        let options = RawRequestOptions::from_body(response.body)?.validate()?;
        ceremony.advance(CeremonyState::OptionsValidated);
        log::debug!(
            "[{}] Request options with {} allowed credentials",
            ceremony.id(),
            options.allow_credentials.len()
        );

        ceremony.advance(CeremonyState::AwaitingPlatformCeremony);
        let credential = platform
            .get_assertion(&options)
            .await?
            .ok_or(CeremonyError::EmptyCredential)?;
        let assertion = AssertionResponseJson::from_credential(&credential)?;

        ceremony.advance(CeremonyState::AwaitingFinish);
        let body = json!({
            "email": email,
            "assertionResponse": assertion,
            "fpVisitorId": identity.as_str(),
        });
        let response = self
            .post(&self.endpoints.login_finish, &body, Some(identity))
            .await?;

        let verdict = if verified_flag(&response.body) == Some(true) {
            Verdict::Verified
        } else {
            Verdict::NotVerified
        };
        Ok((verdict, None))
    }

    async fn run_password_login(
        &self,
        ceremony: &mut Ceremony,
        email: &str,
        password: &str,
    ) -> FinishResult {
        check_credentials(email, password)?;
        let identity = self.device_fingerprint();

        ceremony.advance(CeremonyState::AwaitingFinish);
        let body = json!({ "email": email, "password": password });
        let response = self
            .post(&self.endpoints.password_login, &body, Some(&identity))
            .await?;

        let device_id_hash = response
            .body
            .get("deviceIdHash")
            .and_then(Value::as_str)
            .filter(|hash| !hash.is_empty())
            .map(str::to_string);
        match &device_id_hash {
            Some(hash) => self.session.store(email, hash),
            None => log::debug!("[{}] Login response carried no device hash", ceremony.id()),
        }
        Ok((Verdict::Verified, device_id_hash))
    }

    async fn run_password_register(
        &self,
        ceremony: &mut Ceremony,
        email: &str,
        password: &str,
    ) -> FinishResult {
        check_credentials(email, password)?;

        ceremony.advance(CeremonyState::AwaitingFinish);
        let body = json!({ "email": email, "password": password });
        self.post(&self.endpoints.password_register, &body, None)
            .await?;
        Ok((Verdict::Verified, None))
    }

    /// Email, then platform availability, then secure context
    fn check_preconditions(
        &self,
        email: &str,
    ) -> Result<&dyn PlatformAuthenticator, CeremonyError> {
        if email.trim().is_empty() {
            return Err(CeremonyError::MissingEmail);
        }
        let platform = self
            .platform
            .as_deref()
            .ok_or(CeremonyError::UnsupportedPlatform)?;
        if !self.context.is_secure() {
            return Err(CeremonyError::InsecureContext {
                protocol: self.context.protocol.clone(),
                hostname: self.context.hostname.clone(),
            });
        }
        Ok(platform)
    }

    async fn post(
        &self,
        path: &str,
        body: &Value,
        device: Option<&DeviceFingerprint>,
    ) -> Result<TransportResponse, CeremonyError> {
        let response = self.transport.post_json(path, body, device).await?;
        if !response.is_success() {
            return Err(CeremonyError::ServerRejected {
                status: response.status,
                message: response.error_message().unwrap_or_default(),
            });
        }
        Ok(response)
    }

    fn conclude(
        &self,
        mut ceremony: Ceremony,
        result: FinishResult,
    ) -> Result<CeremonyOutcome, CeremonyError> {
        let outcome = match result {
            Ok((verdict, device_id_hash)) => {
                if verdict == Verdict::Verified {
                    ceremony.advance(CeremonyState::Succeeded);
                    log::info!("[{}] {} ceremony succeeded", ceremony.id(), ceremony.kind());
                } else {
                    ceremony.reject();
                    log::warn!("[{}] {} was not verified", ceremony.id(), ceremony.kind());
                }
                Ok(CeremonyOutcome {
                    id: ceremony.id(),
                    kind: ceremony.kind(),
                    verdict,
                    state: ceremony.state(),
                    device_id_hash,
                })
            }
            Err(err) => {
                ceremony.reject();
                let classified = err.classify();
                log::warn!(
                    "[{}] {} ceremony failed: {} ({})",
                    ceremony.id(),
                    ceremony.kind(),
                    classified,
                    err
                );
                Err(err)
            }
        };
        *self
            .last_ceremony
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(ceremony);
        outcome
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), CeremonyError> {
    if email.trim().is_empty() {
        return Err(CeremonyError::MissingEmail);
    }
    if password.is_empty() {
        return Err(CeremonyError::MissingPassword);
    }
    Ok(())
}

fn verified_flag(body: &Value) -> Option<bool> {
    body.get("verified").and_then(Value::as_bool)
}
