//! Test fixtures providing pre-built ceremony data

use serde_json::{json, Value};

use super::constants::{TEST_CREDENTIAL_ID, TEST_DEVICE_ID_HASH, TEST_EMAIL, TEST_RP_ID};
use crate::ceremony::{AssertionCredential, ExecutionContext, RegistrationCredential};
use crate::codec;
use crate::fingerprint::{EnvironmentSnapshot, ScreenInfo, StaticEnvironment};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Challenge bytes carried by both fixture option sets
    pub const CHALLENGE: &'static [u8] = b"server-issued-challenge";

    /// User handle carried by the fixture creation options
    pub const USER_HANDLE: &'static [u8] = b"user-7";

    /// Credential id already registered for the fixture user
    pub const EXCLUDED_CREDENTIAL: &'static [u8] = b"existing-credential";

    /// Register-start response body
    #[must_use]
    pub fn registration_options() -> Value {
        json!({
            "challenge": codec::encode(Self::CHALLENGE),
            "rp": { "id": TEST_RP_ID, "name": "Example" },
            "user": {
                "id": codec::encode(Self::USER_HANDLE),
                "name": TEST_EMAIL,
                "displayName": "Test User"
            },
            "pubKeyCredParams": [
                { "type": "public-key", "alg": -7 },
                { "type": "public-key", "alg": -257 }
            ],
            "timeout": 60000,
            "attestation": "none",
            "authenticatorSelection": {
                "authenticatorAttachment": "platform",
                "residentKey": "preferred",
                "userVerification": "preferred"
            },
            "excludeCredentials": [
                {
                    "type": "public-key",
                    "id": codec::encode(Self::EXCLUDED_CREDENTIAL),
                    "transports": ["internal"]
                }
            ]
        })
    }

    /// Login-start response body
    #[must_use]
    pub fn authentication_options() -> Value {
        json!({
            "challenge": codec::encode(Self::CHALLENGE),
            "rpId": TEST_RP_ID,
            "timeout": 60000,
            "userVerification": "preferred",
            "allowCredentials": [
                {
                    "type": "public-key",
                    "id": codec::encode(TEST_CREDENTIAL_ID.as_bytes()),
                    "transports": ["internal", "hybrid"]
                }
            ]
        })
    }

    /// Password login response body
    #[must_use]
    pub fn password_login_response() -> Value {
        json!({ "message": "Logged in", "deviceIdHash": TEST_DEVICE_ID_HASH })
    }

    /// Credential the platform creates: attestation `[1, 2]`, client data `[3]`
    #[must_use]
    pub fn registration_credential() -> RegistrationCredential {
        RegistrationCredential {
            id: TEST_CREDENTIAL_ID.to_string(),
            raw_id: TEST_CREDENTIAL_ID.as_bytes().to_vec(),
            attestation_object: vec![0x01, 0x02],
            client_data_json: vec![0x03],
            transports: Some(vec!["internal".to_string()]),
            authenticator_attachment: Some("platform".to_string()),
        }
    }

    /// Assertion the platform returns for the fixture credential
    #[must_use]
    pub fn assertion_credential() -> AssertionCredential {
        AssertionCredential {
            id: TEST_CREDENTIAL_ID.to_string(),
            raw_id: TEST_CREDENTIAL_ID.as_bytes().to_vec(),
            authenticator_data: vec![0x49; 37],
            client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
            signature: vec![0x30, 0x44, 0x02, 0x20],
            user_handle: Some(Self::USER_HANDLE.to_vec()),
            authenticator_attachment: Some("platform".to_string()),
        }
    }

    /// A fully populated desktop snapshot
    #[must_use]
    pub fn snapshot() -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            screen: Some(ScreenInfo::new(1920, 1080, 24)),
            timezone: Some("America/New_York".to_string()),
            locale: Some("en-US".to_string()),
            language: Some("en".to_string()),
            hardware_concurrency: Some(8),
            platform: Some("Linux".to_string()),
            max_touch_points: Some(0),
        }
    }

    /// Provider returning [`Self::snapshot`]
    #[must_use]
    pub fn environment() -> StaticEnvironment {
        StaticEnvironment(Self::snapshot())
    }

    #[must_use]
    pub fn secure_context() -> ExecutionContext {
        ExecutionContext::new("https:", TEST_RP_ID)
    }

    #[must_use]
    pub fn insecure_context() -> ExecutionContext {
        ExecutionContext::new("http:", TEST_RP_ID)
    }
}
