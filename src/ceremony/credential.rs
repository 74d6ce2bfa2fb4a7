//! Platform ceremony results and their wire encoding
//!
//! The platform hands back raw bytes; the finish endpoints expect the same
//! data with every binary field base64url encoded. A credential is encoded
//! only when every required field is present, so a half-filled result never
//! reaches the network.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec;
use crate::errors::CeremonyError;

/// Output of the credential-creation ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCredential {
    /// Credential id as reported by the platform (already URL-safe text)
    pub id: String,
    pub raw_id: Vec<u8>,
    pub attestation_object: Vec<u8>,
    pub client_data_json: Vec<u8>,
    /// `None` when the platform cannot report transports
    pub transports: Option<Vec<String>>,
    pub authenticator_attachment: Option<String>,
}

/// Output of the credential-retrieval ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionCredential {
    /// Credential id as reported by the platform (already URL-safe text)
    pub id: String,
    pub raw_id: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
    pub authenticator_attachment: Option<String>,
}

/// Encoded attestation, the `attestationResponse` of the register-finish body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponseJson {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub response: AttestationPayload,
    #[serde(default)]
    pub client_extension_results: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default)]
    pub transports: Vec<String>,
}

/// Encoded assertion, the `assertionResponse` of the login-finish body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponseJson {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub response: AssertionPayload,
    #[serde(default)]
    pub client_extension_results: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPayload {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    pub user_handle: Option<String>,
}

fn require_bytes(bytes: &[u8], field: &'static str) -> Result<String, CeremonyError> {
    if bytes.is_empty() {
        return Err(CeremonyError::IncompleteCredential(field));
    }
    Ok(codec::encode(bytes))
}

fn require_id(id: &str) -> Result<String, CeremonyError> {
    if id.trim().is_empty() {
        return Err(CeremonyError::IncompleteCredential("id"));
    }
    Ok(id.to_string())
}

impl AttestationResponseJson {
    /// Encode a creation result for the register-finish endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the id, raw id, attestation object or client data
    /// is empty
    pub fn from_credential(credential: &RegistrationCredential) -> Result<Self, CeremonyError> {
        Ok(Self {
            id: require_id(&credential.id)?,
            raw_id: require_bytes(&credential.raw_id, "rawId")?,
            credential_type: "public-key".to_string(),
            response: AttestationPayload {
                client_data_json: require_bytes(&credential.client_data_json, "clientDataJSON")?,
                attestation_object: require_bytes(
                    &credential.attestation_object,
                    "attestationObject",
                )?,
                transports: credential.transports.clone().unwrap_or_default(),
            },
            client_extension_results: Map::new(),
            authenticator_attachment: credential.authenticator_attachment.clone(),
        })
    }
}

impl AssertionResponseJson {
    /// Encode a retrieval result for the login-finish endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the id, raw id, authenticator data, client data or
    /// signature is empty
    pub fn from_credential(credential: &AssertionCredential) -> Result<Self, CeremonyError> {
        Ok(Self {
            id: require_id(&credential.id)?,
            raw_id: require_bytes(&credential.raw_id, "rawId")?,
            credential_type: "public-key".to_string(),
            response: AssertionPayload {
                client_data_json: require_bytes(&credential.client_data_json, "clientDataJSON")?,
                authenticator_data: require_bytes(
                    &credential.authenticator_data,
                    "authenticatorData",
                )?,
                signature: require_bytes(&credential.signature, "signature")?,
                user_handle: credential
                    .user_handle
                    .as_deref()
                    .filter(|handle| !handle.is_empty())
                    .map(codec::encode),
            },
            client_extension_results: Map::new(),
            authenticator_attachment: credential.authenticator_attachment.clone(),
        })
    }
}
