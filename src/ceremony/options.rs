//! Server-issued ceremony options
//!
//! Options arrive as loosely typed JSON with every binary field base64url
//! encoded. They are parsed into `Raw*` records where everything is optional,
//! then validated and decoded at the boundary into the strict
//! [`CredentialCreationOptions`] / [`CredentialRequestOptions`] handed to the
//! platform. Nothing optional or undecoded travels further in.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::codec;
use crate::errors::CeremonyError;

const PUBLIC_KEY_TYPE: &str = "public-key";

fn public_key_type() -> String {
    PUBLIC_KEY_TYPE.to_string()
}

/// Accept both bare options and `{"publicKey": {...}}` envelopes
fn unwrap_public_key(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("publicKey").is_some_and(Value::is_object) => {
            map.remove("publicKey").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn parse_options<T: for<'de> Deserialize<'de> + Default>(body: Value) -> Result<T, CeremonyError> {
    match unwrap_public_key(body) {
        // An empty answer is reported as missing fields, not as a type error
        Value::Null => Ok(T::default()),
        value => serde_json::from_value(value)
            .map_err(|e| CeremonyError::InvalidOptions(e.to_string())),
    }
}

// Servers send `null` for an empty list as often as they omit it
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn require_text(value: Option<String>, field: &'static str) -> Result<String, CeremonyError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(CeremonyError::MissingField(field))
}

fn decode_field(field: &str, text: &str) -> Result<Vec<u8>, CeremonyError> {
    codec::decode(text).map_err(|source| CeremonyError::MalformedField {
        field: field.to_string(),
        source,
    })
}

/// Relying party as sent by the server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelyingParty {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// User entity as sent by the server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserEntity {
    pub id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
}

/// Credential descriptor as sent by the server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCredentialDescriptor {
    #[serde(rename = "type", default = "public_key_type")]
    pub credential_type: String,
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transports: Vec<String>,
}

impl RawCredentialDescriptor {
    fn decode(self, list: &'static str) -> Result<CredentialDescriptor, CeremonyError> {
        let id = require_text(self.id, list)?;
        Ok(CredentialDescriptor {
            credential_type: self.credential_type,
            id: decode_field(list, &id)?,
            transports: self.transports,
        })
    }
}

/// Registration options as sent by the server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCreationOptions {
    pub challenge: Option<String>,
    pub rp: Option<RawRelyingParty>,
    pub user: Option<RawUserEntity>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pub_key_cred_params: Vec<CredentialParameter>,
    pub timeout: Option<u64>,
    pub attestation: Option<String>,
    pub authenticator_selection: Option<AuthenticatorSelection>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub exclude_credentials: Vec<RawCredentialDescriptor>,
    pub extensions: Option<Value>,
}

/// Authentication options as sent by the server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequestOptions {
    pub challenge: Option<String>,
    pub rp_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allow_credentials: Vec<RawCredentialDescriptor>,
    pub timeout: Option<u64>,
    pub user_verification: Option<String>,
    pub extensions: Option<Value>,
}

/// Accepted public key algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParameter {
    #[serde(rename = "type", default = "public_key_type")]
    pub credential_type: String,
    pub alg: i64,
}

/// Authenticator requirements for registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub authenticator_attachment: Option<String>,
    pub resident_key: Option<String>,
    pub require_resident_key: Option<bool>,
    pub user_verification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    /// Decoded user handle
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    pub credential_type: String,
    /// Decoded credential id
    pub id: Vec<u8>,
    pub transports: Vec<String>,
}

/// Validated, decoded options for the credential-creation ceremony
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialCreationOptions {
    pub challenge: Vec<u8>,
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<CredentialParameter>,
    /// Milliseconds, passed through to the platform untouched
    pub timeout: Option<u64>,
    pub attestation: Option<String>,
    pub authenticator_selection: Option<AuthenticatorSelection>,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub extensions: Option<Value>,
}

/// Validated, decoded options for the credential-retrieval ceremony
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRequestOptions {
    pub challenge: Vec<u8>,
    pub rp_id: Option<String>,
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// Milliseconds, passed through to the platform untouched
    pub timeout: Option<u64>,
    pub user_verification: Option<String>,
    pub extensions: Option<Value>,
}

impl RawCreationOptions {
    /// Parse a register-start response body
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not have the shape of creation options
    pub fn from_body(body: Value) -> Result<Self, CeremonyError> {
        parse_options(body)
    }

    /// Check required fields, then decode every binary field
    ///
    /// `email` stands in for a missing `user.name` or `user.displayName`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `challenge`, `rp.id` or `user.id` is missing or blank
    /// - An exclusion-list entry has no id
    /// - Any binary field is not valid base64url
    pub fn validate(self, email: &str) -> Result<CredentialCreationOptions, CeremonyError> {
        let challenge = require_text(self.challenge, "challenge")?;
        let rp = self.rp.unwrap_or_default();
        let rp_id = require_text(rp.id, "rp.id")?;
        let user = self.user.unwrap_or_default();
        let user_id = require_text(user.id, "user.id")?;

        let challenge = decode_field("challenge", &challenge)?;
        let user_handle = decode_field("user.id", &user_id)?;
        let exclude_credentials = self
            .exclude_credentials
            .into_iter()
            .map(|descriptor| descriptor.decode("excludeCredentials.id"))
            .collect::<Result<Vec<_>, _>>()?;

        let name = user.name.unwrap_or_else(|| email.to_string());
        let display_name = user.display_name.unwrap_or_else(|| name.clone());

        Ok(CredentialCreationOptions {
            challenge,
            rp: RelyingParty {
                name: rp.name.unwrap_or_else(|| rp_id.clone()),
                id: rp_id,
            },
            user: UserEntity {
                id: user_handle,
                name,
                display_name,
            },
            pub_key_cred_params: self.pub_key_cred_params,
            timeout: self.timeout,
            attestation: self.attestation,
            authenticator_selection: self.authenticator_selection,
            exclude_credentials,
            extensions: self.extensions,
        })
    }
}

impl RawRequestOptions {
    /// Parse a login-start response body
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not have the shape of request options
    pub fn from_body(body: Value) -> Result<Self, CeremonyError> {
        parse_options(body)
    }

    /// Check the challenge, then decode it and the allow-list
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `challenge` is missing or blank
    /// - An allow-list entry has no id
    /// - Any binary field is not valid base64url
    pub fn validate(self) -> Result<CredentialRequestOptions, CeremonyError> {
        let challenge = require_text(self.challenge, "challenge")?;
        let challenge = decode_field("challenge", &challenge)?;
        let allow_credentials = self
            .allow_credentials
            .into_iter()
            .map(|descriptor| descriptor.decode("allowCredentials.id"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CredentialRequestOptions {
            challenge,
            rp_id: self.rp_id.filter(|id| !id.trim().is_empty()),
            allow_credentials,
            timeout: self.timeout,
            user_verification: self.user_verification,
            extensions: self.extensions,
        })
    }
}
