//! Device-bound WebAuthn ceremonies
//!
//! [`CeremonyClient`] runs registration and authentication end to end:
//! fetch options from the verification service with the device fingerprint
//! attached, validate and decode them, hand them to the
//! [`PlatformAuthenticator`], encode the result and submit it to the finish
//! endpoint. The password ceremonies skip the platform entirely.

mod client;
mod credential;
mod options;
mod platform;
mod session;
mod state;

pub use client::CeremonyClient;
pub use credential::{
    AssertionCredential, AssertionPayload, AssertionResponseJson, AttestationPayload,
    AttestationResponseJson, RegistrationCredential,
};
pub use options::{
    AuthenticatorSelection, CredentialCreationOptions, CredentialDescriptor, CredentialParameter,
    CredentialRequestOptions, RawCreationOptions, RawCredentialDescriptor, RawRelyingParty,
    RawRequestOptions, RawUserEntity, RelyingParty, UserEntity,
};
pub use platform::{ExecutionContext, PlatformAuthenticator};
pub use session::{SessionDevice, SessionStore};
pub use state::{Ceremony, CeremonyKind, CeremonyOutcome, CeremonyState, Verdict};
