//! Testing utilities for passbind
//!
//! Ceremonies talk to two outside parties, the verification service and the
//! platform authenticator. This module provides scripted stand-ins for both
//! plus ready-made options and credentials, so ceremony flows can be tested
//! without a network or a browser.
//!
//! - [`fixtures`] - Pre-built options, credentials and environments
//! - [`mock`] - [`MockTransport`](mock::MockTransport) and
//!   [`MockPlatform`](mock::MockPlatform)
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use passbind::ceremony::CeremonyClient;
//! use passbind::testing::{fixtures::TestFixtures, mock::{MockPlatform, MockTransport}};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.respond("/webauthn/register/start", 200, TestFixtures::registration_options());
//! let platform = Arc::new(MockPlatform::new());
//! platform.create_returns(Ok(Some(TestFixtures::registration_credential())));
//!
//! let client = CeremonyClient::new(
//!     transport,
//!     Arc::new(TestFixtures::environment()),
//!     TestFixtures::secure_context(),
//! )
//! .with_platform(platform);
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{MockPlatform, MockTransport, RecordedRequest};

/// Common test constants
pub mod constants {
    /// Default test email address
    pub const TEST_EMAIL: &str = "test@example.com";

    /// Default test password
    pub const TEST_PASSWORD: &str = "correct horse battery staple";

    /// Relying party id used by the fixture options
    pub const TEST_RP_ID: &str = "example.com";

    /// Credential id reported by the fixture credentials
    pub const TEST_CREDENTIAL_ID: &str = "cred1";

    /// Device hash returned by the fixture password login
    pub const TEST_DEVICE_ID_HASH: &str = "dev_7f3a9c";
}
