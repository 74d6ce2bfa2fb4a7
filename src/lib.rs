#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passbind library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ceremony;
pub mod codec;
pub mod errors;
pub mod fingerprint;
pub mod settings;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use ceremony::{CeremonyClient, CeremonyOutcome, CeremonyState, ExecutionContext};
pub use errors::{CeremonyError, ClassifiedError, ErrorCategory, ErrorKind, PlatformError};
pub use fingerprint::{derive_fingerprint, DeviceFingerprint, EnvironmentSnapshot};
pub use settings::PassbindSettings;
pub use transport::{HttpTransport, Transport};
