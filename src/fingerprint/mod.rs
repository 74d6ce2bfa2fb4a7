//! Device identity derivation
//!
//! Produces a stable token for the physical device a ceremony runs on. The
//! token is built only from hardware and OS level attributes (display,
//! timezone, locale, core count, platform, touch support) so two different
//! browsers on the same machine converge on the same value. It is a coarse
//! equivalence key, not a secret, and collisions are tolerated.

mod environment;
mod host;

pub use environment::{
    EnvironmentProvider, EnvironmentSnapshot, ScreenInfo, StaticEnvironment, DEFAULT_LANGUAGE,
    DEFAULT_LOCALE, DEFAULT_PLATFORM, DEFAULT_TIMEZONE,
};
pub use host::HostEnvironment;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal tag prefixed to every fingerprint token
pub const FINGERPRINT_TAG: &str = "fp_";

/// Separator placed between attributes before hashing
pub const ATTRIBUTE_DELIMITER: &str = "|";

/// Token identifying the physical device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rolling `hash * 31 + code` over UTF-16 code units, wrapped to 32 bits
#[must_use]
pub fn rolling_hash(input: &str) -> i32 {
    input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Derive the fingerprint for a snapshot
///
/// Pure function of the snapshot: identical attributes always give an
/// identical token.
#[must_use]
pub fn derive_fingerprint(snapshot: &EnvironmentSnapshot) -> DeviceFingerprint {
    let joined = snapshot.attribute_vector().join(ATTRIBUTE_DELIMITER);
    // Absolute value taken in 64 bits so i32::MIN does not overflow
    let magnitude = i64::from(rolling_hash(&joined)).unsigned_abs();
    DeviceFingerprint(format!("{FINGERPRINT_TAG}{magnitude:x}"))
}

/// Snapshot the environment through `provider` and derive its fingerprint
#[must_use]
pub fn derive(provider: &dyn EnvironmentProvider) -> DeviceFingerprint {
    derive_fingerprint(&provider.snapshot())
}
