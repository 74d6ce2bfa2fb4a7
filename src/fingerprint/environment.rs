//! Environment attribute snapshot consumed by the fingerprint deriver

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_PLATFORM: &str = "unknown";

/// Physical display characteristics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    /// Color (pixel) depth in bits
    pub color_depth: u32,
}

impl ScreenInfo {
    #[must_use]
    pub fn new(width: u32, height: u32, color_depth: u32) -> Self {
        Self {
            width,
            height,
            color_depth,
        }
    }

    /// Floor a dimension to the nearest hundred pixels
    #[must_use]
    pub const fn bucket(dimension: u32) -> u32 {
        dimension / 100 * 100
    }

    /// `"{width}x{height}x{depth}"` with width and height bucketed
    ///
    /// Bucketing absorbs window chrome and zoom differences between browsers
    /// running on the same display.
    #[must_use]
    pub fn descriptor(&self) -> String {
        format!(
            "{}x{}x{}",
            Self::bucket(self.width),
            Self::bucket(self.height),
            self.color_depth
        )
    }
}

/// Snapshot of the host attributes that identify a physical device
///
/// Every field is optional; an attribute the host cannot report is replaced
/// by its documented default when the fingerprint is derived. Nothing here
/// identifies the browser or user agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub screen: Option<ScreenInfo>,
    pub timezone: Option<String>,
    pub locale: Option<String>,
    pub language: Option<String>,
    pub hardware_concurrency: Option<u32>,
    pub platform: Option<String>,
    pub max_touch_points: Option<u32>,
}

impl EnvironmentSnapshot {
    /// Attribute vector in hashing order, defaults applied
    ///
    /// The order is part of the fingerprint format: screen, timezone, locale,
    /// language, core count, lowercase platform, touch points.
    #[must_use]
    pub fn attribute_vector(&self) -> [String; 7] {
        [
            self.screen.unwrap_or_default().descriptor(),
            non_empty_or(self.timezone.as_deref(), DEFAULT_TIMEZONE),
            non_empty_or(self.locale.as_deref(), DEFAULT_LOCALE),
            non_empty_or(self.language.as_deref(), DEFAULT_LANGUAGE),
            self.hardware_concurrency.unwrap_or(0).to_string(),
            non_empty_or(self.platform.as_deref(), DEFAULT_PLATFORM).to_lowercase(),
            self.max_touch_points.unwrap_or(0).to_string(),
        ]
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Source of environment snapshots
///
/// Implementations read process-wide host state and must not fail: anything
/// unavailable is left as `None`.
pub trait EnvironmentProvider: Send + Sync {
    fn snapshot(&self) -> EnvironmentSnapshot;
}

/// Provider returning a fixed snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment(pub EnvironmentSnapshot);

impl EnvironmentProvider for StaticEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        self.0.clone()
    }
}
