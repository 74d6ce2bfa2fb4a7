// Host information provider for native clients
use std::path::Path;

use super::environment::{EnvironmentProvider, EnvironmentSnapshot, ScreenInfo};
use crate::settings::DeviceSettings;

/// Reads device attributes from the host OS
///
/// Values configured in [`DeviceSettings`] take precedence over what the host
/// reports, which is how headless hosts supply screen and touch attributes.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    overrides: DeviceSettings,
}

impl HostEnvironment {
    #[must_use]
    pub fn new(overrides: DeviceSettings) -> Self {
        Self { overrides }
    }

    fn timezone() -> Option<String> {
        if let Some(tz) = env_non_empty("TZ") {
            // POSIX allows a leading ':' before a zoneinfo name
            return Some(tz.trim_start_matches(':').to_string());
        }
        if let Ok(contents) = std::fs::read_to_string("/etc/timezone") {
            let tz = contents.trim();
            if !tz.is_empty() {
                return Some(tz.to_string());
            }
        }
        std::fs::read_link("/etc/localtime")
            .ok()
            .and_then(|target| zone_from_localtime_link(&target))
    }

    fn locale() -> Option<String> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .find_map(|var| env_non_empty(var))
            .and_then(|raw| normalize_posix_locale(&raw))
    }

    fn hardware_concurrency() -> Option<u32> {
        std::thread::available_parallelism()
            .ok()
            .and_then(|n| u32::try_from(n.get()).ok())
    }

    fn screen(&self) -> Option<ScreenInfo> {
        let device = &self.overrides;
        if device.screen_width.is_none()
            && device.screen_height.is_none()
            && device.color_depth.is_none()
        {
            return None;
        }
        Some(ScreenInfo::new(
            device.screen_width.unwrap_or(0),
            device.screen_height.unwrap_or(0),
            device.color_depth.unwrap_or(0),
        ))
    }
}

impl EnvironmentProvider for HostEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        let device = &self.overrides;
        let locale = device.locale.clone().or_else(Self::locale);
        let language = device
            .language
            .clone()
            .or_else(|| locale.as_deref().map(primary_language));

        EnvironmentSnapshot {
            screen: self.screen(),
            timezone: device.timezone.clone().or_else(Self::timezone),
            locale,
            language,
            hardware_concurrency: device
                .hardware_concurrency
                .or_else(Self::hardware_concurrency),
            platform: device
                .platform
                .clone()
                .or_else(|| Some(std::env::consts::OS.to_string())),
            max_touch_points: device.max_touch_points,
        }
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// `/usr/share/zoneinfo/Europe/Paris` -> `Europe/Paris`
fn zone_from_localtime_link(target: &Path) -> Option<String> {
    let target = target.to_string_lossy();
    target
        .split_once("zoneinfo/")
        .map(|(_, zone)| zone.to_string())
        .filter(|zone| !zone.is_empty())
}

/// `en_US.UTF-8@euro` -> `en-US`; `C` and `POSIX` carry no locale
fn normalize_posix_locale(raw: &str) -> Option<String> {
    let base = raw
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

fn primary_language(locale: &str) -> String {
    locale
        .split('-')
        .next()
        .unwrap_or(locale)
        .to_lowercase()
}
