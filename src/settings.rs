//! Configuration layer
//!
//! Defaults, then `./Settings.toml`, then `$PASSBIND_SECRETS_DIR/Settings.toml`,
//! then `PASSBIND_*` environment variables. Loading also installs the logger.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PassbindSettings {
    pub service: ServiceSettings,
    pub endpoints: EndpointSettings,
    pub client: ClientSettings,
    pub device: DeviceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Base URL of the verification service
    pub base_url: String,
    /// Header carrying the device fingerprint
    pub fingerprint_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub register_start: String,
    pub register_finish: String,
    pub login_start: String,
    pub login_finish: String,
    pub password_login: String,
    pub password_register: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Origin the client runs as; its scheme and host decide whether the
    /// context is secure
    pub origin: String,
}

/// Fingerprint attribute overrides
///
/// Anything left unset is read from the host, or defaulted when the host
/// cannot report it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceSettings {
    pub timezone: Option<String>,
    pub locale: Option<String>,
    pub language: Option<String>,
    pub platform: Option<String>,
    pub hardware_concurrency: Option<u32>,
    pub max_touch_points: Option<u32>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub color_depth: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            fingerprint_header: "x-fp-visitor-id".to_string(),
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            register_start: "/webauthn/register/start".to_string(),
            register_finish: "/webauthn/register/finish".to_string(),
            login_start: "/webauthn/login/start".to_string(),
            login_finish: "/webauthn/login/finish".to_string(),
            password_login: "/auth/login".to_string(),
            password_register: "/auth/register".to_string(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PassbindSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let sources = Self::settings_sources();
        let mut settings = Self::load_base_settings(&sources)?;
        Self::apply_env_overrides(&mut settings);
        Self::initialize_logging(&settings.logging)?;

        match sources.last() {
            Some(source) => log::debug!("Loaded base settings from {}", source.display()),
            None => log::debug!("No Settings.toml found, using defaults"),
        }
        Ok(settings)
    }

    /// Initialize `env_logger`, with `RUST_LOG` winning over the configured level
    ///
    /// # Errors
    ///
    /// Returns an error if a logger is already installed
    fn initialize_logging(logging: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
        let env = env_logger::Env::default().default_filter_or(logging.level.as_str());
        env_logger::Builder::from_env(env).try_init()?;
        Ok(())
    }

    /// Settings files to read, lowest priority first
    ///
    /// `./Settings.toml`, then `Settings.toml` in `PASSBIND_SECRETS_DIR`;
    /// only files that exist are returned.
    #[must_use]
    pub fn settings_sources() -> Vec<PathBuf> {
        let mut sources = vec![PathBuf::from("Settings.toml")];
        if let Ok(secrets_dir) = std::env::var("PASSBIND_SECRETS_DIR") {
            sources.push(Path::new(&secrets_dir).join("Settings.toml"));
        }
        sources.retain(|path| path.exists());
        sources
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSBIND_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings(sources: &[PathBuf]) -> Result<Self, Box<dyn std::error::Error>> {
        match sources.last() {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_service_env_overrides(&mut settings.service);
        Self::apply_client_env_overrides(&mut settings.client);
        Self::apply_device_env_overrides(&mut settings.device);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for service settings
    fn apply_service_env_overrides(service_settings: &mut ServiceSettings) {
        if let Ok(base_url) = std::env::var("PASSBIND_BASE_URL") {
            service_settings.base_url = base_url;
        }
        if let Ok(header) = std::env::var("PASSBIND_FINGERPRINT_HEADER") {
            service_settings.fingerprint_header = header;
        }
    }

    /// Apply environment overrides for client settings
    fn apply_client_env_overrides(client_settings: &mut ClientSettings) {
        if let Ok(origin) = std::env::var("PASSBIND_ORIGIN") {
            client_settings.origin = origin;
        }
    }

    /// Apply environment overrides for device attribute settings
    pub fn apply_device_env_overrides(device_settings: &mut DeviceSettings) {
        if let Ok(timezone) = std::env::var("PASSBIND_TIMEZONE") {
            device_settings.timezone = Some(timezone);
        }
        Self::apply_numeric_env_override("PASSBIND_SCREEN_WIDTH", &mut device_settings.screen_width);
        Self::apply_numeric_env_override(
            "PASSBIND_SCREEN_HEIGHT",
            &mut device_settings.screen_height,
        );
        Self::apply_numeric_env_override("PASSBIND_COLOR_DEPTH", &mut device_settings.color_depth);
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut Option<u32>) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.trim().parse::<u32>() {
                *target = Some(value);
            }
        }
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }
}
