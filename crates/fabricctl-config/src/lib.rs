//! Shared configuration for fabricctl.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `fabricctl_core::ControllerConfig`. The CLI layers its
//! `GlobalOpts` overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use fabricctl_core::{ControllerConfig, CoreError, PollSettings, TlsVerification};

/// Keyring service name for stored API keys.
pub const KEYRING_SERVICE: &str = "fabricctl";

/// Environment prefix for config overrides. Nested keys use `__`,
/// e.g. `FABRICCTL_DEFAULTS__CHECK_INTERVAL=5`.
pub const ENV_PREFIX: &str = "FABRICCTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    /// Polling knobs that are not non-negative integers.
    #[error(transparent)]
    Poll(#[from] CoreError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }

    /// The profile name to use when none is given on the command line.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between poll ticks. Kept loosely typed so bad values are
    /// reported by name instead of as a parse failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<Value>,

    /// Total seconds one wait call may take.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_timeout: Option<Value>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            check_interval: None,
            check_timeout: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named controller profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://10.1.1.1").
    pub controller: String,

    /// API key (plaintext; prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_timeout: Option<Value>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "fabricctl", "fabricctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fabricctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is not
/// an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to core config ──────────────────────────────────────

/// Poll settings for a profile, falling back to `[defaults]`.
pub fn poll_settings(defaults: &Defaults, profile: &Profile) -> Result<PollSettings, ConfigError> {
    let interval = profile
        .check_interval
        .as_ref()
        .or(defaults.check_interval.as_ref());
    let timeout = profile
        .check_timeout
        .as_ref()
        .or(defaults.check_timeout.as_ref());
    Ok(PollSettings::from_values(interval, timeout)?)
}

/// Build a `ControllerConfig` from a profile, no CLI flag overrides.
///
/// A profile without any credential yields an unauthenticated config;
/// the controller decides whether that is acceptable.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url: url::Url = profile
        .controller
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL: {}", profile.controller),
        })?;

    let api_key = match resolve_api_key(profile, profile_name) {
        Ok(key) => Some(key),
        Err(ConfigError::NoCredentials { .. }) => None,
        Err(e) => return Err(e),
    };

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(ControllerConfig {
        url,
        api_key,
        tls,
        timeout,
        check_mode: false,
        poll: poll_settings(defaults, profile)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.default_profile_name(), "default");
        assert_eq!(config.defaults.output, "table");
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn profile_overrides_poll_defaults() {
        let file = write_config(
            r#"
            default_profile = "lab"

            [defaults]
            check_interval = 5
            check_timeout = 600

            [profiles.lab]
            controller = "https://10.1.1.1"
            api_key = "secret"
            check_timeout = 60
            "#,
        );
        let config = load_config_from(file.path()).unwrap();
        let profile = config.profile("lab").unwrap();

        let controller =
            profile_to_controller_config(profile, "lab", &config.defaults).unwrap();

        assert_eq!(controller.poll, PollSettings::from_secs(5, 60));
        assert_eq!(controller.url.as_str(), "https://10.1.1.1/");
        assert_eq!(
            controller.api_key.as_ref().map(|k| k.expose_secret().to_owned()),
            Some("secret".to_owned())
        );
        assert_eq!(controller.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn boolean_check_interval_is_rejected_by_name() {
        let file = write_config(
            r#"
            [profiles.lab]
            controller = "https://10.1.1.1"
            check_interval = true
            "#,
        );
        let config = load_config_from(file.path()).unwrap();
        let profile = config.profile("lab").unwrap();

        let err = poll_settings(&config.defaults, profile).unwrap_err();

        assert!(matches!(err, ConfigError::Poll(_)));
        assert!(err.to_string().contains("check_interval"));
    }

    #[test]
    fn negative_check_timeout_is_rejected() {
        let profile = Profile {
            controller: "https://10.1.1.1".into(),
            check_timeout: Some(serde_json::json!(-5)),
            ..Profile::default()
        };

        let err = poll_settings(&Defaults::default(), &profile).unwrap_err();

        assert!(err.to_string().contains("check_timeout"));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let config = Config::default();
        assert!(matches!(
            config.profile("nope"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn invalid_controller_url_is_rejected() {
        let profile = Profile {
            controller: "not a url".into(),
            ..Profile::default()
        };

        let err = profile_to_controller_config(&profile, "x", &Defaults::default()).unwrap_err();

        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "controller"));
    }

    #[test]
    fn insecure_flag_wins_over_ca_cert() {
        let profile = Profile {
            controller: "https://10.1.1.1".into(),
            ca_cert: Some(PathBuf::from("/etc/ca.pem")),
            insecure: Some(true),
            ..Profile::default()
        };

        let controller =
            profile_to_controller_config(&profile, "x", &Defaults::default()).unwrap();

        assert_eq!(controller.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn config_renders_as_toml() {
        let mut config = Config::default();
        config.profiles.insert(
            "lab".into(),
            Profile {
                controller: "https://10.1.1.1".into(),
                ..Profile::default()
            },
        );

        let rendered = config.to_toml().unwrap();

        assert!(rendered.contains("[profiles.lab]"));
        assert!(rendered.contains("controller = \"https://10.1.1.1\""));
    }

    #[test]
    fn stray_username_key_is_ignored() {
        let file = write_config(
            r#"
            [profiles.lab]
            controller = "https://10.1.1.1"
            username = "admin"
            "#,
        );
        let config = load_config_from(file.path()).unwrap();

        let rendered = config.to_toml().unwrap();

        assert!(rendered.contains("[profiles.lab]"));
        assert!(!rendered.contains("username"));
    }
}
