//! CLI configuration: thin wrapper around `fabricctl_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--controller, --api-key, --check-interval, ...).

use secrecy::SecretString;
use serde_json::Value;

use fabricctl_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use fabricctl_config::{Config, Defaults, Profile, config_path, load_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, &cfg.defaults, global);
    }

    if global.profile.is_some() {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    }

    // No profile: flags / env alone must name the controller.
    let Some(controller) = global.controller.clone() else {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };
    let adhoc = Profile {
        controller,
        ..Profile::default()
    };
    resolve_profile(&adhoc, &profile_name, &cfg.defaults, global)
}

/// Translate a `Profile` + global flags into a `ControllerConfig`.
///
/// CLI flag overrides take priority over profile values, which take
/// priority over `[defaults]`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ControllerConfig, CliError> {
    let effective = Profile {
        controller: global
            .controller
            .clone()
            .unwrap_or_else(|| profile.controller.clone()),
        insecure: if global.insecure {
            Some(true)
        } else {
            profile.insecure
        },
        timeout: global.timeout.or(profile.timeout),
        check_interval: global
            .check_interval
            .map(Value::from)
            .or_else(|| profile.check_interval.clone()),
        check_timeout: global
            .check_timeout
            .map(Value::from)
            .or_else(|| profile.check_timeout.clone()),
        ..profile.clone()
    };

    let mut config =
        fabricctl_config::profile_to_controller_config(&effective, profile_name, defaults)?;
    if let Some(ref key) = global.api_key {
        config.api_key = Some(SecretString::from(key.clone()));
    }
    config.check_mode = global.check_mode;
    Ok(config)
}
