//! Config subcommand handlers.

use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Controller")]
    controller: String,
    #[tabled(rename = "API key")]
    credential: String,
}

fn profile_row(name: &str, profile: &Profile, default: &str) -> ProfileRow {
    let credential = if let Some(ref env) = profile.api_key_env {
        format!("env {env}")
    } else if profile.api_key.is_some() {
        "plaintext".into()
    } else {
        "keyring / none".into()
    };
    ProfileRow {
        name: name.into(),
        default: if name == default { "*".into() } else { String::new() },
        controller: profile.controller.clone(),
        credential,
    }
}

/// Mask plaintext secrets before the config is shown anywhere.
fn redact(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(MASK.into());
        }
    }
    cfg
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = redact(config::load_config()?);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| Ok(c.to_toml()?),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured in {}", config::config_path().display());
                return Ok(());
            }
            let default = config::active_profile_name(global, &cfg);
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            let rows: Vec<(&String, &Profile)> =
                names.into_iter().map(|n| (n, &cfg.profiles[n])).collect();
            let out = output::render_list(
                &global.output,
                &rows,
                |(name, profile)| profile_row(name, profile, &default),
                |(name, _)| (*name).clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
