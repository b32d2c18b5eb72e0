//! CLI configuration: thin wrapper around `campus_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides
//! (--api-url, --ws-url, --email, --timeout).

use std::path::PathBuf;
use std::time::Duration;

use campus_core::ClientConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use campus_config::{
    Config, DesktopMode, Profile, ReconnectMode, config_path, default_history_path,
    history_path, load_config_or_default, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The profile a command runs against, with flag overrides applied.
///
/// Without a stored profile, `--api-url`, `--ws-url` and `--email` must all
/// be given. An explicitly requested profile that does not exist is an error.
pub fn resolve_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, cfg);

    let mut profile = match cfg.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            });
        }
        None => match (&global.api_url, &global.ws_url, &global.email) {
            (Some(api), Some(ws), Some(email)) => Profile::new(api, ws, email),
            _ => {
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            }
        },
    };

    if let Some(ref api) = global.api_url {
        profile.api_url.clone_from(api);
    }
    if let Some(ref ws) = global.ws_url {
        profile.ws_url.clone_from(ws);
    }
    if let Some(ref email) = global.email {
        profile.email.clone_from(email);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    Ok((name, profile))
}

/// Translate the resolved profile into a `ClientConfig`.
pub fn client_config(
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<(ClientConfig, Profile), CliError> {
    let (name, profile) = resolve_profile(global, cfg)?;
    let mut client = campus_config::profile_to_client_config(&profile, &name)?;
    if profile.timeout.is_none() {
        client.transport.timeout = Duration::from_secs(cfg.defaults.timeout);
    }
    Ok((client, profile))
}

/// History file for the active profile; the platform default otherwise.
pub fn resolve_history_path(global: &GlobalOpts, cfg: &Config) -> PathBuf {
    let name = active_profile_name(global, cfg);
    cfg.profiles
        .get(&name)
        .map_or_else(default_history_path, history_path)
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
