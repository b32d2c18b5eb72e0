//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Select};
use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, DesktopMode, Profile, ReconnectMode, save_config};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

#[derive(Serialize)]
struct Paths {
    config: String,
    history: String,
}

fn prompt(label: &str, default: Option<&str>) -> Result<String, CliError> {
    let mut input = Input::<String>::new().with_prompt(label);
    if let Some(default) = default {
        input = input.default(default.to_owned());
    }
    input.interact_text().map_err(prompt_err)
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "config init".into(),
            reason: "needs an interactive terminal".into(),
        });
    }

    let path = config::config_path();
    eprintln!("Campus notifications: configuration");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg = config::load_config_or_default();

    let default_name = global.profile.clone().unwrap_or_else(|| "default".into());
    let profile_name = prompt("Profile name", Some(default_name.as_str()))?;
    let api_url = prompt("Incident API URL", global.api_url.as_deref())?;
    let ws_url = prompt("Notification socket URL (ws:// or wss://)", global.ws_url.as_deref())?;
    let email = prompt("Your email", global.email.as_deref())?;

    let reconnect = Select::new()
        .with_prompt("When the notification channel drops")
        .items(&[
            "Keep reconnecting (recommended)",
            "Give up after a few attempts",
        ])
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let desktop = Select::new()
        .with_prompt("Desktop notifications")
        .items(&["Ask on first use", "Always show", "Never show"])
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(api_url, ws_url, email);
    profile.reconnect = if reconnect == 0 {
        ReconnectMode::Always
    } else {
        ReconnectMode::Bounded
    };
    profile.desktop = match desktop {
        0 => DesktopMode::Ask,
        1 => DesktopMode::Granted,
        _ => DesktopMode::Denied,
    };

    // Validate before writing anything.
    campus_config::profile_to_client_config(&profile, &profile_name)?;

    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Try it: campus incidents list");
    Ok(())
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |_| "config".into(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let cfg = config::load_config_or_default();
            let paths = Paths {
                config: config::config_path().display().to_string(),
                history: config::resolve_history_path(global, &cfg)
                    .display()
                    .to_string(),
            };
            let out = output::render_single(
                &global.output,
                &paths,
                |p| format!("config   {}\nhistory  {}", p.config, p.history),
                |p| p.config.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: campus config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: config::available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }
    }
}
