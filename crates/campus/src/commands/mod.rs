//! Command dispatch: bridges CLI args -> controller operations -> output.

pub mod config_cmd;
pub mod history;
pub mod incidents;
pub mod util;
pub mod watch;
pub mod workers;

use std::sync::Arc;

use campus_core::{ClientConfig, Controller, HistoryStore, JsonFileHistory, MemoryHistory};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Profile};
use crate::error::CliError;

/// Dispatch a command that talks to the incident API.
pub async fn dispatch(
    cmd: Command,
    client_config: ClientConfig,
    profile: &Profile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => {
            let history: Arc<dyn HistoryStore> =
                Arc::new(JsonFileHistory::new(config::history_path(profile)));
            watch::handle(client_config, profile, history, args, global).await
        }
        Command::Incidents(args) => {
            let controller = one_shot(client_config)?;
            incidents::handle(&controller, args, global).await
        }
        Command::Workers(args) => {
            let controller = one_shot(client_config)?;
            workers::handle(&controller, args, global).await
        }
        // Handled before dispatch
        Command::History(_) | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// A controller for commands that never open the notification channel.
fn one_shot(client_config: ClientConfig) -> Result<Controller, CliError> {
    Controller::new(client_config, Arc::new(MemoryHistory::new()), None).map_err(CliError::from)
}
