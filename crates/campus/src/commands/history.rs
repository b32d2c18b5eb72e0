//! Notification history handlers. These read the local history file only.

use tabled::Tabled;

use campus_core::{HistoryEntry, HistoryStore, JsonFileHistory};

use crate::cli::{GlobalOpts, HistoryArgs, HistoryCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Incident")]
    incident: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "When")]
    when: String,
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(e: &HistoryEntry) -> Self {
        Self {
            incident: e.incident_id.clone(),
            title: e.title.clone().unwrap_or_default(),
            from: e.old_state.clone().unwrap_or_default(),
            to: e.new_state.clone(),
            when: e.timestamp.clone().unwrap_or_default(),
        }
    }
}

pub fn handle(args: HistoryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let store = JsonFileHistory::new(config::resolve_history_path(global, &cfg));

    match args.command {
        HistoryCommand::List => {
            let entries = store.load()?;
            if entries.is_empty() && matches!(global.output, crate::cli::OutputFormat::Table) {
                output::print_output("No notifications yet.", global.quiet);
                return Ok(());
            }
            let out = output::render_list(&global.output, &entries, |e| HistoryRow::from(e), |e| {
                e.incident_id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HistoryCommand::Clear => {
            if !util::confirm(
                "history clear",
                "Forget all past notifications?",
                global.yes,
            )? {
                return Ok(());
            }
            store.save(&[])?;
            if !global.quiet {
                eprintln!("✓ Notification history cleared");
            }
            Ok(())
        }
    }
}
