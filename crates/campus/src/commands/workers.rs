//! Worker command handlers.

use tabled::Tabled;

use campus_core::{Controller, WorkerLoad};

use crate::cli::{GlobalOpts, WorkersArgs, WorkersCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct WorkerRow {
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Specialty")]
    specialty: String,
    #[tabled(rename = "Open")]
    open: usize,
    #[tabled(rename = "Available")]
    available: &'static str,
}

impl From<&WorkerLoad> for WorkerRow {
    fn from(load: &WorkerLoad) -> Self {
        Self {
            email: load.worker.email.clone(),
            name: load.worker.name.clone().unwrap_or_default(),
            specialty: load.worker.specialty.clone().unwrap_or_default(),
            open: load.active_incidents,
            available: if load.is_available() { "yes" } else { "no" },
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: WorkersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        WorkersCommand::List { available } => {
            // Load counts come from the incident list.
            controller.refresh().await?;
            let mut loads = controller.workers().await?;
            if available {
                loads.retain(WorkerLoad::is_available);
            }
            let out = output::render_list(&global.output, &loads, |w| WorkerRow::from(w), |w| {
                w.worker.email.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
