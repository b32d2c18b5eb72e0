//! Shared helpers for command handlers.

use std::io::IsTerminal;

use campus_core::{Filters, Tab};

use crate::cli::{FilterArgs, TabArg};
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn tab(arg: TabArg) -> Tab {
    match arg {
        TabArg::Active => Tab::Active,
        TabArg::Resolved => Tab::Resolved,
    }
}

/// Blank filter values mean "all".
pub fn filters(args: FilterArgs) -> Filters {
    let keep = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    Filters {
        severity: keep(args.severity),
        category: keep(args.category),
        status: keep(args.status),
    }
}

/// Local wall-clock time for log-style lines.
pub fn now_hms() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_dropped() {
        let f = filters(FilterArgs {
            severity: Some("alto".into()),
            category: Some("  ".into()),
            status: None,
        });
        assert_eq!(f.severity.as_deref(), Some("alto"));
        assert!(f.category.is_none());
        assert!(f.status.is_none());
    }

    #[test]
    fn yes_flag_skips_prompt() {
        assert!(matches!(confirm("history clear", "Clear?", true), Ok(true)));
    }
}
