//! Clap derive structures for the `campus` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// campus -- realtime incident notifications for campus staff
#[derive(Debug, Parser)]
#[command(
    name = "campus",
    version,
    about = "Watch and manage campus incident reports from the command line",
    long_about = "Follows incident state changes as they happen over the realtime\n\
        notification channel, and lists, creates, updates, assigns and completes\n\
        incidents through the incident API.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Deployment profile to use
    #[arg(long, short = 'p', env = "CAMPUS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Incident API stage root (overrides profile)
    #[arg(long, env = "CAMPUS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Notification socket address (overrides profile)
    #[arg(long, env = "CAMPUS_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Your email; the API authorizes requests by it
    #[arg(long, short = 'e', env = "CAMPUS_EMAIL", global = true)]
    pub email: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAMPUS_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CAMPUS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum TabArg {
    /// Incidents still being worked on
    #[default]
    Active,
    /// Resolved incidents, grouped by day
    Resolved,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow state changes live until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List and manage incidents
    #[command(alias = "inc", alias = "i")]
    Incidents(IncidentsArgs),

    /// List maintenance workers and their load
    Workers(WorkersArgs),

    /// Inspect or clear the notification history
    History(HistoryArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared List Arguments ────────────────────────────────────────────

/// Active-tab filters.
#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    /// Only incidents with this risk level
    #[arg(long)]
    pub severity: Option<String>,

    /// Only incidents of this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only incidents in this state (case-insensitive)
    #[arg(long)]
    pub status: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Give up after a few failed reconnects instead of retrying forever
    #[arg(long)]
    pub bounded: bool,

    /// Reconnect ceiling (implies --bounded)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Which list tab to print after each refresh
    #[arg(long, value_enum, default_value = "active")]
    pub tab: TabArg,

    /// Do not print the incident list, only status and notifications
    #[arg(long)]
    pub no_list: bool,

    /// Never show desktop notifications
    #[arg(long)]
    pub no_desktop: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INCIDENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct IncidentsArgs {
    #[command(subcommand)]
    pub command: IncidentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum IncidentsCommand {
    /// List incidents
    #[command(alias = "ls")]
    List {
        #[arg(long, value_enum, default_value = "active")]
        tab: TabArg,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Report a new incident
    Create {
        #[arg(long)]
        title: String,

        #[arg(long, short = 'd')]
        description: String,

        #[arg(long, default_value = "")]
        category: String,

        #[arg(long, default_value = "")]
        floor: String,

        /// Specific place, e.g. "Lab 204"
        #[arg(long, default_value = "")]
        location: String,

        /// Photo URL
        #[arg(long, default_value = "")]
        photo: String,

        /// Risk level
        #[arg(long, default_value = "")]
        severity: String,
    },

    /// Edit an incident's details
    Update {
        /// Incident ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        severity: Option<String>,
    },

    /// Assign an incident to a worker
    Assign {
        /// Incident ID
        id: String,

        /// Worker email
        #[arg(long, short = 'w')]
        worker: String,
    },

    /// Mark an incident as completed
    Complete {
        /// Incident ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WORKERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WorkersArgs {
    #[command(subcommand)]
    pub command: WorkersCommand,
}

#[derive(Debug, Subcommand)]
pub enum WorkersCommand {
    /// List workers with their open assignment counts
    #[command(alias = "ls")]
    List {
        /// Only workers with no open assignments
        #[arg(long)]
        available: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HISTORY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Show past state changes, newest first
    #[command(alias = "ls")]
    List,

    /// Forget all past state changes
    Clear,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config and history file locations
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
