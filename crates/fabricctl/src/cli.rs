//! Clap derive structures for the `fabricctl` CLI.
//!
//! Defines the command tree, global flags, and shared types. Depends on
//! clap alone so `build.rs` can include it for man pages and completions.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fabricctl -- image and maintenance-mode workflows for fabric controllers
#[derive(Debug, Parser)]
#[command(
    name = "fabricctl",
    version,
    about = "Drive fabric controller image and maintenance-mode workflows",
    long_about = "Submits image stage / validate / upgrade and maintenance-mode changes\n\
        to a fabric controller, waits for every switch to converge, and prints\n\
        an audit ledger of everything that was requested and what came back.",
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
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Controller profile to use
    #[arg(long, short = 'p', env = "FABRICCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, short = 'c', env = "FABRICCTL_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Controller API key
    #[arg(long, env = "FABRICCTL_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FABRICCTL_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FABRICCTL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FABRICCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Simulate changes: status reads are real, mutations are not sent
    #[arg(long, env = "FABRICCTL_CHECK_MODE", global = true)]
    pub check_mode: bool,

    /// Seconds between status polls while waiting (overrides profile)
    #[arg(long, env = "FABRICCTL_CHECK_INTERVAL", global = true)]
    pub check_interval: Option<u64>,

    /// Total seconds to wait for one operation to converge (overrides profile)
    #[arg(long, env = "FABRICCTL_CHECK_TIMEOUT", global = true)]
    pub check_timeout: Option<u64>,
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stage, validate, and upgrade switch images
    #[command(alias = "img")]
    Image(ImageArgs),

    /// Move switches into or out of maintenance mode
    #[command(alias = "mm")]
    MaintenanceMode(MaintenanceModeArgs),

    /// Inspect CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Switch serial numbers, space- or comma-separated.
#[derive(Debug, Args)]
pub struct SerialArgs {
    /// Switch serial numbers
    #[arg(required = true, num_args = 1.., value_delimiter = ',')]
    pub serials: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  IMAGE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ImageArgs {
    #[command(subcommand)]
    pub command: ImageCommand,
}

#[derive(Debug, Subcommand)]
pub enum ImageCommand {
    /// Copy the attached image to each switch's bootflash
    Stage(SerialArgs),

    /// Check the staged image against each switch
    Validate {
        #[command(flatten)]
        switches: SerialArgs,

        /// Validate for a non-disruptive upgrade
        #[arg(long)]
        non_disruptive: bool,
    },

    /// Upgrade switches to the image of an attached policy
    Upgrade {
        #[command(flatten)]
        switches: SerialArgs,

        /// Image policy name
        #[arg(long)]
        policy: String,

        /// NX-OS upgrade disruption mode
        #[arg(long, default_value = "disruptive")]
        nxos_mode: NxosModeArg,

        /// Force a BIOS upgrade
        #[arg(long)]
        bios_force: bool,

        /// Upgrade EPLD images as well
        #[arg(long)]
        epld: bool,

        /// Reboot after upgrading
        #[arg(long)]
        reboot: bool,
    },

    /// Show image status per switch (all switches when none given)
    Status {
        /// Switch serial numbers
        #[arg(value_delimiter = ',')]
        serials: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NxosModeArg {
    Disruptive,
    NonDisruptive,
    ForceNonDisruptive,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MAINTENANCE MODE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MaintenanceModeArgs {
    #[command(subcommand)]
    pub command: MaintenanceModeCommand,
}

#[derive(Debug, Subcommand)]
pub enum MaintenanceModeCommand {
    /// Set the system mode of switches in a fabric
    Set {
        /// Fabric the switches belong to
        #[arg(long, short = 'f')]
        fabric: String,

        /// Target mode
        #[arg(long, short = 'm')]
        mode: ModeArg,

        /// Deploy the change and wait for the switches to apply it
        #[arg(long)]
        deploy: bool,

        #[command(flatten)]
        switches: SerialArgs,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Normal,
    Maintenance,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG & COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
