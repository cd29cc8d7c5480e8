use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "linuxhost")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge a Linux host's links, accounts and CA trust from a manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest to use instead of the default linuxhost.toml
    #[arg(short, long, global = true, env = "LINUXHOST_MANIFEST")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan {
        /// Only this resource type or address (e.g. user, interface.br0)
        target: Option<String>,
    },

    /// Make the host match the manifest
    Apply {
        /// Only this resource type or address (e.g. user, interface.br0)
        target: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Show the plan without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Parallel jobs within a stage
        #[arg(short, long, default_value = "4")]
        jobs: usize,
    },

    /// Re-read managed resources and update state
    Refresh,

    /// Delete every managed resource
    Destroy {
        /// Only this resource type or address
        target: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Parallel jobs within a stage
        #[arg(short, long, default_value = "4")]
        jobs: usize,
    },

    /// Adopt an existing object into state
    #[command(after_help = "Keys:\n  \
        group           <name>\n  \
        user            <username>\n  \
        interface       <name>\n  \
        ip_address      <interface>/<address>/<prefix>\n  \
        ca_certificate  <name>:<sha256 fingerprint> or <name>")]
    Import {
        /// Resource type
        resource_type: String,

        /// Key identifying the live object
        key: String,
    },

    /// Print live facts read from the host
    Facts {
        #[arg(value_enum)]
        kind: FactKind,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FactKind {
    Interfaces,
    Users,
    Groups,
    Certificates,
}
