use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// gitpm main parser
#[derive(Parser, Debug)]
#[command(name = "gitpm", version, about = "Install and manage applications from git repositories", long_about = None)]
pub struct Cli {
    /// Install to the system location (/opt/apps) instead of the user location
    #[arg(long, global = true)]
    pub system: bool,

    /// Activate debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a package from a configured repository
    Install {
        /// Package name to install
        name: String,
        /// Skip the compatibility check and install anyway
        #[arg(long)]
        force: bool,
    },
    /// Update installed packages
    Update {
        /// Package name to update (updates all if omitted)
        name: Option<String>,
        /// Check for updates without applying them
        #[arg(long)]
        check: bool,
    },
    /// Remove an installed package
    Remove {
        /// Package name to remove
        name: String,
    },
    /// List packages
    List {
        /// List only installed packages
        #[arg(long)]
        installed: bool,
        /// List only available packages from the catalogs
        #[arg(long)]
        available: bool,
        /// Search for packages
        #[arg(short, long)]
        search: Option<String>,
        /// Show which catalog file each package comes from
        #[arg(long)]
        show_source: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
