mod catalog;
mod cli;
mod deps;
mod distro;
mod error;
mod exec;
mod git;
mod hooks;
mod identity;
mod manifest;
mod ops;
mod progress;
mod prompt;
mod registry;
mod remote;
mod scope;

use clap::{CommandFactory, Parser};
use colored::Colorize;

use crate::cli::{Cli, Commands};
use crate::error::GitpmError;
use crate::ops::Session;
use crate::prompt::TerminalDecider;
use crate::scope::Scope;

fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "gitpm", &mut std::io::stdout());
        return;
    }

    let scope = if cli.system { Scope::System } else { Scope::User };
    if scope.is_system() && !scope::is_root() {
        eprintln!("{} --system requires root privileges", "Error:".red().bold());
        std::process::exit(1);
    }

    if let Err(e) = run(&cli, scope) {
        eprintln!("{} {e}", "Error:".red().bold());
        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {cause}");
        }
        if matches!(e.downcast_ref::<GitpmError>(), Some(GitpmError::NoCatalogs)) {
            print_catalog_help();
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli, scope: Scope) -> anyhow::Result<()> {
    let session = Session::new(scope)?;
    if cli.debug {
        eprintln!("scope: {:?}, distro: {}", session.scope, session.distro);
    }

    match &cli.command {
        Commands::Install { name, force } => {
            ops::install::install(&session, name, *force, &TerminalDecider)
        }
        Commands::Update { name, check } => ops::update::update(&session, name.as_deref(), *check),
        Commands::Remove { name } => ops::remove::remove(&session, name),
        Commands::List {
            installed,
            available,
            search,
            show_source,
        } => ops::list::list(&session, *installed, *available, search.as_deref(), *show_source),
        Commands::Completions { .. } => unreachable!("handled before scope setup"),
    }
}

fn print_catalog_help() {
    eprintln!("Create a catalog file in one of these locations:");
    eprintln!("  - ~/.config/gitpm/repos.conf (user)");
    eprintln!("  - /etc/xdg/gitpm/repos.conf (system)");
    eprintln!("Format: url or url,branch,name");
}
