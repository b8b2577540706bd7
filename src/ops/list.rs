//! Listing views: installed packages, available packages, search.

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use super::Session;
use crate::catalog::{self, SourceEntry};
use crate::identity;
use crate::registry::Registry;

pub fn list(
    session: &Session,
    installed_only: bool,
    available_only: bool,
    search: Option<&str>,
    show_source: bool,
) -> Result<()> {
    let registry = Registry::load(session.registry_path.clone());

    if installed_only {
        print_installed(&registry);
        return Ok(());
    }
    if available_only {
        return print_available(session, &registry, search, show_source);
    }
    print_installed(&registry);
    println!();
    print_available(session, &registry, search, show_source)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_installed(registry: &Registry) {
    if registry.is_empty() {
        println!("No packages installed.");
        return;
    }

    println!("Installed packages ({}):", registry.len());
    let mut table = new_table();
    table.set_header(vec!["Name", "Owner", "Branch", "Path"]);
    for (name, record) in registry.iter() {
        table.add_row(vec![
            name.clone(),
            record.owner.clone(),
            record.branch.clone().unwrap_or_else(|| "default".to_string()),
            record.path.display().to_string(),
        ]);
    }
    println!("{table}");
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AvailableRow {
    name: String,
    repo_name: String,
    owner: String,
    branch: String,
    url: String,
    origin: String,
    installed: bool,
}

fn available_rows(entries: &[SourceEntry], registry: &Registry) -> Vec<AvailableRow> {
    let mut rows: Vec<AvailableRow> = entries
        .iter()
        .map(|entry| {
            let id = identity::resolve(&entry.url);
            let name = entry.display_name();
            AvailableRow {
                installed: registry.contains(&name),
                name,
                repo_name: id.repo,
                owner: id.owner,
                branch: entry.branch.clone().unwrap_or_else(|| "default".to_string()),
                url: entry.url.clone(),
                origin: entry.origin.clone(),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

fn matches_search(row: &AvailableRow, term: &str) -> bool {
    let term = term.to_lowercase();
    row.name.to_lowercase().contains(&term)
        || row.owner.to_lowercase().contains(&term)
        || row.repo_name.to_lowercase().contains(&term)
        || row.origin.to_lowercase().contains(&term)
}

fn print_available(
    session: &Session,
    registry: &Registry,
    search: Option<&str>,
    show_source: bool,
) -> Result<()> {
    let entries = catalog::load_from_dirs(&session.catalog_dirs)?;
    if entries.is_empty() {
        println!("No repositories in catalog file(s).");
        return Ok(());
    }

    let mut rows = available_rows(&entries, registry);
    if let Some(term) = search {
        rows.retain(|row| matches_search(row, term));
    }

    println!("Available packages ({}):", rows.len());
    let mut table = new_table();
    if show_source {
        table.set_header(vec!["Name", "Owner", "Branch", "Status", "Source", "URL"]);
    } else {
        table.set_header(vec!["Name", "Owner", "Branch", "Status", "URL"]);
    }

    for row in rows {
        let status = if row.installed {
            "[INSTALLED]".green().to_string()
        } else {
            "[AVAILABLE]".to_string()
        };
        let mut cells = vec![row.name, row.owner, row.branch, status];
        if show_source {
            cells.push(row.origin);
        }
        cells.push(row.url);
        table.add_row(cells);
    }
    println!("{table}");
    Ok(())
}
