//! Entry subcommands: list, show, clear.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use draftsafe_types::entry::AutoSaveEntry;

use super::format_size;
use crate::state::AppState;

fn entry_json(entry: &AutoSaveEntry, with_content: bool) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": entry.id,
        "path": entry.path,
        "size_bytes": entry.content_len(),
        "field_kind": entry.metadata.field_kind.map(|k| k.to_string()),
        "created_at": entry.created_at.to_rfc3339(),
        "updated_at": entry.updated_at.to_rfc3339(),
        "expires_at": entry.expires_at.map(|t| t.to_rfc3339()),
    });
    if with_content {
        value["content"] = serde_json::Value::String(entry.content.clone());
    }
    value
}

/// List live entries, optionally restricted to one path.
pub async fn list_entries(state: &AppState, path: Option<&str>, json: bool) -> Result<()> {
    let entries = match path {
        Some(path) => state.manager().get_entries_for_path(path).await,
        None => state.manager().get_unsaved_entries().await,
    };

    if json {
        let items: Vec<serde_json::Value> = entries.iter().map(|e| entry_json(e, false)).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        match path {
            Some(path) => println!(
                "  {} No saved entries under '{}'.",
                style("i").blue().bold(),
                style(path).cyan()
            ),
            None => println!("  {} No saved entries.", style("i").blue().bold()),
        }
        println!();
        return Ok(());
    }

    println!();
    println!("  Saved entries ({})", entries.len());
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Path").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Size").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Expires").fg(Color::White),
    ]);

    for entry in &entries {
        let kind = entry
            .metadata
            .field_kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        let expires = entry
            .expires_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        table.add_row(vec![
            Cell::new(&entry.id).fg(Color::Cyan),
            Cell::new(&entry.path),
            Cell::new(kind),
            Cell::new(format_size(entry.content_len() as u64)),
            Cell::new(entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string())
                .fg(Color::DarkGrey),
            Cell::new(expires).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();
    Ok(())
}

/// Show one entry with its content.
pub async fn show_entry(state: &AppState, id: &str, json: bool) -> Result<()> {
    let Some(entry) = state.manager().get_entry(id).await else {
        bail!("No saved entry '{id}' (it may have expired or been cleared)");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry_json(&entry, true))?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Entry").bold(), style(&entry.id).cyan());
    println!("     Path:     {}", entry.path);
    if let Some(kind) = entry.metadata.field_kind {
        println!("     Kind:     {kind}");
    }
    if let Some(form) = &entry.metadata.form_name {
        println!("     Form:     {form}");
    }
    if let Some(label) = &entry.metadata.label {
        println!("     Label:    {label}");
    }
    println!("     Created:  {}", entry.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("     Updated:  {}", entry.updated_at.format("%Y-%m-%d %H:%M:%S"));
    match entry.expires_at {
        Some(t) => println!("     Expires:  {}", t.format("%Y-%m-%d %H:%M:%S")),
        None => println!("     Expires:  never"),
    }
    println!("     Size:     {}", format_size(entry.content_len() as u64));
    println!();
    for line in entry.content.lines() {
        println!("  {} {line}", style("|").dim());
    }
    println!();
    Ok(())
}

/// Delete one entry, or every entry with `--all --yes`.
pub async fn clear_entries(
    state: &AppState,
    id: Option<&str>,
    all: bool,
    yes: bool,
    json: bool,
) -> Result<()> {
    if all {
        if !yes {
            bail!("Refusing to delete every entry without --yes");
        }
        let count = state.manager().get_unsaved_entries().await.len();
        state.manager().clear_all_entries().await;
        if json {
            println!("{}", serde_json::json!({ "cleared": count }));
        } else {
            println!();
            println!("  {} Cleared {count} entries.", style("ok").green());
            println!();
        }
        return Ok(());
    }

    let Some(id) = id else {
        bail!("Pass an entry id or --all");
    };
    let existed = state.manager().get_entry(id).await.is_some();
    state.manager().clear_entry(id).await;

    if json {
        println!("{}", serde_json::json!({ "id": id, "cleared": existed }));
    } else if existed {
        println!();
        println!("  {} Cleared '{}'.", style("ok").green(), style(id).cyan());
        println!();
    } else {
        println!();
        println!("  {} No saved entry '{}'.", style("i").blue().bold(), style(id).cyan());
        println!();
    }
    Ok(())
}
