//! Store-level subcommands: export, import, purge, stats.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use draftsafe_core::storage::AutoSaveStorage;

use super::format_size;
use crate::state::AppState;

/// Export every stored value to a file or stdout.
pub async fn export_store(state: &AppState, out: Option<&Path>, json: bool) -> Result<()> {
    let blob = state.storage().export_data().await?;

    let Some(out) = out else {
        println!("{blob}");
        return Ok(());
    };

    tokio::fs::write(out, &blob)
        .await
        .with_context(|| format!("Failed to write to: {}", out.display()))?;

    if json {
        let result = serde_json::json!({
            "output_path": out.display().to_string(),
            "size_bytes": blob.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Exported store -> {}",
            style("ok").green(),
            style(out.display()).dim()
        );
        println!("     {} written", format_size(blob.len() as u64));
        println!();
    }
    Ok(())
}

/// Import values from an export file.
pub async fn import_store(state: &AppState, file: &Path, json: bool) -> Result<()> {
    let blob = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let imported = state
        .storage()
        .import_data(&blob)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if json {
        println!("{}", serde_json::json!({ "imported": imported }));
    } else {
        println!();
        println!(
            "  {} Imported {imported} values from {}",
            style("ok").green(),
            style(file.display()).dim()
        );
        println!();
    }
    Ok(())
}

/// Remove expired and unreadable values from the persistent store.
pub async fn purge_store(state: &AppState, json: bool) -> Result<()> {
    let options = &state.config.storage_options;
    let before = state.storage().managed_len(options)?;
    state.storage().purge(options)?;
    // Values with a valid envelope but an invalid entry inside
    let live = state.manager().get_unsaved_entries().await.len();
    let removed = before.saturating_sub(state.storage().managed_len(options)?);

    if json {
        println!("{}", serde_json::json!({ "removed": removed, "remaining": live }));
    } else {
        println!();
        println!(
            "  {} Removed {removed} expired or unreadable values, {live} entries remain.",
            style("ok").green()
        );
        println!();
    }
    Ok(())
}

/// Show store statistics.
pub async fn stats(state: &AppState, json: bool) -> Result<()> {
    let entries = state.manager().get_unsaved_entries().await;
    let size = state.storage().storage_size().await?;
    let options = &state.config.storage_options;
    let newest = entries.first().map(|e| e.updated_at);
    let oldest = entries.last().map(|e| e.updated_at);

    if json {
        let stats = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "store": state.store_path().display().to_string(),
            "namespace": state.config.storage_key,
            "entries": entries.len(),
            "max_entries": state.config.max_entries,
            "size_bytes": size,
            "max_storage_bytes": state.config.max_storage_bytes,
            "compress": options.compress,
            "encrypt": options.encrypt,
            "ttl_millis": options.ttl_millis,
            "oldest_update": oldest.map(|t| t.to_rfc3339()),
            "newest_update": newest.map(|t| t.to_rfc3339()),
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let on_off = |on: bool| {
        if on {
            format!("{}", style("on").green())
        } else {
            format!("{}", style("off").dim())
        }
    };

    println!();
    println!(
        "  {} draftsafe v{}",
        style("*").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("     Store:       {}", style(state.store_path().display()).dim());
    println!("     Namespace:   {}", style(&state.config.storage_key).cyan());
    println!(
        "     Entries:     {} / {}",
        entries.len(),
        state.config.max_entries
    );
    println!(
        "     Size:        {} / {}",
        format_size(size),
        format_size(state.config.max_storage_bytes)
    );
    println!("     Compression: {}", on_off(options.compress));
    println!("     Encryption:  {}", on_off(options.encrypt));
    match options.ttl_millis.filter(|ttl| *ttl > 0) {
        Some(ttl) => println!("     TTL:         {}", format_ttl(ttl)),
        None => println!("     TTL:         none"),
    }
    if let (Some(oldest), Some(newest)) = (oldest, newest) {
        println!(
            "     Updates:     {} .. {}",
            oldest.format("%Y-%m-%d %H:%M"),
            newest.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    Ok(())
}

fn format_ttl(millis: u64) -> String {
    let secs = millis / 1000;
    match secs {
        s if s >= 86_400 && s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s >= 3_600 && s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s >= 60 && s % 60 == 0 => format!("{}m", s / 60),
        s if s > 0 => format!("{s}s"),
        _ => format!("{millis}ms"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_shown_in_largest_whole_unit() {
        assert_eq!(format_ttl(604_800_000), "7d");
        assert_eq!(format_ttl(7_200_000), "2h");
        assert_eq!(format_ttl(90_000), "90s");
        assert_eq!(format_ttl(300_000), "5m");
        assert_eq!(format_ttl(250), "250ms");
    }
}
