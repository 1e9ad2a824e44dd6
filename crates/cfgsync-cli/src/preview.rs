//! Rendering pending changes and asking for confirmation.
//!
//! Uses dialoguer for the terminal prompt and similar for record diffs.

use std::fmt::Write as _;

use cfgsync_core::{ChangeList, CollectionChanges};
use cfgsync_store::{ConfigStore, Record};
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;
use similar::{ChangeTag, TextDiff};

use crate::error::{CliError, Result};

fn collection_label(collection: &str) -> String {
    if collection.is_empty() {
        "default collection".to_string()
    } else {
        format!("collection {collection}")
    }
}

/// Names grouped by collection and operation.
pub fn render_list(changelist: &ChangeList) -> String {
    let mut out = String::new();
    for (collection, changes) in changelist.iter() {
        if changes.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", collection_label(collection).bold());
        for name in &changes.create {
            let _ = writeln!(out, "  {} {}", "+".green(), name.green());
        }
        for name in &changes.update {
            let _ = writeln!(out, "  {} {}", "~".yellow(), name.yellow());
        }
        for (old, new) in &changes.rename {
            let _ = writeln!(out, "  {} {} -> {}", ">".cyan(), old.cyan(), new.cyan());
        }
        for name in &changes.delete {
            let _ = writeln!(out, "  {} {}", "-".red(), name.red());
        }
    }
    out
}

/// The encoded form of a record, or nothing when it is absent.
fn encoded(store: &dyn ConfigStore, data: Option<&Record>) -> Result<String> {
    match data {
        Some(data) => Ok(String::from_utf8_lossy(&store.encode(data)?).into_owned()),
        None => Ok(String::new()),
    }
}

/// Unified diff text between two encoded records.
pub fn unified(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("--- {old_label}").red());
    let _ = writeln!(out, "{}", format!("+++ {new_label}").green());
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        let _ = match change.tag() {
            ChangeTag::Delete => writeln!(out, "{}", format!("-{line}").red()),
            ChangeTag::Insert => writeln!(out, "{}", format!("+{line}").green()),
            ChangeTag::Equal => writeln!(out, " {line}"),
        };
    }
    out
}

/// A diff for every changed record, `from` being the store that changes.
pub fn render_diff(
    changelist: &ChangeList,
    to: &dyn ConfigStore,
    from: &dyn ConfigStore,
) -> Result<String> {
    let mut out = String::new();
    for (collection, changes) in changelist.iter() {
        if changes.is_empty() {
            continue;
        }
        let to_c = to.create_collection(collection)?;
        let from_c = from.create_collection(collection)?;
        let _ = writeln!(out, "{}", collection_label(collection).bold());
        render_collection(&mut out, changes, to_c.as_ref(), from_c.as_ref())?;
    }
    Ok(out)
}

fn render_collection(
    out: &mut String,
    changes: &CollectionChanges,
    to: &dyn ConfigStore,
    from: &dyn ConfigStore,
) -> Result<()> {
    for name in changes.writes() {
        let old = encoded(from, from.read(name)?.as_ref())?;
        let new = encoded(from, to.read(name)?.as_ref())?;
        out.push_str(&unified(&old, &new, &format!("a/{name}"), &format!("b/{name}")));
    }
    for (old_name, new_name) in &changes.rename {
        let old = encoded(from, from.read(old_name)?.as_ref())?;
        let new = encoded(from, to.read(new_name)?.as_ref())?;
        out.push_str(&unified(&old, &new, &format!("a/{old_name}"), &format!("b/{new_name}")));
    }
    for name in &changes.delete {
        let old = encoded(from, from.read(name)?.as_ref())?;
        out.push_str(&unified(&old, "", &format!("a/{name}"), "/dev/null"));
    }
    Ok(())
}

/// JSON view of a changelist for scripting.
pub fn to_json(changelist: &ChangeList) -> serde_json::Value {
    let collections: serde_json::Map<String, serde_json::Value> = changelist
        .iter()
        .filter(|(_, changes)| !changes.is_empty())
        .map(|(collection, changes)| {
            (
                collection.to_string(),
                json!({
                    "create": changes.create,
                    "update": changes.update,
                    "delete": changes.delete,
                    "rename": changes
                        .rename
                        .iter()
                        .map(|(old, new)| json!({"from": old, "to": new}))
                        .collect::<Vec<_>>(),
                }),
            )
        })
        .collect();
    json!({
        "has_changes": changelist.has_changes(),
        "collections": collections,
    })
}

/// Ask before applying; `yes` skips the prompt.
pub fn confirm(prompt: &str, yes: bool) -> Result<()> {
    if yes {
        return Ok(());
    }
    let proceed = Confirm::new().with_prompt(prompt).default(false).interact()?;
    if !proceed {
        return Err(CliError::user("Cancelled by user."));
    }
    Ok(())
}
