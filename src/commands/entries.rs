//! Entry commands.
//!
//! - `prefstore get <key>` - print one value
//! - `prefstore set <key> <value> --kind <kind>` - store one value
//! - `prefstore remove <key>` - delete one key
//! - `prefstore list [--prefix p]` - keys with kinds
//! - `prefstore dump [--json]` - every entry
//! - `prefstore clear --yes` - delete everything

use anyhow::{Context, Result};
use prefstore::store::{KeyShape, shape_of};
use prefstore::utils::truncate;
use prefstore::{PrefsStore, Value, ValueKind};
use std::collections::BTreeMap;

/// Longest value printed by `list` before truncation.
const LIST_VALUE_WIDTH: usize = 60;

pub fn get(store: &PrefsStore, key: &str, default: Option<&str>) -> Result<()> {
    match (store.get_value(key), default) {
        (Some(value), _) => println!("{value}"),
        (None, Some(default)) => println!("{default}"),
        (None, None) => anyhow::bail!("Key not found: {key}"),
    }
    Ok(())
}

pub fn set(store: &PrefsStore, key: &str, text: &str, kind: ValueKind) -> Result<()> {
    let value = parse_value(text, kind)?;
    store.put(key, value).commit();
    store.flush();
    println!("Set {key} ({kind})");
    Ok(())
}

pub fn remove(store: &PrefsStore, key: &str) -> Result<()> {
    if !store.contains(key) {
        anyhow::bail!("Key not found: {key}");
    }
    store.remove(key);
    store.flush();
    println!("Removed {key}");
    Ok(())
}

pub fn list(store: &PrefsStore, prefix: Option<&str>) {
    let entries = sorted_entries(store);
    let lines = render_list(&entries, prefix);
    if lines.is_empty() {
        println!("No entries");
        return;
    }
    for line in lines {
        println!("{line}");
    }
}

pub fn dump(store: &PrefsStore, json: bool) -> Result<()> {
    let entries = sorted_entries(store);
    if json {
        let out = serde_json::to_string_pretty(&entries).context("Failed to serialize entries")?;
        println!("{out}");
    } else {
        for (key, value) in &entries {
            println!("{key} = {value}");
        }
    }
    Ok(())
}

pub fn clear(store: &PrefsStore, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!(
            "Refusing to delete {} entries without --yes\n  \
             Run: prefstore clear --yes",
            store.len()
        );
    }
    let count = store.len();
    store.clear();
    store.flush();
    println!("Cleared {count} entries");
    Ok(())
}

fn sorted_entries(store: &PrefsStore) -> BTreeMap<String, Value> {
    store.snapshot().into_iter().collect()
}

/// Parses command-line text as `kind`. Booleans must be `true` or `false`.
fn parse_value(text: &str, kind: ValueKind) -> Result<Value> {
    if kind == ValueKind::Bool
        && !text.eq_ignore_ascii_case("true")
        && !text.eq_ignore_ascii_case("false")
    {
        anyhow::bail!("Invalid boolean '{text}': expected true or false");
    }
    kind.parse(text)
        .with_context(|| format!("Invalid {kind} value '{text}'"))
}

fn render_list(entries: &BTreeMap<String, Value>, prefix: Option<&str>) -> Vec<String> {
    entries
        .iter()
        .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
        .map(|(key, value)| {
            let label = match shape_of(key) {
                KeyShape::Scalar => value.kind().tag(),
                KeyShape::Object => "Object",
                KeyShape::List => "List",
            };
            format!(
                "{key}\t{label}\t{}",
                truncate(&value.to_text(), LIST_VALUE_WIDTH)
            )
        })
        .collect()
}
