use std::path::Path;

use hgw_state::{SettingsStore, StoredValue};

use super::open_store;

pub fn get(data_dir: &Path, key: &str) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    match store.get_value(key)? {
        Some(value) => println!("{}", render(&value)?),
        None => anyhow::bail!("no setting named {key}"),
    }
    Ok(())
}

pub fn set(data_dir: &Path, key: &str, raw: &str) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let value = store.put_parsed(key, raw)?;
    println!("✓ {key} = {} ({})", render(&value)?, value.type_name());
    Ok(())
}

pub fn remove(data_dir: &Path, key: &str) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    if store.remove(key)? {
        println!("✓ Removed {key}");
    } else {
        println!("{key} was not set");
    }
    Ok(())
}

pub fn list(data_dir: &Path, prefix: &str) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    for line in describe_keys(&store, prefix)? {
        println!("{line}");
    }
    Ok(())
}

fn describe_keys(store: &SettingsStore, prefix: &str) -> anyhow::Result<Vec<String>> {
    let mut lines = Vec::new();
    for key in store.keys(prefix)? {
        let kind = match store.get_value(&key) {
            Ok(Some(value)) => value.type_name().to_string(),
            Ok(None) => continue,
            Err(e) => format!("unreadable: {e}"),
        };
        lines.push(format!("{key:<40} {kind}"));
    }
    Ok(lines)
}

/// Scalars print bare; structured values print as JSON.
fn render(value: &StoredValue) -> anyhow::Result<String> {
    Ok(match value {
        StoredValue::Bool(b) => b.to_string(),
        StoredValue::Number(n) => n.to_string(),
        StoredValue::Text(s) => s.clone(),
        StoredValue::TextList(items) => items.join(","),
        StoredValue::Config(config) => serde_json::to_string_pretty(config)?,
        StoredValue::Run(report) => serde_json::to_string_pretty(report)?,
    })
}
