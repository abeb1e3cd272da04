//! Deep merge of configuration tables and dotted key-path access.

use toml::{Table, Value};

use super::ConfigError;

/// Merges `overlay` into `base`.
///
/// Nested tables are merged key by key. Any other value, arrays included,
/// replaces what `base` holds at that key. Keys only present in `base` are
/// left untouched.
pub fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, ConfigError> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidKeyPath(path.to_string()));
    }
    Ok(parts)
}

/// Looks up a dotted path such as `SYS.sitename`.
pub fn get_path<'a>(table: &'a Table, path: &str) -> Result<Option<&'a Value>, ConfigError> {
    let parts = split_path(path)?;
    let (last, parents) = parts.split_last().expect("split yields at least one part");

    let mut current = table;
    for part in parents {
        match current.get(*part) {
            Some(Value::Table(nested)) => current = nested,
            Some(_) => return Err(ConfigError::NotATable(path.to_string())),
            None => return Ok(None),
        }
    }

    Ok(current.get(*last))
}

/// Sets the value at a dotted path, creating intermediate tables.
///
/// Fails if an intermediate key holds a non-table value.
pub fn set_path(table: &mut Table, path: &str, value: Value) -> Result<(), ConfigError> {
    let parts = split_path(path)?;
    let (last, parents) = parts.split_last().expect("split yields at least one part");

    let mut current = table;
    for part in parents {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        current = match entry {
            Value::Table(nested) => nested,
            _ => return Err(ConfigError::NotATable(path.to_string())),
        };
    }

    current.insert(last.to_string(), value);
    Ok(())
}
