//! Fragment parsing and conditional loading.

use std::path::Path;

use toml::{Table, Value};

use super::ConfigError;

/// Contribution of a single fragment file.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// The fragment yielded a non-empty table.
    Mapping(Table),
    /// Missing file, empty result, or a value that is not a table.
    Absent,
}

impl Fragment {
    pub fn is_absent(&self) -> bool {
        matches!(self, Fragment::Absent)
    }
}

/// Turns a fragment file into a configuration value.
///
/// Implementations are only called for paths that exist. Returning `Ok(None)`
/// or a non-table value means the fragment contributes nothing. An `Err`
/// aborts the load pass.
pub trait FragmentParser: std::fmt::Debug {
    /// File extension used for context-driven candidates, without the dot.
    fn extension(&self) -> &str;

    fn parse(&self, path: &Path) -> Result<Option<Value>, ConfigError>;
}

/// Parses fragments as TOML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlParser;

impl FragmentParser for TomlParser {
    fn extension(&self) -> &str {
        "toml"
    }

    fn parse(&self, path: &Path) -> Result<Option<Value>, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        let table: Table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Some(Value::Table(table)))
    }
}

/// Loads one fragment if it exists.
///
/// A missing file is the common case for most chain levels and is not an
/// error. Any other I/O failure, such as a directory where a file is
/// expected, is a `ReadError`.
pub fn load_fragment(parser: &dyn FragmentParser, path: &Path) -> Result<Fragment, ConfigError> {
    match std::fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Fragment::Absent),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }

    match parser.parse(path)? {
        Some(Value::Table(table)) if !table.is_empty() => Ok(Fragment::Mapping(table)),
        _ => Ok(Fragment::Absent),
    }
}
