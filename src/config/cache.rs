//! Snapshot cache of a fully merged configuration.
//!
//! Presence of the cache file is the only validity check. A stale snapshot is
//! served until the file is deleted or caching is switched off.
//!
//! On-disk format:
//! ```text
//! # context-overlay len=<body bytes> crc32=<hex>
//! <TOML body>
//! ```
//! A body whose length or CRC32 does not match the header is a miss, so a
//! torn or truncated file is never taken for a smaller configuration.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use toml::Table;
use tracing::{debug, warn};

const HEADER_PREFIX: &str = "# context-overlay";

/// Cache file location, or nothing when caching is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStore {
    path: Option<PathBuf>,
}

impl CacheStore {
    /// A store that never hits and never writes.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// A store backed by the snapshot file at `path`.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// The snapshot file, if caching is enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a snapshot file is configured.
    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Reads the cached snapshot.
    ///
    /// Every failure, including a truncated or corrupt file, is a miss.
    pub fn try_load(&self) -> Option<Table> {
        let path = self.path.as_deref()?;

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config cache miss");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable config cache; ignoring");
                return None;
            }
        };

        let Some(body) = unframe(&contents) else {
            warn!(path = %path.display(), len = contents.len(), "torn config cache; ignoring");
            return None;
        };

        match toml::from_str::<Table>(body) {
            Ok(table) if !table.is_empty() => {
                debug!(path = %path.display(), keys = table.len(), "config cache hit");
                Some(table)
            }
            Ok(_) => {
                debug!(path = %path.display(), "empty config cache; ignoring");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt config cache; ignoring");
                None
            }
        }
    }

    /// Writes `table` as the new snapshot, replacing any previous one.
    ///
    /// The snapshot is written to a sibling temporary file and renamed into
    /// place. Failures are logged and otherwise ignored.
    pub fn save(&self, table: &Table) {
        let Some(path) = self.path.as_deref() else {
            return;
        };

        let body = match toml::to_string(table) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to serialize config cache");
                return;
            }
        };

        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(path = %path.display(), error = %e, "failed to create config cache directory");
            return;
        }

        let result = NamedTempFile::new_in(dir)
            .and_then(|mut file| file.write_all(frame(&body).as_bytes()).map(|()| file))
            .and_then(|file| file.persist(path).map_err(|e| e.error));

        match result {
            Ok(_) => debug!(path = %path.display(), len = body.len(), "config cache written"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write config cache"),
        }
    }
}

fn frame(body: &str) -> String {
    let crc = crc32fast::hash(body.as_bytes());
    format!("{HEADER_PREFIX} len={} crc32={crc:08x}\n{body}", body.len())
}

/// Returns the body if the header matches it.
fn unframe(contents: &str) -> Option<&str> {
    let (header, body) = contents.split_once('\n')?;
    let mut fields = header.strip_prefix(HEADER_PREFIX)?.split_whitespace();

    let len: usize = fields.next()?.strip_prefix("len=")?.parse().ok()?;
    let crc = u32::from_str_radix(fields.next()?.strip_prefix("crc32=")?, 16).ok()?;

    (body.len() == len && crc32fast::hash(body.as_bytes()) == crc).then_some(body)
}
