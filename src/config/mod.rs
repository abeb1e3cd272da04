//! Context-driven configuration loading and merging.

mod cache;
mod error;
mod file;
mod loader;
mod merge;
mod resolve;

pub use cache::CacheStore;
pub use error::ConfigError;
pub use file::{load_fragment, Fragment, FragmentParser, TomlParser};
pub use loader::{ContextLoader, SITENAME_KEY};
pub use merge::{deep_merge, get_path, set_path};
pub use resolve::{context_candidate, resolve_candidates, sanitize_context};
