use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::debug;

use super::cache::CacheStore;
use super::file::{load_fragment, Fragment, FragmentParser, TomlParser};
use super::merge::{deep_merge, get_path, set_path};
use super::resolve::resolve_candidates;
use super::ConfigError;
use crate::context::{ApplicationContext, ContextChain, ContextIdentity};
use crate::Error;

/// Key the context name is appended to by
/// [`append_context_to_sitename`](ContextLoader::append_context_to_sitename).
pub const SITENAME_KEY: &str = "SYS.sitename";

/// Loads configuration overlays for the current application context.
///
/// Context-driven paths are expanded once per level of the context chain,
/// general first. Plain paths are loaded afterwards in registration order.
/// Every fragment found is deep-merged into the caller's table, so the most
/// specific context and then the last plain path win. Nested tables are
/// merged recursively; other values (including arrays) are replaced.
///
/// With caching enabled the merged table is written to a snapshot file after
/// a full load and trusted on every later load until the file is removed.
///
/// Paths must be registered before [`load_configuration`](Self::load_configuration)
/// runs; registrations made afterwards only affect subsequent load passes.
///
/// ## Example
///
/// ```no_run
/// use context_overlay::{ApplicationContext, ContextLoader};
///
/// let context: ApplicationContext = "Production/Live/Server1".parse()?;
/// let mut conf = toml::Table::new();
///
/// ContextLoader::new(&context)
///     .use_cache_in_production("var/cache/context_conf.toml")
///     .with_context_path("conf/AdditionalConfiguration")
///     .with_path("conf/local.toml")
///     .load_configuration(&mut conf)?
///     .append_context_to_sitename(&mut conf)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
#[must_use = "the loader does nothing until .load_configuration() is called"]
pub struct ContextLoader {
    chain: ContextChain,
    production: bool,
    context_paths: Vec<PathBuf>,
    plain_paths: Vec<PathBuf>,
    cache: CacheStore,
    parser: Box<dyn FragmentParser>,
}

impl ContextLoader {
    /// Creates a loader for `context`, building its chain once.
    pub fn new(context: &dyn ContextIdentity) -> Self {
        let chain = ContextChain::from_identity(context);
        debug!(chain = ?chain.names(), "context chain built");
        Self {
            chain,
            production: context.is_production(),
            context_paths: Vec::new(),
            plain_paths: Vec::new(),
            cache: CacheStore::disabled(),
            parser: Box::new(TomlParser),
        }
    }

    /// Creates a loader for the context named by the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, Error> {
        let context = ApplicationContext::from_env(var)?;
        Ok(Self::new(&context))
    }

    /// Adds a directory whose fragments are selected by context name.
    pub fn with_context_path(mut self, path: impl AsRef<Path>) -> Self {
        self.context_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds a single fragment file, loaded as-is after all context fragments.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.plain_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replaces the fragment parser (TOML by default).
    pub fn with_parser(mut self, parser: impl FragmentParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Caches the merged configuration at `path`.
    pub fn use_cache(mut self, path: impl AsRef<Path>) -> Self {
        self.cache = CacheStore::at(path);
        self
    }

    /// Caches at `path` only when the context is a production context.
    pub fn use_cache_in_production(self, path: impl AsRef<Path>) -> Self {
        if self.production {
            self.use_cache(path)
        } else {
            self
        }
    }

    /// The chain built at construction, most general first.
    pub fn context_chain(&self) -> &ContextChain {
        &self.chain
    }

    /// The snapshot file, if caching is enabled.
    pub fn cache_file(&self) -> Option<&Path> {
        self.cache.path()
    }

    /// Candidate fragment paths in merge order.
    pub fn resolve(&self) -> Vec<PathBuf> {
        resolve_candidates(
            &self.chain,
            &self.context_paths,
            &self.plain_paths,
            self.parser.extension(),
        )
    }

    /// Applies the configuration overlays to `conf`.
    ///
    /// On a cache hit `conf` is replaced by the snapshot and no fragment is
    /// read. Otherwise every existing fragment is merged in order and the
    /// result is cached. A fragment that fails to parse aborts the pass;
    /// fragments merged before it stay merged.
    ///
    /// Running the pass again re-applies the same overlays (or re-reads the
    /// snapshot), so repeated calls are idempotent for unchanged fragments.
    pub fn load_configuration(&self, conf: &mut Table) -> Result<&Self, ConfigError> {
        if let Some(cached) = self.cache.try_load() {
            *conf = cached;
            return Ok(self);
        }

        for path in self.resolve() {
            self.load_configuration_file(&path, conf)?;
        }
        self.cache.save(conf);

        Ok(self)
    }

    /// Runs the load pass over an empty table and deserializes the result.
    pub fn build<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let mut conf = Table::new();
        self.load_configuration(&mut conf)?;
        Value::Table(conf).try_into().map_err(ConfigError::DeserializeError)
    }

    /// Appends ` [[CONTEXT]]` to [`SITENAME_KEY`] unless the context is the
    /// production root.
    ///
    /// A missing site name is set to the bare marker (`[[CONTEXT]]`, no
    /// leading space). A non-string site name is an error.
    pub fn append_context_to_sitename(&self, conf: &mut Table) -> Result<&Self, ConfigError> {
        if self.production && self.chain.len() == 1 {
            return Ok(self);
        }

        let marker = format!("[[{}]]", self.chain.current().to_uppercase());
        let sitename = match get_path(conf, SITENAME_KEY)? {
            Some(Value::String(name)) => format!("{name} {marker}"),
            Some(_) => return Err(ConfigError::NotAString(SITENAME_KEY.to_string())),
            None => marker,
        };
        set_path(conf, SITENAME_KEY, Value::String(sitename))?;

        Ok(self)
    }

    fn load_configuration_file(&self, path: &Path, conf: &mut Table) -> Result<(), ConfigError> {
        match load_fragment(self.parser.as_ref(), path)? {
            Fragment::Mapping(table) => {
                debug!(path = %path.display(), keys = table.len(), "merging config fragment");
                deep_merge(conf, table);
            }
            Fragment::Absent => {
                debug!(path = %path.display(), "no config fragment");
            }
        }
        Ok(())
    }
}
