use crate::config::ConfigError;
use crate::context::ContextError;
use thiserror::Error;

/// Top-level error type for the context-overlay library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("context error: {0}")]
    Context(#[from] ContextError),
}
