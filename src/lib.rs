pub mod config;
pub mod context;
mod error;

pub use config::{ConfigError, ContextLoader, Fragment, FragmentParser, TomlParser};
pub use context::{ApplicationContext, ContextChain, ContextError, ContextIdentity};
pub use error::Error;
