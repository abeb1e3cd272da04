//! Application context identity and the general-to-specific context chain.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Context used when the environment does not name one.
pub const DEFAULT_CONTEXT: &str = "Production";

const ROOT_CONTEXTS: [&str; 3] = ["Production", "Development", "Testing"];

/// Upper bound on the parent walk in [`ContextChain::from_identity`].
pub const MAX_CONTEXT_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContextError {
    #[error("context name must not be empty")]
    Empty,

    #[error("context '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("context '{0}' must start with Production, Development or Testing")]
    InvalidRoot(String),
}

/// Identity of the context the host application runs in.
///
/// Implementors describe a single node of the hierarchy; the chain is built
/// by following [`parent`](Self::parent) until it returns `None`. The parent
/// walk must terminate: it is cut off after [`MAX_CONTEXT_DEPTH`] levels.
pub trait ContextIdentity {
    /// Full name of this context, e.g. `Production/Live`.
    fn name(&self) -> String;

    /// Whether this context belongs to the production branch.
    fn is_production(&self) -> bool;

    /// The next more general context, or `None` at the root.
    fn parent(&self) -> Option<Box<dyn ContextIdentity>>;
}

/// A `/`-separated application context such as `Production/Live/Server1`.
///
/// The first segment must be one of `Production`, `Development` or `Testing`.
///
/// ## Example
///
/// ```
/// use context_overlay::{ApplicationContext, ContextIdentity};
///
/// let ctx: ApplicationContext = "Production/Live".parse()?;
/// assert!(ctx.is_production());
/// assert_eq!(ctx.parent().unwrap().name(), "Production");
/// # Ok::<(), context_overlay::ContextError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationContext {
    segments: Vec<String>,
}

impl ApplicationContext {
    /// Reads the context from the environment variable `var`.
    ///
    /// An unset or blank variable yields [`DEFAULT_CONTEXT`].
    pub fn from_env(var: &str) -> Result<Self, ContextError> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => value.trim().parse(),
            _ => DEFAULT_CONTEXT.parse(),
        }
    }

    /// Returns true when this is a root context (no parent).
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }
}

impl std::str::FromStr for ApplicationContext {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ContextError::Empty);
        }

        let segments: Vec<String> = s.split('/').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ContextError::EmptySegment(s.to_string()));
        }
        if !ROOT_CONTEXTS.contains(&segments[0].as_str()) {
            return Err(ContextError::InvalidRoot(s.to_string()));
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl ContextIdentity for ApplicationContext {
    fn name(&self) -> String {
        self.to_string()
    }

    fn is_production(&self) -> bool {
        self.segments[0] == "Production"
    }

    fn parent(&self) -> Option<Box<dyn ContextIdentity>> {
        if self.is_root() {
            return None;
        }
        let segments = self.segments[..self.segments.len() - 1].to_vec();
        Some(Box::new(Self { segments }))
    }
}

/// Ordered context names, most general first.
///
/// Always holds at least one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextChain {
    names: Vec<String>,
}

impl ContextChain {
    /// Builds the chain by walking from `identity` up to its root.
    ///
    /// A walk longer than [`MAX_CONTEXT_DEPTH`] (e.g. a cyclic parent
    /// relation) is cut off at that depth, dropping the most general levels.
    pub fn from_identity(identity: &dyn ContextIdentity) -> Self {
        let mut names = vec![identity.name()];
        let mut current = identity.parent();
        while let Some(ctx) = current {
            if names.len() == MAX_CONTEXT_DEPTH {
                warn!(context = %names[0], depth = MAX_CONTEXT_DEPTH, "context parent walk cut off");
                break;
            }
            names.push(ctx.name());
            current = ctx.parent();
        }
        names.reverse();
        Self { names }
    }

    /// Builds a chain from explicit names, most general first.
    pub fn from_names<I, S>(names: I) -> Result<Self, ContextError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ContextError::Empty);
        }
        Ok(Self { names })
    }

    /// All names, most general first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The most specific context.
    pub fn current(&self) -> &str {
        // never empty
        &self.names[self.names.len() - 1]
    }

    /// Number of levels, at least one.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates names, most general first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_context() {
        let ctx: ApplicationContext = "Production/Live/Server1".parse().unwrap();
        assert_eq!(ctx.name(), "Production/Live/Server1");
        assert!(ctx.is_production());
        assert!(!ctx.is_root());
    }

    #[test]
    fn test_parse_rejects_unknown_root() {
        let result: Result<ApplicationContext, _> = "Staging/Live".parse();
        assert!(matches!(result, Err(ContextError::InvalidRoot(_))));
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        let result: Result<ApplicationContext, _> = "Production//Live".parse();
        assert!(matches!(result, Err(ContextError::EmptySegment(_))));

        let result: Result<ApplicationContext, _> = "".parse();
        assert_eq!(result, Err(ContextError::Empty));
    }

    #[test]
    fn test_development_is_not_production() {
        let ctx: ApplicationContext = "Development/Local".parse().unwrap();
        assert!(!ctx.is_production());
    }

    #[test]
    fn test_chain_is_general_first() {
        let ctx: ApplicationContext = "Production/Live/Server1".parse().unwrap();
        let chain = ContextChain::from_identity(&ctx);
        assert_eq!(
            chain.names(),
            ["Production", "Production/Live", "Production/Live/Server1"]
        );
        assert_eq!(chain.current(), "Production/Live/Server1");
    }

    #[test]
    fn test_chain_for_root_context() {
        let ctx: ApplicationContext = "Testing".parse().unwrap();
        let chain = ContextChain::from_identity(&ctx);
        assert_eq!(chain.names(), ["Testing"]);
        assert_eq!(chain.len(), 1);
    }

    #[derive(Debug)]
    struct Cyclic;

    impl ContextIdentity for Cyclic {
        fn name(&self) -> String {
            "Production/Loop".to_string()
        }

        fn is_production(&self) -> bool {
            true
        }

        fn parent(&self) -> Option<Box<dyn ContextIdentity>> {
            Some(Box::new(Cyclic))
        }
    }

    #[test]
    fn test_cyclic_parent_walk_is_bounded() {
        let chain = ContextChain::from_identity(&Cyclic);
        assert_eq!(chain.len(), MAX_CONTEXT_DEPTH);
        assert_eq!(chain.current(), "Production/Loop");
    }

    #[test]
    fn test_chain_from_names_rejects_empty() {
        let result = ContextChain::from_names(Vec::<String>::new());
        assert_eq!(result, Err(ContextError::Empty));
    }

    #[test]
    fn test_from_env_defaults_to_production() {
        let ctx = ApplicationContext::from_env("CONTEXT_OVERLAY_TEST_UNSET_VAR").unwrap();
        assert_eq!(ctx.name(), DEFAULT_CONTEXT);
        assert!(ctx.is_root());
    }
}
