//! Candidate fragment resolution for a context chain.
//!
//! Every registered context prefix is expanded once per chain level, general
//! contexts first, so later candidates override earlier ones when merged:
//!
//! ```text
//! conf/Overlay/Production.toml
//! conf/Overlay/Production/Live.toml
//! conf/Overlay/Production/Live/Server1.toml
//! ```
//!
//! Plain paths follow all context expansions, in registration order.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::ContextChain;

/// Strips every character outside `[A-Za-z0-9_-/]` from a context name.
///
/// A `/` is kept so nested contexts map to subdirectories. Leading slashes
/// and `.` never survive, so a sanitized name cannot climb out of or escape
/// the registered prefix.
pub fn sanitize_context(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'))
        .collect();
    kept.trim_start_matches('/').to_string()
}

/// Builds the candidate path for one prefix and one context.
pub fn context_candidate(prefix: &Path, context: &str, extension: &str) -> PathBuf {
    prefix.join(format!("{}.{}", sanitize_context(context), extension))
}

/// Produces the ordered candidate list.
///
/// Existence is not checked here; missing candidates are skipped at load time.
/// Contexts that sanitize to an empty name yield no candidate.
pub fn resolve_candidates(
    chain: &ContextChain,
    context_paths: &[PathBuf],
    plain_paths: &[PathBuf],
    extension: &str,
) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(context_paths.len() * chain.len() + plain_paths.len());

    for prefix in context_paths {
        for context in chain.iter() {
            if sanitize_context(context).is_empty() {
                debug!(context, "context name empty after sanitizing; skipped");
                continue;
            }
            candidates.push(context_candidate(prefix, context, extension));
        }
    }

    candidates.extend(plain_paths.iter().cloned());
    candidates
}
