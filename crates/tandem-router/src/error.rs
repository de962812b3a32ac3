//! Route registration errors.

use thiserror::Error;

/// Errors raised while building a route table.
///
/// Matching never fails; only registration does.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern does not start with `/`.
    #[error("route pattern must start with '/': {pattern}")]
    NotAbsolute {
        /// The offending pattern.
        pattern: String,
    },

    /// A wildcard segment is followed by further segments.
    #[error("wildcard must be the last segment in {pattern}")]
    WildcardNotLast {
        /// The offending pattern.
        pattern: String,
    },

    /// A parameter or wildcard segment has no name.
    #[error("unnamed parameter in {pattern}")]
    UnnamedParam {
        /// The offending pattern.
        pattern: String,
    },

    /// Two patterns bind different names at the same position.
    #[error("parameter {{{new}}} in {pattern} conflicts with existing {{{existing}}}")]
    ParamConflict {
        /// The offending pattern.
        pattern: String,
        /// The name already registered at this position.
        existing: String,
        /// The name the new pattern tried to use.
        new: String,
    },

    /// The same method is already bound on this path.
    #[error("{method} {pattern} is already routed to {existing}")]
    Duplicate {
        /// The HTTP method.
        method: String,
        /// The offending pattern.
        pattern: String,
        /// The target already registered.
        existing: String,
    },
}
