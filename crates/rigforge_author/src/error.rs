// SPDX-License-Identifier: MIT OR Apache-2.0
//! Authoring error kinds.
//!
//! Every error is fail-fast: the first violated invariant aborts the
//! build, and the partially built graph is the caller's to discard.

use rigforge_graph::{BackendError, PinPath};

/// Error raised by the authoring core.
#[derive(Debug, thiserror::Error)]
pub enum AuthorError {
    /// Node creation with no open mutable frame, a cursor-stack
    /// imbalance, or misuse of a fan-out construct
    #[error("scope violation: {0}")]
    ScopeViolation(String),

    /// Binding an unresolved wildcard pin, re-resolving a wildcard to a
    /// different type, or a literal/pin-type mismatch
    #[error("type resolution error on pin {pin}: {detail}")]
    TypeResolution {
        /// Offending pin
        pin: PinPath,
        /// What went wrong
        detail: String,
    },

    /// A wildcard was used where a concrete type name is required
    #[error("wildcard has no native type name")]
    UnresolvedTypeName,

    /// Variable or comment-box name collision
    #[error("duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    /// Closing a comment box that was never opened
    #[error("unknown comment box: {0}")]
    UnknownCommentBox(String),

    /// Reading a variable that was never declared
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// The backend refused a request
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Authoring result alias.
pub type Result<T> = std::result::Result<T, AuthorError>;
