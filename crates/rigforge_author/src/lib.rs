// SPDX-License-Identifier: MIT OR Apache-2.0
//! Imperative rig-graph authoring core.
//!
//! This crate turns a sequence of high-level "build a rig" calls into a
//! typed node graph behind the [`rigforge_graph::GraphBackend`]
//! boundary. It maintains nested function scopes, resolves generic
//! (wildcard) pin types before use, threads an explicit control-flow
//! cursor through branches, loops and fan-outs, and lays out new nodes
//! deterministically so the resulting graph stays legible.
//!
//! ## Architecture
//!
//! - [`layout`] — deterministic column/row node placement
//! - [`binder`] — type-aware encoding of values onto pin addresses
//! - [`variables`] — variable declarations and the type-name table
//! - [`comments`] — comment-box accumulation around node groups
//! - [`scope`] — per-function authoring frames and execution cursors
//! - [`session`] — the [`RigSession`] owning it all, with one node
//!   constructor per archetype
//!
//! Construction is single-threaded and strictly ordered; every error is
//! fail-fast and leaves the partially built graph to the caller.

pub mod binder;
pub mod comments;
pub mod error;
pub mod layout;
pub mod scope;
pub mod session;
pub mod variables;

pub use binder::{BindValue, PinBinder, TransformValue};
pub use comments::{CommentBounds, CommentBoxTracker};
pub use error::{AuthorError, Result};
pub use layout::LayoutState;
pub use scope::{CursorKind, ExecutionCursor, FunctionSignature, PinDecl, ScopeFrame};
pub use session::{BinaryOp, ForEachPins, RigSession};
pub use variables::{TypeNameTable, Variable, VariableScope};
