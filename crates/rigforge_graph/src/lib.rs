// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph data model and backend boundary for rigforge.
//!
//! This crate defines everything the authoring core and a graph host
//! agree on:
//! - Opaque node identifiers and pin addresses
//! - The typed pin model, including generic (wildcard) pins
//! - The textual default-value grammar
//! - The [`GraphBackend`] trait the host implements
//! - An in-memory [`RecordingBackend`] for tests and tooling
//!
//! The authoring layer lives in `rigforge_author`; graph execution and
//! persistence are the host's business, not this crate's.

pub mod backend;
pub mod geometry;
pub mod literal;
pub mod node;
pub mod pin;
pub mod recording;

pub use backend::{BackendError, GraphBackend, PinDirection};
pub use geometry::{Point, Size};
pub use literal::Literal;
pub use node::NodeId;
pub use pin::{ItemKey, ItemType, PinPath, PinType};
pub use recording::RecordingBackend;
