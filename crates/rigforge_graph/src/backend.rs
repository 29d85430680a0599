// SPDX-License-Identifier: MIT OR Apache-2.0
//! The backend boundary the authoring core builds against.

use crate::geometry::{Point, Size};
use crate::node::NodeId;
use crate::pin::PinPath;
use serde::{Deserialize, Serialize};

/// Direction of an exposed function pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Function input
    Input,
    /// Function output
    Output,
}

/// Host-side graph construction surface.
///
/// Every call is synchronous and strictly ordered; call order is part of
/// the contract (it determines layout and, for some hosts, evaluation
/// order). Implementations own all `NodeId`/pin state; the authoring
/// core only references it.
pub trait GraphBackend {
    /// Materialize a node of the given archetype at a position.
    fn create_node(&mut self, archetype: &str, position: Point) -> Result<NodeId, BackendError>;

    /// Register a new function in the function library.
    fn create_function(&mut self, name: &str, mutable: bool) -> Result<NodeId, BackendError>;

    /// Expose an input or output pin on a function.
    fn add_exposed_pin(
        &mut self,
        function: NodeId,
        name: &str,
        direction: PinDirection,
        type_name: &str,
        is_array: bool,
    ) -> Result<(), BackendError>;

    /// Declare a variable local to one function scope.
    fn declare_local_variable(
        &mut self,
        scope: NodeId,
        name: &str,
        type_name: &str,
        is_array: bool,
    ) -> Result<(), BackendError>;

    /// Declare a variable that lives for the whole graph session.
    fn declare_member_variable(
        &mut self,
        name: &str,
        type_name: &str,
        is_array: bool,
    ) -> Result<(), BackendError>;

    /// Set a pin's default value from its textual grammar form.
    fn set_pin_default(&mut self, pin: &PinPath, literal: &str) -> Result<(), BackendError>;

    /// Link a source pin to a target pin.
    fn add_link(&mut self, source: &PinPath, target: &PinPath) -> Result<(), BackendError>;

    /// Give a wildcard pin its concrete type.
    fn resolve_wildcard_pin(&mut self, pin: &PinPath, type_name: &str)
        -> Result<(), BackendError>;

    /// Expand or collapse a compound pin in the host UI.
    fn set_pin_expanded(&mut self, pin: &PinPath, expanded: bool) -> Result<(), BackendError>;

    /// Resize an array pin ahead of per-element binding.
    fn set_array_pin_size(&mut self, pin: &PinPath, len: usize) -> Result<(), BackendError>;

    /// Move a node.
    fn set_node_position(&mut self, node: NodeId, position: Point) -> Result<(), BackendError>;

    /// Emit an annotation node enclosing a region.
    fn add_comment_node(
        &mut self,
        text: &str,
        top_left: Point,
        size: Size,
        color: [u8; 3],
    ) -> Result<NodeId, BackendError>;

    /// Grow an n-ary fan-out node by one execution plug, returning the
    /// new plug's pin name.
    fn add_array_aggregate_pin(&mut self, node: NodeId) -> Result<String, BackendError>;
}

/// Error raised when the backend refuses a request.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Archetype path is unknown or malformed
    #[error("invalid archetype path: {0:?}")]
    InvalidArchetype(String),

    /// Node not found
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Pin not found
    #[error("unknown pin: {0}")]
    UnknownPin(PinPath),

    /// Any other host-side refusal
    #[error("backend rejected request: {0}")]
    Rejected(String),
}
