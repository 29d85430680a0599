// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory backend that records every construction call.
//!
//! Used by the test suites and handy as a dry-run target: it validates
//! the little it can (archetype paths, node existence) and keeps an
//! ordered record of everything else.

use crate::backend::{BackendError, GraphBackend, PinDirection};
use crate::geometry::{Point, Size};
use crate::node::NodeId;
use crate::pin::PinPath;
use indexmap::IndexMap;

/// A node materialized by [`RecordingBackend`].
#[derive(Debug, Clone)]
pub struct RecordedNode {
    /// Archetype path the node was created from
    pub archetype: String,
    /// Position it was created at (updated by `set_node_position`)
    pub position: Point,
}

/// A function registered in the library.
#[derive(Debug, Clone)]
pub struct RecordedFunction {
    /// Function name
    pub name: String,
    /// Whether the function bears control flow
    pub mutable: bool,
    /// Exposed pins as `(name, direction, type_name, is_array)`
    pub exposed_pins: Vec<(String, PinDirection, String, bool)>,
}

/// A comment node emitted by `add_comment_node`.
#[derive(Debug, Clone)]
pub struct RecordedComment {
    /// Comment text
    pub text: String,
    /// Top-left corner
    pub top_left: Point,
    /// Extent
    pub size: Size,
    /// RGB color
    pub color: [u8; 3],
}

/// Backend that stores the full construction transcript in memory.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    nodes: IndexMap<NodeId, RecordedNode>,
    functions: IndexMap<NodeId, RecordedFunction>,
    links: Vec<(PinPath, PinPath)>,
    defaults: IndexMap<PinPath, String>,
    resolved: IndexMap<PinPath, String>,
    expanded: Vec<PinPath>,
    array_sizes: IndexMap<PinPath, usize>,
    local_variables: Vec<(NodeId, String, String, bool)>,
    member_variables: IndexMap<String, (String, bool)>,
    comments: Vec<RecordedComment>,
    aggregate_counts: IndexMap<NodeId, usize>,
    calls: usize,
}

impl RecordingBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of backend calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls
    }

    /// Number of materialized nodes (functions excluded).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look up a recorded node.
    pub fn node(&self, id: NodeId) -> Option<&RecordedNode> {
        self.nodes.get(&id)
    }

    /// All recorded nodes, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &RecordedNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Look up a registered function.
    pub fn function(&self, id: NodeId) -> Option<&RecordedFunction> {
        self.functions.get(&id)
    }

    /// All links, in creation order.
    pub fn links(&self) -> &[(PinPath, PinPath)] {
        &self.links
    }

    /// Whether a link from `source` to `target` was recorded.
    pub fn has_link(&self, source: &PinPath, target: &PinPath) -> bool {
        self.links.iter().any(|(s, t)| s == source && t == target)
    }

    /// The default text set on a pin, if any.
    pub fn default_of(&self, pin: &PinPath) -> Option<&str> {
        self.defaults.get(pin).map(String::as_str)
    }

    /// The concrete type a wildcard pin was resolved to, if any.
    pub fn resolved_type(&self, pin: &PinPath) -> Option<&str> {
        self.resolved.get(pin).map(String::as_str)
    }

    /// Whether a compound pin was marked expanded.
    pub fn is_expanded(&self, pin: &PinPath) -> bool {
        self.expanded.contains(pin)
    }

    /// The size an array pin was last resized to, if any.
    pub fn array_size(&self, pin: &PinPath) -> Option<usize> {
        self.array_sizes.get(pin).copied()
    }

    /// Declared local variables as `(scope, name, type_name, is_array)`.
    pub fn local_variables(&self) -> &[(NodeId, String, String, bool)] {
        &self.local_variables
    }

    /// Declared member variables by name.
    pub fn member_variable(&self, name: &str) -> Option<&(String, bool)> {
        self.member_variables.get(name)
    }

    /// Emitted comment nodes, in creation order.
    pub fn comments(&self) -> &[RecordedComment] {
        &self.comments
    }

    fn require_node(&self, node: NodeId) -> Result<(), BackendError> {
        if self.nodes.contains_key(&node) || self.functions.contains_key(&node) {
            Ok(())
        } else {
            Err(BackendError::UnknownNode(node))
        }
    }
}

impl GraphBackend for RecordingBackend {
    fn create_node(&mut self, archetype: &str, position: Point) -> Result<NodeId, BackendError> {
        self.calls += 1;
        if archetype.is_empty() {
            return Err(BackendError::InvalidArchetype(archetype.to_string()));
        }
        let id = NodeId::new();
        self.nodes.insert(
            id,
            RecordedNode {
                archetype: archetype.to_string(),
                position,
            },
        );
        Ok(id)
    }

    fn create_function(&mut self, name: &str, mutable: bool) -> Result<NodeId, BackendError> {
        self.calls += 1;
        let id = NodeId::new();
        self.functions.insert(
            id,
            RecordedFunction {
                name: name.to_string(),
                mutable,
                exposed_pins: Vec::new(),
            },
        );
        Ok(id)
    }

    fn add_exposed_pin(
        &mut self,
        function: NodeId,
        name: &str,
        direction: PinDirection,
        type_name: &str,
        is_array: bool,
    ) -> Result<(), BackendError> {
        self.calls += 1;
        let entry = self
            .functions
            .get_mut(&function)
            .ok_or(BackendError::UnknownNode(function))?;
        entry
            .exposed_pins
            .push((name.to_string(), direction, type_name.to_string(), is_array));
        Ok(())
    }

    fn declare_local_variable(
        &mut self,
        scope: NodeId,
        name: &str,
        type_name: &str,
        is_array: bool,
    ) -> Result<(), BackendError> {
        self.calls += 1;
        self.require_node(scope)?;
        self.local_variables
            .push((scope, name.to_string(), type_name.to_string(), is_array));
        Ok(())
    }

    fn declare_member_variable(
        &mut self,
        name: &str,
        type_name: &str,
        is_array: bool,
    ) -> Result<(), BackendError> {
        self.calls += 1;
        self.member_variables
            .insert(name.to_string(), (type_name.to_string(), is_array));
        Ok(())
    }

    fn set_pin_default(&mut self, pin: &PinPath, literal: &str) -> Result<(), BackendError> {
        self.calls += 1;
        self.defaults.insert(pin.clone(), literal.to_string());
        Ok(())
    }

    fn add_link(&mut self, source: &PinPath, target: &PinPath) -> Result<(), BackendError> {
        self.calls += 1;
        self.links.push((source.clone(), target.clone()));
        Ok(())
    }

    fn resolve_wildcard_pin(
        &mut self,
        pin: &PinPath,
        type_name: &str,
    ) -> Result<(), BackendError> {
        self.calls += 1;
        self.resolved.insert(pin.clone(), type_name.to_string());
        Ok(())
    }

    fn set_pin_expanded(&mut self, pin: &PinPath, expanded: bool) -> Result<(), BackendError> {
        self.calls += 1;
        if expanded {
            if !self.expanded.contains(pin) {
                self.expanded.push(pin.clone());
            }
        } else {
            self.expanded.retain(|p| p != pin);
        }
        Ok(())
    }

    fn set_array_pin_size(&mut self, pin: &PinPath, len: usize) -> Result<(), BackendError> {
        self.calls += 1;
        self.array_sizes.insert(pin.clone(), len);
        Ok(())
    }

    fn set_node_position(&mut self, node: NodeId, position: Point) -> Result<(), BackendError> {
        self.calls += 1;
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.position = position;
            return Ok(());
        }
        if self.functions.contains_key(&node) {
            // Functions keep no position; accept the call for the
            // return-node placement convention.
            return Ok(());
        }
        Err(BackendError::UnknownNode(node))
    }

    fn add_comment_node(
        &mut self,
        text: &str,
        top_left: Point,
        size: Size,
        color: [u8; 3],
    ) -> Result<NodeId, BackendError> {
        self.calls += 1;
        self.comments.push(RecordedComment {
            text: text.to_string(),
            top_left,
            size,
            color,
        });
        Ok(NodeId::new())
    }

    fn add_array_aggregate_pin(&mut self, node: NodeId) -> Result<String, BackendError> {
        self.calls += 1;
        self.require_node(node)?;
        let count = self.aggregate_counts.entry(node).or_insert(0);
        // Plugs A and B are fixed on the archetype; aggregates continue
        // the alphabet from C.
        let offset = u8::try_from(*count)
            .ok()
            .filter(|c| *c <= b'Z' - b'C')
            .ok_or_else(|| BackendError::Rejected("aggregate pin alphabet exhausted".into()))?;
        *count += 1;
        Ok(char::from(b'C' + offset).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_nodes_links_and_defaults() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_node("Math.Add", Point::new(0.0, 0.0)).unwrap();
        let b = backend.create_node("Math.Multiply", Point::new(10.0, 0.0)).unwrap();

        let result = PinPath::root(a, "Result");
        let input = PinPath::root(b, "A");
        backend.add_link(&result, &input).unwrap();
        backend.set_pin_default(&PinPath::root(b, "B"), "2.000000").unwrap();

        assert_eq!(backend.node_count(), 2);
        assert!(backend.has_link(&result, &input));
        assert_eq!(backend.default_of(&PinPath::root(b, "B")), Some("2.000000"));
        assert_eq!(backend.call_count(), 4);
    }

    #[test]
    fn empty_archetype_is_rejected() {
        let mut backend = RecordingBackend::new();
        assert!(matches!(
            backend.create_node("", Point::ZERO),
            Err(BackendError::InvalidArchetype(_))
        ));
    }

    #[test]
    fn aggregate_pins_continue_the_alphabet() {
        let mut backend = RecordingBackend::new();
        let node = backend.create_node("Core.Sequence", Point::ZERO).unwrap();
        assert_eq!(backend.add_array_aggregate_pin(node).unwrap(), "C");
        assert_eq!(backend.add_array_aggregate_pin(node).unwrap(), "D");
    }

    #[test]
    fn aggregate_pin_alphabet_is_bounded() {
        let mut backend = RecordingBackend::new();
        let node = backend.create_node("Core.Sequence", Point::ZERO).unwrap();
        for letter in b'C'..=b'Z' {
            assert_eq!(
                backend.add_array_aggregate_pin(node).unwrap(),
                char::from(letter).to_string()
            );
        }
        // Exhaustion rejects cleanly instead of producing a non-letter.
        assert!(matches!(
            backend.add_array_aggregate_pin(node),
            Err(BackendError::Rejected(_))
        ));
        assert!(matches!(
            backend.add_array_aggregate_pin(node),
            Err(BackendError::Rejected(_))
        ));
    }

    #[test]
    fn unknown_node_is_rejected() {
        let mut backend = RecordingBackend::new();
        let err = backend.set_node_position(NodeId::new(), Point::ZERO);
        assert!(matches!(err, Err(BackendError::UnknownNode(_))));
    }
}
