// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin addressing and the pin type union.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Address of a pin on a node.
///
/// Compound pins are addressed through dotted sub-path segments
/// (`Offset.Translation.X`); array elements carry an index on the final
/// segment (`Parents[2]`). Paths are handed out by node constructors and
/// only ever referenced, never mutated, after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinPath {
    /// The node the pin lives on.
    pub node: NodeId,
    /// Dotted sub-path segments, outermost first.
    pub segments: Vec<String>,
    /// Array index on the final segment, if any.
    pub index: Option<usize>,
}

impl PinPath {
    /// Address a top-level pin on a node.
    pub fn root(node: NodeId, name: impl Into<String>) -> Self {
        Self {
            node,
            segments: vec![name.into()],
            index: None,
        }
    }

    /// Address a sub-pin of this pin.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        if let Some(index) = self.index {
            // Fold the element index into its segment before descending.
            if let Some(last) = segments.last_mut() {
                *last = format!("{last}[{index}]");
            }
        }
        segments.push(name.into());
        Self {
            node: self.node,
            segments,
            index: None,
        }
    }

    /// Address one element of this array pin.
    pub fn element(&self, index: usize) -> Self {
        Self {
            node: self.node,
            segments: self.segments.clone(),
            index: Some(index),
        }
    }

    /// The final segment name, without any index suffix.
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }
}

impl std::fmt::Display for PinPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.node)?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        Ok(())
    }
}

/// Data type that can flow through a pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    /// Integer value
    Int,
    /// Double-precision float
    Double,
    /// Boolean value
    Bool,
    /// 3D vector
    Vector,
    /// Full transform (translation, rotation, scale)
    Transform,
    /// Reference to a rig element (bone, control, ...)
    ItemKey,
    /// String value
    String,
    /// Homogeneous array of another pin type
    Array(Box<PinType>),
    /// Host-specific aggregate type, identified by name
    Custom(String),
    /// Generic pin, untyped until resolved
    Wildcard,
}

impl PinType {
    /// Shorthand for an array of `inner`.
    pub fn array(inner: PinType) -> Self {
        Self::Array(Box::new(inner))
    }

    /// Whether this type is still generic.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

/// Kind of rig element an [`ItemKey`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    /// Skeleton bone
    Bone,
    /// Animation control
    Control,
    /// Null/locator element
    Null,
    /// Animation curve
    Curve,
}

impl ItemType {
    /// The enum literal used in the default-value grammar.
    pub fn literal(self) -> &'static str {
        match self {
            Self::Bone => "Bone",
            Self::Control => "Control",
            Self::Null => "Null",
            Self::Curve => "Curve",
        }
    }
}

/// A struct-like key identifying one rig element by kind and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    /// Element kind
    pub item_type: ItemType,
    /// Element name
    pub name: String,
}

impl ItemKey {
    /// Create a new item key.
    pub fn new(item_type: ItemType, name: impl Into<String>) -> Self {
        Self {
            item_type,
            name: name.into(),
        }
    }

    /// Key for a bone.
    pub fn bone(name: impl Into<String>) -> Self {
        Self::new(ItemType::Bone, name)
    }

    /// Key for a control.
    pub fn control(name: impl Into<String>) -> Self {
        Self::new(ItemType::Control, name)
    }
}
