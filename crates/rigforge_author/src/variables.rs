// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable declarations and the pin-type name table.

use crate::error::{AuthorError, Result};
use indexmap::IndexMap;
use rigforge_graph::PinType;
use serde::{Deserialize, Serialize};

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableScope {
    /// Dies with its owning function scope
    Local,
    /// Lives for the whole graph session
    Member,
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Element type
    pub pin_type: PinType,
    /// Whether the variable is an array of `pin_type`
    pub is_array: bool,
    /// Local or member
    pub scope: VariableScope,
}

/// Maps abstract pin types to the backend's native type-name strings.
///
/// Ships with the fixed mapping for the closed union; host-specific
/// aggregate types register overrides by their [`PinType::Custom`] tag.
#[derive(Debug, Clone, Default)]
pub struct TypeNameTable {
    overrides: IndexMap<PinType, String>,
}

impl TypeNameTable {
    /// Table with the default mapping only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the native name for a type.
    pub fn register(&mut self, pin_type: PinType, native_name: impl Into<String>) {
        self.overrides.insert(pin_type, native_name.into());
    }

    /// The backend type name for a pin type.
    ///
    /// Wildcards have no native name; asking for one is a type
    /// resolution bug in the caller.
    pub fn name_of(&self, pin_type: &PinType) -> Result<String> {
        if let Some(name) = self.overrides.get(pin_type) {
            return Ok(name.clone());
        }
        let name = match pin_type {
            PinType::Int => "Int32".to_string(),
            PinType::Double => "Double".to_string(),
            PinType::Bool => "Bool".to_string(),
            PinType::Vector => "Vector3".to_string(),
            PinType::Transform => "Transform".to_string(),
            PinType::ItemKey => "ItemKey".to_string(),
            PinType::String => "String".to_string(),
            PinType::Array(inner) => format!("Array<{}>", self.name_of(inner)?),
            PinType::Custom(tag) => tag.clone(),
            PinType::Wildcard => return Err(AuthorError::UnresolvedTypeName),
        };
        Ok(name)
    }
}
