// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type-aware binding of values onto pin addresses.
//!
//! [`BindValue`] is a closed union: one variant per shape a caller can
//! hand to a node input, so dispatch is exhaustive instead of a runtime
//! fallback chain. Links become `add_link`, scalars become default-value
//! text, compounds recurse into named sub-pins, arrays resize then fill.

use crate::error::{AuthorError, Result};
use crate::variables::TypeNameTable;
use indexmap::IndexMap;
use rigforge_graph::{GraphBackend, ItemKey, Literal, PinPath, PinType};

/// Translation/rotation/scale triple bound component-wise onto a
/// Transform pin. Rotation is in euler degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformValue {
    /// Translation vector
    pub translation: [f64; 3],
    /// Rotation vector
    pub rotation: [f64; 3],
    /// Scale vector
    pub scale: [f64; 3],
}

impl Default for TransformValue {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl TransformValue {
    /// Transform with only a translation.
    pub fn from_translation(translation: [f64; 3]) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }
}

/// A value bindable onto a pin.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// Another pin; produces a link
    Pin(PinPath),
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    Str(String),
    /// 3-vector, bound component-wise
    Vector([f64; 3]),
    /// Transform, bound component-wise
    Transform(TransformValue),
    /// Rig element key, bound through Type/Name sub-pins
    Item(ItemKey),
    /// Array of values; the pin is resized first
    Array(Vec<BindValue>),
}

impl From<PinPath> for BindValue {
    fn from(pin: PinPath) -> Self {
        Self::Pin(pin)
    }
}

impl From<ItemKey> for BindValue {
    fn from(key: ItemKey) -> Self {
        Self::Item(key)
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for BindValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Binds values onto pins and owns the wildcard resolution map for one
/// graph session.
#[derive(Debug, Default)]
pub struct PinBinder {
    resolved: IndexMap<PinPath, PinType>,
}

impl PinBinder {
    /// Create an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a wildcard pin to a concrete type.
    ///
    /// Re-resolving to the same type is an idempotent no-op; a different
    /// type is an error. The backend is told on first resolution only.
    pub fn resolve<B: GraphBackend>(
        &mut self,
        backend: &mut B,
        table: &TypeNameTable,
        pin: &PinPath,
        pin_type: &PinType,
    ) -> Result<()> {
        if pin_type.is_wildcard() {
            return Err(AuthorError::TypeResolution {
                pin: pin.clone(),
                detail: "cannot resolve a wildcard to wildcard".to_string(),
            });
        }
        if let Some(existing) = self.resolved.get(pin) {
            if existing == pin_type {
                return Ok(());
            }
            return Err(AuthorError::TypeResolution {
                pin: pin.clone(),
                detail: format!("already resolved to {existing:?}, not {pin_type:?}"),
            });
        }
        backend.resolve_wildcard_pin(pin, &table.name_of(pin_type)?)?;
        self.resolved.insert(pin.clone(), pin_type.clone());
        Ok(())
    }

    /// The concrete type a pin was resolved to, if any.
    pub fn resolution_of(&self, pin: &PinPath) -> Option<&PinType> {
        self.resolved.get(pin)
    }

    /// Bind a value onto a pin declared as `declared_type`.
    pub fn bind<B: GraphBackend>(
        &mut self,
        backend: &mut B,
        value: &BindValue,
        pin: &PinPath,
        declared_type: &PinType,
    ) -> Result<()> {
        let pin_type = self.effective_type(pin, declared_type)?;

        match value {
            BindValue::Pin(source) => {
                backend.add_link(source, pin)?;
            }
            BindValue::Bool(flag) => {
                self.bind_scalar_text(backend, pin, &pin_type, Literal::Bool(*flag))?;
            }
            BindValue::Int(number) => {
                // Int literals flow into Double pins unchanged in value.
                let literal = match pin_type {
                    PinType::Double => Literal::Float(*number as f64),
                    _ => Literal::Int(*number),
                };
                self.bind_scalar_text(backend, pin, &pin_type, literal)?;
            }
            BindValue::Float(number) => {
                self.bind_scalar_text(backend, pin, &pin_type, Literal::Float(*number))?;
            }
            BindValue::Str(text) => {
                if pin_type != PinType::String {
                    return Err(type_mismatch(pin, "String", &pin_type));
                }
                // Top-level string defaults are raw; quoting belongs to
                // composite forms only.
                backend.set_pin_default(pin, text)?;
            }
            BindValue::Vector(components) => {
                if pin_type != PinType::Vector {
                    return Err(type_mismatch(pin, "Vector", &pin_type));
                }
                self.bind_vector(backend, pin, *components)?;
            }
            BindValue::Transform(transform) => {
                if pin_type != PinType::Transform {
                    return Err(type_mismatch(pin, "Transform", &pin_type));
                }
                self.bind_vector(backend, &pin.child("Translation"), transform.translation)?;
                self.bind_vector(backend, &pin.child("Rotation"), transform.rotation)?;
                self.bind_vector(backend, &pin.child("Scale"), transform.scale)?;
                backend.set_pin_expanded(pin, true)?;
            }
            BindValue::Item(key) => {
                if pin_type != PinType::ItemKey {
                    return Err(type_mismatch(pin, "ItemKey", &pin_type));
                }
                backend.set_pin_default(&pin.child("Type"), key.item_type.literal())?;
                backend.set_pin_default(&pin.child("Name"), &key.name)?;
                backend.set_pin_expanded(pin, true)?;
            }
            BindValue::Array(elements) => {
                let PinType::Array(element_type) = &pin_type else {
                    return Err(type_mismatch(pin, "Array", &pin_type));
                };
                let element_type = element_type.as_ref().clone();
                self.bind_array(backend, elements, pin, &element_type)?;
            }
        }
        Ok(())
    }

    /// Bind a value if present; absence is a no-op so callers may omit
    /// optional pins.
    pub fn bind_opt<B: GraphBackend>(
        &mut self,
        backend: &mut B,
        value: Option<&BindValue>,
        pin: &PinPath,
        declared_type: &PinType,
    ) -> Result<()> {
        match value {
            Some(value) => self.bind(backend, value, pin, declared_type),
            None => Ok(()),
        }
    }

    /// Bind array elements: resize the backend pin to the element count,
    /// then bind each element individually.
    pub fn bind_array<B: GraphBackend>(
        &mut self,
        backend: &mut B,
        elements: &[BindValue],
        pin: &PinPath,
        element_type: &PinType,
    ) -> Result<()> {
        backend.set_array_pin_size(pin, elements.len())?;
        for (index, element) in elements.iter().enumerate() {
            self.bind(backend, element, &pin.element(index), element_type)?;
        }
        Ok(())
    }

    /// Substitute a wildcard's recorded resolution, or fail if it has
    /// none yet.
    fn effective_type(&self, pin: &PinPath, declared_type: &PinType) -> Result<PinType> {
        if !declared_type.is_wildcard() {
            return Ok(declared_type.clone());
        }
        self.resolved
            .get(pin)
            .cloned()
            .ok_or_else(|| AuthorError::TypeResolution {
                pin: pin.clone(),
                detail: "binding an unresolved wildcard pin".to_string(),
            })
    }

    fn bind_scalar_text<B: GraphBackend>(
        &mut self,
        backend: &mut B,
        pin: &PinPath,
        pin_type: &PinType,
        literal: Literal,
    ) -> Result<()> {
        let compatible = matches!(
            (&literal, pin_type),
            (Literal::Bool(_), PinType::Bool)
                | (Literal::Int(_), PinType::Int)
                | (Literal::Float(_), PinType::Double)
        );
        if !compatible {
            return Err(AuthorError::TypeResolution {
                pin: pin.clone(),
                detail: format!("literal {literal:?} does not fit pin type {pin_type:?}"),
            });
        }
        backend.set_pin_default(pin, &literal.text())?;
        Ok(())
    }

    fn bind_vector<B: GraphBackend>(
        &mut self,
        backend: &mut B,
        pin: &PinPath,
        components: [f64; 3],
    ) -> Result<()> {
        for (axis, component) in ["X", "Y", "Z"].iter().zip(components) {
            backend.set_pin_default(&pin.child(*axis), &Literal::Float(component).text())?;
        }
        backend.set_pin_expanded(pin, true)?;
        Ok(())
    }
}

fn type_mismatch(pin: &PinPath, wanted: &str, got: &PinType) -> AuthorError {
    AuthorError::TypeResolution {
        pin: pin.clone(),
        detail: format!("{wanted} value bound to pin of type {got:?}"),
    }
}
