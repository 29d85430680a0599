// SPDX-License-Identifier: MIT OR Apache-2.0
//! Textual default-value grammar.
//!
//! Default values cross the backend boundary as text. The grammar is
//! bit-exact: booleans render as `true`/`false`, integers as plain
//! decimal, floats with six fixed decimals, 3-vectors as
//! `(X=<f>,Y=<f>,Z=<f>)`, item keys as `(Type=<Enum>,Name="<name>")` and
//! arrays as a parenthesized comma list of the element grammar. Any
//! backend must accept exactly these forms.

use crate::pin::ItemKey;
use serde::{Deserialize, Serialize};

/// A literal value renderable in the default-value grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Double-precision float
    Float(f64),
    /// String (quoted in composite forms)
    Str(String),
    /// 3D vector
    Vector([f64; 3]),
    /// Rig element key
    Item(ItemKey),
    /// Homogeneous array
    Array(Vec<Literal>),
}

impl Literal {
    /// Render this literal in the grammar.
    pub fn text(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => format!("{value:.6}"),
            Self::Str(value) => format!("\"{value}\""),
            Self::Vector([x, y, z]) => {
                format!("(X={x:.6},Y={y:.6},Z={z:.6})")
            }
            Self::Item(key) => {
                format!("(Type={},Name=\"{}\")", key.item_type.literal(), key.name)
            }
            Self::Array(elements) => {
                let inner: Vec<String> = elements.iter().map(Literal::text).collect();
                format!("({})", inner.join(","))
            }
        }
    }
}

/// Parse a 3-vector rendered by [`Literal::Vector`].
///
/// Reference decoder for the grammar; hosts keep their own parsers, this
/// one exists so round-trips can be checked without a host.
pub fn parse_vector(text: &str) -> Option<[f64; 3]> {
    let body = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut components = [0.0_f64; 3];
    let mut seen = 0;
    for (part, axis) in body.split(',').zip(["X", "Y", "Z"]) {
        let value = part.strip_prefix(axis)?.strip_prefix('=')?;
        components[seen] = value.parse().ok()?;
        seen += 1;
    }
    (seen == 3).then_some(components)
}

/// Parse an item key rendered by [`Literal::Item`].
pub fn parse_item_key(text: &str) -> Option<(String, String)> {
    let body = text.strip_prefix('(')?.strip_suffix(')')?;
    let (type_part, name_part) = body.split_once(',')?;
    let item_type = type_part.strip_prefix("Type=")?;
    let name = name_part
        .strip_prefix("Name=\"")?
        .strip_suffix('"')?;
    Some((item_type.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::ItemType;

    #[test]
    fn scalar_text() {
        assert_eq!(Literal::Bool(true).text(), "true");
        assert_eq!(Literal::Bool(false).text(), "false");
        assert_eq!(Literal::Int(-7).text(), "-7");
        assert_eq!(Literal::Float(1.5).text(), "1.500000");
        assert_eq!(Literal::Str("spine".into()).text(), "\"spine\"");
    }

    #[test]
    fn vector_round_trip() {
        let original = [1.0, 2.5, -3.0];
        let text = Literal::Vector(original).text();
        assert_eq!(text, "(X=1.000000,Y=2.500000,Z=-3.000000)");

        let decoded = parse_vector(&text).unwrap();
        for (a, b) in decoded.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn item_key_round_trip() {
        let key = ItemKey::new(ItemType::Bone, "spine_01");
        let text = Literal::Item(key).text();
        assert_eq!(text, "(Type=Bone,Name=\"spine_01\")");

        let (item_type, name) = parse_item_key(&text).unwrap();
        assert_eq!(item_type, "Bone");
        assert_eq!(name, "spine_01");
    }

    #[test]
    fn array_text_is_comma_list_of_elements() {
        let array = Literal::Array(vec![
            Literal::Item(ItemKey::bone("a")),
            Literal::Item(ItemKey::bone("b")),
        ]);
        assert_eq!(
            array.text(),
            "((Type=Bone,Name=\"a\"),(Type=Bone,Name=\"b\"))"
        );
    }

    #[test]
    fn malformed_vector_is_rejected() {
        assert!(parse_vector("(X=1.0,Y=2.0)").is_none());
        assert!(parse_vector("X=1.0,Y=2.0,Z=3.0").is_none());
        assert!(parse_vector("(A=1.0,B=2.0,C=3.0)").is_none());
    }
}
