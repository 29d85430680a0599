// SPDX-License-Identifier: MIT OR Apache-2.0
//! 2-D geometry used for node placement.

use serde::{Deserialize, Serialize};

/// A position in graph space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A node extent in graph space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub x: f32,
    /// Height
    pub y: f32,
}

impl Size {
    /// A zero extent.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new size.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
