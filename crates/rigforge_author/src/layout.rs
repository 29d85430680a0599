// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic node placement.
//!
//! Placement is a pure function of call order: nodes stack downward in
//! the current column, `set_new_column` moves the *next* node right, and
//! fan-out plugs rebase below everything placed so far. Reproducible
//! layout is part of the construction contract.

use rigforge_graph::{Point, Size};
use serde::{Deserialize, Serialize};

/// Default vertical/horizontal gap between nodes.
pub const DEFAULT_GAP: f32 = 60.0;

/// Extra Y offset for data nodes at the top of a fresh column, keeping
/// them below the execute chain.
pub const DATA_ROW_OFFSET: f32 = 100.0;

/// Vertical padding between fan-out branches.
pub const PLUG_PADDING: f32 = 60.0;

/// Accumulated column/row placement state for one scope frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutState {
    current_x: f32,
    current_y: f32,
    last_node_size: Size,
    top_y: f32,
    max_height: f32,
    next_is_new_column: bool,
    column_gap_factor: f32,
    gap: f32,
}

impl LayoutState {
    /// Fresh layout state anchored at `origin`.
    ///
    /// The new-column flag starts armed with factor 0 and a zero last
    /// size, so the first node lands exactly at the origin.
    pub fn new(origin: Point) -> Self {
        Self {
            current_x: origin.x,
            current_y: origin.y,
            last_node_size: Size::ZERO,
            top_y: origin.y,
            max_height: origin.y,
            next_is_new_column: true,
            column_gap_factor: 0.0,
            gap: DEFAULT_GAP,
        }
    }

    /// Compute the position for the next node of `node_size`.
    ///
    /// Execute nodes start fresh columns at the column top; data nodes
    /// start [`DATA_ROW_OFFSET`] lower. Within a column, nodes stack
    /// downward by the previous node's height plus the gap.
    pub fn next_position(&mut self, node_size: Size, is_execute_node: bool) -> Point {
        if self.next_is_new_column {
            self.current_x += self.last_node_size.x + self.gap * self.column_gap_factor;
            self.current_y = if is_execute_node {
                self.top_y
            } else {
                self.top_y + DATA_ROW_OFFSET
            };
            self.next_is_new_column = false;
        } else {
            self.current_y += self.last_node_size.y + self.gap;
        }

        let position = Point::new(self.current_x, self.current_y);
        self.max_height = self.max_height.max(self.current_y + node_size.y);
        self.last_node_size = node_size;
        position
    }

    /// Arm a new column for the next placement. Never moves anything
    /// immediately; X only ever grows.
    pub fn set_new_column(&mut self, gap_factor: f32) {
        self.next_is_new_column = true;
        self.column_gap_factor = gap_factor;
    }

    /// Rebase placement for a fan-out branch: the column top drops below
    /// the tallest node seen so far and X returns to the fan-out column
    /// origin, so parallel branches never overlap.
    pub fn start_branch_column(&mut self, column_x: f32, padding: f32) {
        self.top_y = self.max_height + padding;
        self.current_y = self.top_y;
        self.current_x = column_x;
        self.last_node_size = Size::ZERO;
        self.next_is_new_column = true;
        self.column_gap_factor = 0.0;
    }

    /// The lowest extent (largest Y) of any node placed so far.
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Current column X.
    pub fn current_x(&self) -> f32 {
        self.current_x
    }

    /// The gap between stacked nodes.
    pub fn gap(&self) -> f32 {
        self.gap
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new(Point::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_node_lands_at_origin() {
        let mut layout = LayoutState::new(Point::ZERO);
        let position = layout.next_position(Size::new(200.0, 120.0), true);
        assert_eq!(position, Point::new(0.0, 0.0));
    }

    #[test]
    fn stacking_increases_y_by_height_plus_gap() {
        let mut layout = LayoutState::new(Point::ZERO);
        let size = Size::new(200.0, 120.0);
        let first = layout.next_position(size, true);
        let second = layout.next_position(size, true);
        let third = layout.next_position(size, true);

        assert_eq!(second.y, first.y + size.y + DEFAULT_GAP);
        assert_eq!(third.y, second.y + size.y + DEFAULT_GAP);
        assert_eq!(first.x, third.x);
    }

    #[test]
    fn new_column_moves_right_and_resets_y() {
        let mut layout = LayoutState::new(Point::ZERO);
        let size = Size::new(200.0, 120.0);
        layout.next_position(size, true);
        layout.next_position(size, true);

        layout.set_new_column(2.0);
        let execute = layout.next_position(size, true);
        assert_eq!(execute.x, size.x + DEFAULT_GAP * 2.0);
        assert_eq!(execute.y, 0.0);

        layout.set_new_column(1.0);
        let data = layout.next_position(size, false);
        assert!(data.x > execute.x);
        assert_eq!(data.y, DATA_ROW_OFFSET);
    }

    #[test]
    fn set_new_column_does_not_move_until_next_placement() {
        let mut layout = LayoutState::new(Point::ZERO);
        let size = Size::new(100.0, 100.0);
        let before = layout.next_position(size, true);
        layout.set_new_column(1.0);
        // No placement happened yet; state only carries the armed flag.
        let after = layout.next_position(size, true);
        assert_eq!(after.x, before.x + size.x + DEFAULT_GAP);
    }

    #[test]
    fn branch_column_rebases_below_max_height() {
        let mut layout = LayoutState::new(Point::ZERO);
        let size = Size::new(100.0, 200.0);
        layout.next_position(size, true);
        layout.next_position(size, true);
        let low_point = layout.max_height();

        layout.start_branch_column(40.0, PLUG_PADDING);
        let branch = layout.next_position(size, true);
        assert_eq!(branch.x, 40.0);
        assert_eq!(branch.y, low_point + PLUG_PADDING);
    }

    #[test]
    fn max_height_tracks_tallest_node() {
        let mut layout = LayoutState::new(Point::ZERO);
        let position = layout.next_position(Size::new(100.0, 300.0), true);
        assert_eq!(layout.max_height(), position.y + 300.0);
    }
}
