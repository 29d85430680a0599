// SPDX-License-Identifier: MIT OR Apache-2.0
//! Comment-box accumulation.
//!
//! A comment box is opened by name, collects the corners of every node
//! created while it is open, and closes to the min/max bounding
//! rectangle of those corners. Boxes are owned by one scope frame and
//! cannot outlive it.

use crate::error::{AuthorError, Result};
use indexmap::IndexMap;
use rigforge_graph::{Point, Size};

/// Padding added around a closed box before the annotation is emitted.
pub const COMMENT_BORDER: f32 = 30.0;

/// Un-padded bounds of a closed comment box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommentBounds {
    /// Top-left corner
    pub top_left: Point,
    /// Extent
    pub size: Size,
}

impl CommentBounds {
    /// The same bounds grown by `border` on every side.
    pub fn padded(&self, border: f32) -> Self {
        Self {
            top_left: Point::new(self.top_left.x - border, self.top_left.y - border),
            size: Size::new(self.size.x + border * 2.0, self.size.y + border * 2.0),
        }
    }
}

/// Tracks open comment boxes for one scope frame.
#[derive(Debug, Default)]
pub struct CommentBoxTracker {
    boxes: IndexMap<String, Vec<Point>>,
}

impl CommentBoxTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accumulating under `name`.
    pub fn open(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.boxes.contains_key(&name) {
            return Err(AuthorError::DuplicateDeclaration(format!(
                "comment box '{name}' is already open"
            )));
        }
        self.boxes.insert(name, Vec::new());
        Ok(())
    }

    /// Record a node's extent in every open box.
    pub fn track(&mut self, position: Point, size: Size) {
        let bottom_right = Point::new(position.x + size.x, position.y + size.y);
        for points in self.boxes.values_mut() {
            points.push(position);
            points.push(bottom_right);
        }
    }

    /// Close `name` and return its un-padded bounds.
    ///
    /// An empty box closes to a zero-extent rectangle at the origin.
    pub fn close(&mut self, name: &str) -> Result<CommentBounds> {
        let points = self
            .boxes
            .shift_remove(name)
            .ok_or_else(|| AuthorError::UnknownCommentBox(name.to_string()))?;

        let mut min = Point::new(f32::MAX, f32::MAX);
        let mut max = Point::new(f32::MIN, f32::MIN);
        for point in &points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        if points.is_empty() {
            min = Point::ZERO;
            max = Point::ZERO;
        }

        Ok(CommentBounds {
            top_left: min,
            size: Size::new(max.x - min.x, max.y - min.y),
        })
    }

    /// Names of the boxes still open.
    pub fn open_names(&self) -> impl Iterator<Item = &str> {
        self.boxes.keys().map(String::as_str)
    }

    /// Whether no boxes remain open.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_tracked_nodes() {
        let mut tracker = CommentBoxTracker::new();
        tracker.open("spine").unwrap();
        tracker.track(Point::new(0.0, 0.0), Size::new(50.0, 50.0));
        tracker.track(Point::new(100.0, 50.0), Size::new(50.0, 50.0));
        tracker.track(Point::new(200.0, -20.0), Size::new(30.0, 30.0));

        let bounds = tracker.close("spine").unwrap();
        assert_eq!(bounds.top_left, Point::new(0.0, -20.0));
        assert_eq!(bounds.size, Size::new(230.0, 120.0));
    }

    #[test]
    fn nested_boxes_both_collect() {
        let mut tracker = CommentBoxTracker::new();
        tracker.open("outer").unwrap();
        tracker.track(Point::new(0.0, 0.0), Size::new(10.0, 10.0));
        tracker.open("inner").unwrap();
        tracker.track(Point::new(100.0, 100.0), Size::new(10.0, 10.0));

        let inner = tracker.close("inner").unwrap();
        assert_eq!(inner.top_left, Point::new(100.0, 100.0));

        let outer = tracker.close("outer").unwrap();
        assert_eq!(outer.top_left, Point::new(0.0, 0.0));
        assert_eq!(outer.size, Size::new(110.0, 110.0));
    }

    #[test]
    fn duplicate_open_is_rejected() {
        let mut tracker = CommentBoxTracker::new();
        tracker.open("box").unwrap();
        assert!(matches!(
            tracker.open("box"),
            Err(AuthorError::DuplicateDeclaration(_))
        ));
    }

    #[test]
    fn closing_unopened_box_is_rejected() {
        let mut tracker = CommentBoxTracker::new();
        assert!(matches!(
            tracker.close("missing"),
            Err(AuthorError::UnknownCommentBox(_))
        ));
    }

    #[test]
    fn padding_grows_every_side() {
        let bounds = CommentBounds {
            top_left: Point::new(10.0, 20.0),
            size: Size::new(100.0, 50.0),
        };
        let padded = bounds.padded(30.0);
        assert_eq!(padded.top_left, Point::new(-20.0, -10.0));
        assert_eq!(padded.size, Size::new(160.0, 110.0));
    }
}
