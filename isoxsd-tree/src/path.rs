//! Traversal path tracking.

use crate::error::{Result, TreeError};

/// Depth ceiling for schema traversals. A path never reaches this many
/// segments.
pub const MAX_DEPTH: usize = 64;

/// Current traversal path as an ordered list of element names.
///
/// A tracker belongs to exactly one top-level traversal; every top-level
/// element starts from a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTracker {
    segments: Vec<String>,
}

impl PathTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a segment.
    ///
    /// # Errors
    /// Returns `TreeError::DepthExceeded` without modifying the path if the
    /// new segment would bring the depth to [`MAX_DEPTH`].
    pub fn push(&mut self, segment: impl Into<String>) -> Result<()> {
        let segment = segment.into();
        if self.segments.len() + 1 >= MAX_DEPTH {
            let path = if self.segments.is_empty() {
                segment
            } else {
                format!("{}/{segment}", self.current_path())
            };
            return Err(TreeError::DepthExceeded {
                depth: MAX_DEPTH,
                path,
            });
        }
        self.segments.push(segment);
        Ok(())
    }

    /// Removes and returns the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// Returns the segments joined with `/`.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.segments.join("/")
    }

    /// Returns the segments joined with `_`.
    #[must_use]
    pub fn current_id(&self) -> String {
        self.segments.join("_")
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}
