//! Fixed-capacity history of mapped spectrum rows.

use crate::error::ProtocolViolation;

use super::Vertex;

/// Shape of the history: `rows` rows of `row_len` points each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLayout {
    pub rows: usize,
    pub row_len: usize,
}

impl HistoryLayout {
    /// Total point count (rows × row length)
    pub fn points(&self) -> usize {
        self.rows * self.row_len
    }
}

/// Circular buffer of the H most recent rows
///
/// Storage is H row slots that start zero-filled. `push_row` overwrites the oldest slot,
/// so a push costs one row copy. Readers see the slots oldest-to-newest through
/// [`VertexHistory::as_slices`]; unfilled slots read as zero rows ahead of the real ones,
/// and the newest row is always last.
#[derive(Debug, Clone)]
pub struct VertexHistory {
    points: Vec<Vertex>,
    layout: HistoryLayout,
    /// Slot holding the oldest row
    oldest: usize,
    filled: usize,
}

impl VertexHistory {
    pub fn new(layout: HistoryLayout) -> Self {
        debug_assert!(layout.rows > 0 && layout.row_len > 0);
        Self {
            points: vec![Vertex::default(); layout.points()],
            layout,
            oldest: 0,
            filled: 0,
        }
    }

    pub fn layout(&self) -> HistoryLayout {
        self.layout
    }

    /// Rows pushed so far, capped at capacity
    pub fn row_count(&self) -> usize {
        self.filled
    }

    /// Total points in the flattened layout (always rows × row length)
    pub fn len_points(&self) -> usize {
        self.points.len()
    }

    /// Append the newest row, evicting the oldest one at capacity
    ///
    /// A row of the wrong length is rejected and the history is left untouched.
    pub fn push_row(&mut self, row: &[Vertex]) -> Result<(), ProtocolViolation> {
        let row_len = self.layout.row_len;
        if row.len() != row_len {
            return Err(ProtocolViolation::RowLength {
                expected: row_len,
                actual: row.len(),
            });
        }

        let start = self.oldest * row_len;
        self.points[start..start + row_len].copy_from_slice(row);
        self.oldest = (self.oldest + 1) % self.layout.rows;
        self.filled = (self.filled + 1).min(self.layout.rows);
        Ok(())
    }

    /// The flattened history as two contiguous runs, oldest-to-newest
    ///
    /// Concatenating the first and second slice yields rows in display order, so point
    /// `(frame_index, bin_index)` sits at `frame_index * row_len + bin_index`.
    pub fn as_slices(&self) -> (&[Vertex], &[Vertex]) {
        let split = self.oldest * self.layout.row_len;
        (&self.points[split..], &self.points[..split])
    }

    /// Row at `index` in display order (0 = oldest slot, rows - 1 = newest)
    pub fn row(&self, index: usize) -> Option<&[Vertex]> {
        if index >= self.layout.rows {
            return None;
        }
        let slot = (self.oldest + index) % self.layout.rows;
        let start = slot * self.layout.row_len;
        Some(&self.points[start..start + self.layout.row_len])
    }

    /// Rows actually pushed, oldest first
    pub fn rows(&self) -> impl Iterator<Item = &[Vertex]> + '_ {
        let first = self.layout.rows - self.filled;
        (first..self.layout.rows).filter_map(move |index| self.row(index))
    }
}
