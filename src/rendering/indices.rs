//! Index lists for each visual style over the rows × bins history grid.

use crate::params::VisualStyle;
use crate::spectrum::HistoryLayout;

/// Indices drawing the history grid in `style`
///
/// Vertex `row * row_len + bin` is bin `bin` of display row `row`, oldest row first.
/// The circle and spiral styles reuse that numbering; only the shader places the
/// vertices differently.
pub fn generate(style: VisualStyle, layout: HistoryLayout) -> Vec<u32> {
    let HistoryLayout { rows, row_len } = layout;
    let mut indices = Vec::with_capacity(index_count(style, layout));

    match style {
        VisualStyle::Surface => {
            for row in 0..rows.saturating_sub(1) {
                for bin in 0..row_len.saturating_sub(1) {
                    let corner = (row * row_len + bin) as u32;
                    let below = corner + row_len as u32;
                    indices.extend_from_slice(&[
                        corner,
                        below,
                        below + 1,
                        corner,
                        below + 1,
                        corner + 1,
                    ]);
                }
            }
        }
        VisualStyle::Lines => {
            for row in 0..rows {
                for bin in 0..row_len.saturating_sub(1) {
                    let start = (row * row_len + bin) as u32;
                    indices.extend_from_slice(&[start, start + 1]);
                }
            }
        }
        VisualStyle::Points => indices.extend(0..layout.points() as u32),
        VisualStyle::Circle => {
            // Fan over the oldest ring fills the centre
            for bin in 1..row_len.saturating_sub(1) {
                let bin = bin as u32;
                indices.extend_from_slice(&[0, bin, bin + 1]);
            }
            if row_len >= 2 {
                for row in 0..rows.saturating_sub(1) {
                    let ring = row * row_len;
                    for bin in 0..row_len {
                        let here = (ring + bin) as u32;
                        let next = (ring + (bin + 1) % row_len) as u32;
                        let outer = row_len as u32;
                        indices.extend_from_slice(&[
                            here,
                            here + outer,
                            next + outer,
                            here,
                            next,
                            next + outer,
                        ]);
                    }
                }
            }
        }
        VisualStyle::Spiral => {
            // Consecutive vertex pairs are the two edges of the ribbon
            for pair in 0..(layout.points() / 2).saturating_sub(1) {
                let v = (2 * pair) as u32;
                indices.extend_from_slice(&[v, v + 1, v + 3, v, v + 3, v + 2]);
            }
        }
    }

    indices
}

/// Number of indices `generate` produces
pub fn index_count(style: VisualStyle, layout: HistoryLayout) -> usize {
    let HistoryLayout { rows, row_len } = layout;
    match style {
        VisualStyle::Surface => 6 * rows.saturating_sub(1) * row_len.saturating_sub(1),
        VisualStyle::Lines => 2 * rows * row_len.saturating_sub(1),
        VisualStyle::Points => rows * row_len,
        VisualStyle::Circle => {
            let rings = if row_len >= 2 {
                6 * row_len * rows.saturating_sub(1)
            } else {
                0
            };
            3 * row_len.saturating_sub(2) + rings
        }
        VisualStyle::Spiral => 6 * (layout.points() / 2).saturating_sub(1),
    }
}

/// Largest index list over all styles (index buffer size)
pub fn max_index_count(layout: HistoryLayout) -> usize {
    VisualStyle::ALL
        .into_iter()
        .map(|style| index_count(style, layout))
        .max()
        .unwrap_or(0)
}
