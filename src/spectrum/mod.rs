//! Spectrum rows shared between the analysis worker and the renderer.
//!
//! The worker maps each spectral frame through the active [`ScaleMap`] and appends it to
//! the [`VertexHistory`]; the render thread snapshots the history once per frame.

mod history;
mod scale;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use parking_lot::{Mutex, MutexGuard};
use rustfft::num_complex::Complex32;

use crate::error::Result;

pub use history::{HistoryLayout, VertexHistory};
pub use scale::ScaleMap;

/// One displayed spectrum point (mapped bin as x/y)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }
}

/// State behind the shared lock
#[derive(Debug)]
pub struct SpectrumState {
    pub history: VertexHistory,
    pub scale: ScaleMap,
}

/// Handle to the history and active scale, cloned into each thread
#[derive(Debug, Clone)]
pub struct SharedSpectrum {
    inner: Arc<Mutex<SpectrumState>>,
}

impl SharedSpectrum {
    pub fn new(layout: HistoryLayout, scale: ScaleMap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SpectrumState {
                history: VertexHistory::new(layout),
                scale,
            })),
        }
    }

    pub fn layout(&self) -> HistoryLayout {
        self.inner.lock().history.layout()
    }

    pub fn scale(&self) -> ScaleMap {
        self.inner.lock().scale
    }

    /// Switch the scale map; rows already in the history keep their old mapping
    pub fn set_scale(&self, scale: ScaleMap) {
        self.inner.lock().scale = scale;
    }

    /// Lock for reading the history (render thread)
    pub fn lock(&self) -> MutexGuard<'_, SpectrumState> {
        self.inner.lock()
    }

    /// Map one spectral frame and append it as the newest row
    ///
    /// Mapping happens into `row` outside the lock; only the row copy is done while holding it.
    pub fn publish(&self, bins: &[Complex32], row: &mut [Vertex]) -> Result<()> {
        let scale = self.scale();
        scale.map_row(bins, row);
        self.inner.lock().history.push_row(row)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_uses_current_scale() {
        let layout = HistoryLayout { rows: 2, row_len: 2 };
        let shared = SharedSpectrum::new(layout, ScaleMap::Identity);
        let bins = [Complex32::new(0.3, -0.4), Complex32::new(0.0, 0.0)];
        let mut row = vec![Vertex::default(); 2];

        shared.publish(&bins, &mut row).unwrap();
        shared.set_scale(ScaleMap::Exponential);
        shared.publish(&bins, &mut row).unwrap();

        let state = shared.lock();
        let rows: Vec<&[Vertex]> = state.history.rows().collect();
        assert_eq!(rows[0][0], Vertex::new(0.3, -0.4));
        assert!(rows[1][0].position[0] > 0.3);
        assert_eq!(state.history.row_count(), 2);
    }

    #[test]
    fn test_publish_rejects_wrong_bin_count() {
        let layout = HistoryLayout { rows: 2, row_len: 3 };
        let shared = SharedSpectrum::new(layout, ScaleMap::Identity);
        let bins = [Complex32::new(1.0, 0.0); 4];
        let mut row = vec![Vertex::default(); 4];

        assert!(shared.publish(&bins, &mut row).is_err());
        assert_eq!(shared.lock().history.row_count(), 0);
    }
}
