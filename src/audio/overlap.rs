//! Overlapping analysis windows cut from a stream of mono samples.

use crate::params::SpectrumConfig;

/// Ring of recent samples that yields a window every `hop` new samples
///
/// The ring holds ⌈L·(1 + r)⌉ samples and starts zero-filled, so the first window
/// already has full length. `push` never allocates; it runs on the capture callback.
#[derive(Debug, Clone)]
pub struct OverlapBuffer {
    ring: Vec<f32>,
    window_len: usize,
    hop: usize,
    /// Next write position in `ring`
    write: usize,
    /// Samples pushed since the last extraction
    fresh: usize,
}

impl OverlapBuffer {
    pub fn new(config: &SpectrumConfig) -> Self {
        Self::with_overlap(config.window_size, config.overlap)
    }

    /// Buffer for windows of `window_len` samples sharing `overlap` of their length
    pub fn with_overlap(window_len: usize, overlap: f32) -> Self {
        let overlap = crate::params::clamp_overlap(overlap);
        let hop = crate::params::hop_for(window_len, overlap);
        let capacity =
            ((window_len as f64 * (1.0 + f64::from(overlap))).ceil() as usize).max(window_len);
        Self {
            ring: vec![0.0; capacity.max(1)],
            window_len,
            hop,
            write: 0,
            fresh: 0,
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// New samples still needed before the next window is ready
    pub fn samples_until_window(&self) -> usize {
        self.hop.saturating_sub(self.fresh)
    }

    /// Append samples, overwriting the oldest ones
    ///
    /// Only the last `capacity()` samples of a longer block are kept.
    pub fn push(&mut self, samples: &[f32]) {
        let capacity = self.ring.len();
        self.fresh = self.fresh.saturating_add(samples.len());

        let kept = &samples[samples.len().saturating_sub(capacity)..];
        let first = (capacity - self.write).min(kept.len());
        self.ring[self.write..self.write + first].copy_from_slice(&kept[..first]);
        let wrapped = kept.len() - first;
        self.ring[..wrapped].copy_from_slice(&kept[first..]);

        self.write = (self.write + kept.len()) % capacity;
    }

    /// Most recent L samples, once at least `hop` new samples arrived
    ///
    /// Extraction consumes the new-sample count, so a burst of samples larger than one
    /// hop still yields a single window here; use [`OverlapBuffer::feed`] to get one
    /// window per completed hop.
    pub fn try_extract_window(&mut self) -> Option<Window<'_>> {
        if self.fresh < self.hop {
            return None;
        }
        self.fresh = 0;

        let capacity = self.ring.len();
        let start = (self.write + capacity - self.window_len) % capacity;
        let (head, tail) = if start < self.write {
            (&self.ring[start..self.write], &self.ring[..0])
        } else {
            (&self.ring[start..], &self.ring[..self.write])
        };
        Some(Window { head, tail })
    }

    /// Push a block split at window boundaries, handing every completed window to `sink`
    pub fn feed<F>(&mut self, block: &[f32], mut sink: F)
    where
        F: FnMut(Window<'_>),
    {
        let mut rest = block;
        loop {
            if let Some(window) = self.try_extract_window() {
                sink(window);
            }
            if rest.is_empty() {
                break;
            }
            let take = self.samples_until_window().min(rest.len());
            let (now, later) = rest.split_at(take);
            self.push(now);
            rest = later;
        }
    }
}

/// Borrowed analysis window, possibly split across the ring's wrap point
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    head: &'a [f32],
    tail: &'a [f32],
}

impl<'a> Window<'a> {
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.head.iter().chain(self.tail).copied()
    }

    /// Copy into `out`, which must be exactly `len()` long
    pub fn copy_to(&self, out: &mut [f32]) {
        let (first, second) = out.split_at_mut(self.head.len());
        first.copy_from_slice(self.head);
        second.copy_from_slice(self.tail);
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }
}
