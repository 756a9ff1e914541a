//! Window functions applied to analysis windows before the transform.

use std::f32::consts::PI;

use crate::params::WindowFunction;

/// Precomputed window coefficients for one window length
///
/// Built once per analyzer and read-only afterwards, so it can be shared freely.
#[derive(Debug, Clone)]
pub struct WindowTable {
    coefficients: Vec<f32>,
}

impl WindowTable {
    pub fn new(function: WindowFunction, size: usize) -> Self {
        let coefficients = (0..size)
            .map(|index| match function {
                WindowFunction::Hann => hann_window(index, size),
                WindowFunction::Rectangular => 1.0,
            })
            .collect();
        Self { coefficients }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficient(&self, index: usize) -> f32 {
        self.coefficients[index]
    }

    /// Multiply `input` by the window into `output`
    ///
    /// # Panics
    /// If either slice differs in length from the table.
    pub fn apply(&self, input: &[f32], output: &mut [f32]) {
        assert_eq!(input.len(), self.len(), "window input length mismatch");
        assert_eq!(output.len(), self.len(), "window output length mismatch");
        for ((out, &sample), &weight) in output.iter_mut().zip(input).zip(&self.coefficients) {
            *out = sample * weight;
        }
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size <= 1 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hann_table_is_symmetric() {
        let table = WindowTable::new(WindowFunction::Hann, 2048);

        for index in 0..1024 {
            let mirrored = table.coefficient(2047 - index);
            assert!((table.coefficient(index) - mirrored).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rectangular_passes_samples_through() {
        let table = WindowTable::new(WindowFunction::Rectangular, 8);
        let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let mut output = vec![0.0; 8];

        table.apply(&input, &mut output);

        assert_eq!(output, input);
    }

    #[test]
    fn test_degenerate_size_does_not_divide_by_zero() {
        assert_eq!(hann_window(0, 1), 1.0);
        assert!(WindowTable::new(WindowFunction::Hann, 0).is_empty());
    }
}
