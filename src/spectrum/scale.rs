//! Mapping of complex bins to display-space points.

use rustfft::num_complex::Complex32;

use super::Vertex;

/// Runtime-selectable bin → point mapping
///
/// Every variant keeps the bin's phase and only rescales its magnitude, so switching
/// maps never requires touching rows already in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMap {
    /// (re, im) unchanged
    #[default]
    Identity,

    /// z · e^|z|, boosts loud bins
    Exponential,

    /// z · ln|z|, compresses the dynamic range; silent bins map to the origin
    Logarithmic,
}

impl ScaleMap {
    pub const ALL: [ScaleMap; 3] = [ScaleMap::Identity, ScaleMap::Exponential, ScaleMap::Logarithmic];

    /// Map a single bin
    pub fn apply(self, bin: Complex32) -> Vertex {
        let scaled = match self {
            ScaleMap::Identity => bin,
            ScaleMap::Exponential => bin * bin.norm().exp(),
            ScaleMap::Logarithmic => {
                let magnitude = bin.norm();
                if magnitude > 0.0 {
                    bin * magnitude.ln()
                } else {
                    Complex32::new(0.0, 0.0)
                }
            }
        };
        Vertex::new(scaled.re, scaled.im)
    }

    /// Map a whole spectral frame into a preallocated row
    ///
    /// # Panics
    /// If `bins` and `row` differ in length.
    pub fn map_row(self, bins: &[Complex32], row: &mut [Vertex]) {
        assert_eq!(bins.len(), row.len(), "row length must match bin count");
        for (point, &bin) in row.iter_mut().zip(bins) {
            *point = self.apply(bin);
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleMap::Identity => "identity",
            ScaleMap::Exponential => "exponential",
            ScaleMap::Logarithmic => "logarithmic",
        }
    }

    /// Parse a scale name; "linear" is accepted for identity
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("linear") {
            return Some(ScaleMap::Identity);
        }
        Self::ALL
            .into_iter()
            .find(|scale| scale.name().eq_ignore_ascii_case(name))
    }

    /// Next map in cycling order (keyboard control)
    pub fn next(self) -> Self {
        match self {
            ScaleMap::Identity => ScaleMap::Exponential,
            ScaleMap::Exponential => ScaleMap::Logarithmic,
            ScaleMap::Logarithmic => ScaleMap::Identity,
        }
    }
}
