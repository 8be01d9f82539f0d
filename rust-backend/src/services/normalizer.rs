// src/services/normalizer.rs

/// Lower and upper bound of the scaled range.
pub const FEATURE_RANGE: (f64, f64) = (-1.0, 1.0);

/// Min-max scaler fitted on one price window.
///
/// A window whose values are all equal has no range; it is scaled as if the
/// range were 1.0, so every value lands on the lower bound and the inverse
/// stays well defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// `None` for an empty slice.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let (&first, rest) = values.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    /// Fits on `values` and returns the scaled window alongside the scaler
    /// that must be used to invert the prediction.
    pub fn fit_transform(values: &[f64]) -> Option<(Self, Vec<f32>)> {
        let scaler = Self::fit(values)?;
        let scaled = values.iter().map(|&v| scaler.transform(v) as f32).collect();
        Some((scaler, scaled))
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn data_range(&self) -> f64 {
        let r = self.max - self.min;
        if r == 0.0 { 1.0 } else { r }
    }

    pub fn transform(&self, x: f64) -> f64 {
        let (lo, hi) = FEATURE_RANGE;
        lo + (x - self.min) * (hi - lo) / self.data_range()
    }

    pub fn inverse(&self, y: f64) -> f64 {
        let (lo, hi) = FEATURE_RANGE;
        self.min + (y - lo) * self.data_range() / (hi - lo)
    }
}
