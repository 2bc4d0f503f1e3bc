//! Bar scaling for rendering a window's durations.

use serde::{Deserialize, Serialize};

/// Maps durations onto bar heights in `[0, 1]`.
///
/// The lower bound sits 10% of the spread below the minimum so the
/// shortest bar is still visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartScale {
    pub display_min: f64,
    pub max: f64,
}

impl ChartScale {
    pub fn new(min_duration: u32, max_duration: u32) -> Self {
        let min = min_duration as f64;
        let max = max_duration as f64;
        Self {
            display_min: (min - 0.1 * (max - min)).max(0.0),
            max,
        }
    }

    /// Relative bar height for `value` seconds.
    pub fn bar_height(&self, value: u32) -> f64 {
        let span = self.max - self.display_min;
        if span <= 0.0 {
            // every sample equal and zero
            return 1.0;
        }
        ((value as f64 - self.display_min) / span).clamp(0.0, 1.0)
    }
}
