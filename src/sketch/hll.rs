//! Distinct-key counting on the datasketches HLL sketch

use std::fmt;

use datasketches::hll::{HllSketch, HllType};

use super::CardinalityEstimator;

pub const MIN_PRECISION: u8 = 4;
pub const MAX_PRECISION: u8 = 18;

/// HyperLogLog cardinality estimator with `2^precision` registers
pub struct HllCardinality {
    precision: u8,
    sketch: HllSketch,
}

impl HllCardinality {
    /// Precision is clamped to `MIN_PRECISION..=MAX_PRECISION`.
    pub fn new(precision: u8) -> Self {
        let precision = precision.clamp(MIN_PRECISION, MAX_PRECISION);
        Self {
            precision,
            sketch: HllSketch::new(precision, HllType::Hll8),
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }
}

impl fmt::Debug for HllCardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HllCardinality")
            .field("precision", &self.precision)
            .field("estimate", &self.sketch.estimate())
            .finish()
    }
}

impl CardinalityEstimator for HllCardinality {
    fn offer(&mut self, item: &str) {
        self.sketch.update(item);
    }

    fn cardinality(&self) -> u64 {
        self.sketch.estimate().round() as u64
    }
}
