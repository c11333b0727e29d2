use nalgebra::convert;

use crate::misc::FloatingPoint;

/// Options for degree reduction of a curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeReductionOption<T: FloatingPoint> {
    /// Largest deviation accepted when removing the knots introduced by the Bezier decomposition
    tolerance: T,
}

impl<T: FloatingPoint> Default for DegreeReductionOption<T> {
    fn default() -> Self {
        Self {
            tolerance: convert(1e-6),
        }
    }
}

impl<T: FloatingPoint> DegreeReductionOption<T> {
    pub fn new(tolerance: T) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> T {
        self.tolerance
    }

    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }
}
