use itertools::Itertools;
use nalgebra::{allocator::Allocator, convert, DefaultAllocator, DimName, OPoint};

use crate::error::{NurbsError, Result};
use crate::misc::FloatingPoint;

/// Knot parameterization for points interpolation
/// https://en.wikipedia.org/wiki/Centripetal_Catmull%E2%80%93Rom_spline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnotStyle {
    /// equally spaced parameters
    Uniform,
    /// parameters proportional to chord lengths
    Chordal,
    /// parameters proportional to the square root of chord lengths
    #[default]
    Centripetal,
}

impl KnotStyle {
    /// Parameters of the points in [0, 1]: cumulated chord lengths raised to `alpha`, normalized.
    /// # Failures
    /// - `DimensionMismatch` if there are fewer than two points
    /// - `Degenerate` if two consecutive points coincide
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let points = vec![Point2::new(0., 0.), Point2::new(1., 0.), Point2::new(4., 0.)];
    /// assert_eq!(KnotStyle::Chordal.parameterize(&points).unwrap(), vec![0., 0.25, 1.]);
    /// assert_eq!(KnotStyle::Uniform.parameterize(&points).unwrap(), vec![0., 0.5, 1.]);
    /// ```
    pub fn parameterize<T: FloatingPoint, D: DimName>(
        &self,
        points: &[OPoint<T, D>],
    ) -> Result<Vec<T>>
    where
        DefaultAllocator: Allocator<D>,
    {
        if points.len() < 2 {
            return Err(NurbsError::DimensionMismatch(format!(
                "at least two points are needed, got {}",
                points.len()
            )));
        }

        let chords: Vec<T> = points
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b - a).norm())
            .collect();
        if let Some(i) = chords.iter().position(|c| *c == T::zero()) {
            return Err(NurbsError::Degenerate(format!(
                "points {} and {} coincide",
                i,
                i + 1
            )));
        }

        let alpha = self.alpha::<T>();
        let mut params = vec![T::zero()];
        for chord in chords {
            let last = params[params.len() - 1];
            params.push(last + chord.powf(alpha));
        }

        let total = params[params.len() - 1];
        Ok(params.into_iter().map(|p| p / total).collect())
    }

    pub fn alpha<T: FloatingPoint>(&self) -> T {
        match self {
            KnotStyle::Uniform => T::zero(),
            KnotStyle::Chordal => T::one(),
            KnotStyle::Centripetal => convert(0.5),
        }
    }
}
