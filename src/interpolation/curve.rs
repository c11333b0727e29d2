use log::debug;
use nalgebra::{
    allocator::Allocator, DMatrix, DVector, DefaultAllocator, DimName, DimNameDiff, DimNameSub,
    OPoint, OVector, U1,
};

use crate::{
    curve::{KnotStyle, NurbsCurve},
    error::{NurbsError, Result},
    misc::FloatingPoint,
};

use super::{interpolation_matrix, Interpolation};

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Try to create a curve passing through a set of points
    ///
    /// The points are parameterized by `knot_style`, and the control points are solved
    /// from the global interpolation system with unit weights.
    /// # Failures
    /// - `DimensionMismatch` if there are not more points than `degree`
    /// - `InvalidDegree` if `degree` is zero
    /// - `Degenerate` if two consecutive points coincide or the system is singular
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let points = vec![
    ///     Point2::new(-1.0, -1.0),
    ///     Point2::new(1.0, -1.0),
    ///     Point2::new(1.0, 1.0),
    ///     Point2::new(-1.0, 1.0),
    ///     Point2::new(-1.0, 2.0),
    /// ];
    /// let curve = NurbsCurve2D::try_interpolate(&points, 3, KnotStyle::Centripetal).unwrap();
    ///
    /// let (start, end) = curve.knots_domain();
    /// assert_relative_eq!(curve.point_at(start).unwrap(), points[0], epsilon = 1e-10);
    /// assert_relative_eq!(curve.point_at(end).unwrap(), points[4], epsilon = 1e-10);
    /// ```
    pub fn try_interpolate(
        points: &[OPoint<T, DimNameDiff<D, U1>>],
        degree: usize,
        knot_style: KnotStyle,
    ) -> Result<Self> {
        let parameters = knot_style.parameterize(points)?;
        let (knots, matrix) = interpolation_matrix(points, &parameters, degree)?;
        let dim = D::dim() - 1;
        let rhs = DMatrix::from_fn(points.len(), dim, |i, c| points[i][c]);
        let solved = try_solve_interpolation(matrix, &rhs)?;

        let control_points = (0..points.len())
            .map(|i| {
                OPoint::from(OVector::<T, D>::from_fn(|r, _| {
                    if r < dim {
                        solved[(i, r)]
                    } else {
                        T::one()
                    }
                }))
            })
            .collect::<Vec<_>>();

        debug!(
            "interpolate {} points with degree {} ({:?})",
            points.len(),
            degree,
            knot_style
        );
        Ok(Self::new_unchecked(control_points, knots))
    }
}

impl<T: FloatingPoint, D: DimName> Interpolation for NurbsCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Input = Vec<OPoint<T, DimNameDiff<D, U1>>>;
    type Output = Result<Self>;

    fn interpolate(input: &Self::Input, degree: usize, knot_style: KnotStyle) -> Self::Output {
        Self::try_interpolate(input, degree, knot_style)
    }
}

/// Solve the interpolation system for each column of `rhs`, one coordinate per column.
/// Row `i` of the result holds the coordinates of control point `i`.
fn try_solve_interpolation<T: FloatingPoint>(
    matrix: DMatrix<T>,
    rhs: &DMatrix<T>,
) -> Result<DMatrix<T>> {
    let lu = matrix.lu();
    let mut solved = DMatrix::<T>::zeros(rhs.nrows(), rhs.ncols());
    for i in 0..rhs.ncols() {
        let b: DVector<T> = rhs.column(i).into_owned();
        let xs = lu
            .solve(&b)
            .ok_or_else(|| NurbsError::Degenerate("interpolation system is singular".to_string()))?;
        solved.set_column(i, &xs);
    }
    Ok(solved)
}
