use nalgebra::{allocator::Allocator, convert, DMatrix, DefaultAllocator, DimName, OPoint};

use crate::{
    error::{ensure, scalar, NurbsError, Result},
    knot::KnotVector,
    misc::FloatingPoint,
};

/// Knot vector and coefficient matrix of the global interpolation problem.
///
/// The knots are averaged over `degree` consecutive parameters, and row `i` of the square
/// matrix holds the basis functions evaluated at `parameters[i]`.
/// Solving `A * P = points` for each coordinate gives control points of a curve
/// passing through `points[i]` at `parameters[i]`.
/// # Failures
/// - `DimensionMismatch` if the counts differ or there are not more points than `degree`
/// - `InvalidDegree` if `degree` is zero
/// - `InvalidKnotValue` if the parameters decrease, are not finite, span an empty range,
///   or repeat so often that a knot exceeds multiplicity `degree + 1`
///
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// use nalgebra::Point2;
/// let points = vec![Point2::new(0., 0.), Point2::new(1., 1.), Point2::new(2., 0.)];
/// let (knots, a) = interpolation_matrix(&points, &[0., 0.5, 1.], 2).unwrap();
/// assert_eq!(knots.to_vec(), vec![0., 0., 0., 1., 1., 1.]);
/// assert_eq!(a[(0, 0)], 1.);
/// assert_eq!(a[(1, 1)], 0.5);
/// assert_eq!(a[(2, 2)], 1.);
/// ```
pub fn interpolation_matrix<T: FloatingPoint, D: DimName>(
    points: &[OPoint<T, D>],
    parameters: &[T],
    degree: usize,
) -> Result<(KnotVector<T>, DMatrix<T>)>
where
    DefaultAllocator: Allocator<D>,
{
    ensure!(
        points.len() == parameters.len(),
        NurbsError::DimensionMismatch(format!(
            "{} points with {} parameters",
            points.len(),
            parameters.len()
        ))
    );
    ensure!(
        degree > 0,
        NurbsError::InvalidDegree("interpolation needs a degree of at least 1".to_string())
    );
    ensure!(
        points.len() > degree,
        NurbsError::DimensionMismatch(format!(
            "{} points are too few for degree {}",
            points.len(),
            degree
        ))
    );
    if let Some(i) = parameters.iter().position(|u| !u.is_finite()) {
        return Err(NurbsError::InvalidKnotValue(format!(
            "parameter {} is not finite",
            i
        )));
    }
    if let Some(i) = parameters.windows(2).position(|w| w[1] < w[0]) {
        return Err(NurbsError::InvalidKnotValue(format!(
            "parameters decrease at index {}: {} > {}",
            i + 1,
            scalar(parameters[i]),
            scalar(parameters[i + 1])
        )));
    }

    let p = degree;
    let n = points.len() - 1;
    let (first, last) = (parameters[0], parameters[n]);
    ensure!(
        first < last,
        NurbsError::InvalidKnotValue(format!(
            "parameters span the empty range [{}, {}]",
            scalar(first),
            scalar(last)
        ))
    );
    let inv: T = T::one() / convert::<f64, T>(p as f64);

    let mut knots = vec![first; p + 1];
    for j in 1..=(n - p) {
        let sum = parameters[j..(j + p)]
            .iter()
            .fold(T::zero(), |acc, u| acc + *u);
        knots.push(sum * inv);
    }
    knots.extend(std::iter::repeat_n(last, p + 1));
    let knots = KnotVector::new(knots);
    if let Some(m) = knots
        .multiplicity()
        .iter()
        .find(|m| m.multiplicity() > p + 1)
    {
        return Err(NurbsError::InvalidKnotValue(format!(
            "repeated parameters give knot {} a multiplicity of {}, more than degree + 1",
            scalar(*m.knot()),
            m.multiplicity()
        )));
    }

    let mut matrix = DMatrix::<T>::zeros(n + 1, n + 1);
    for (i, u) in parameters.iter().enumerate() {
        let span = knots.find_span(n, p, *u)?;
        let basis = knots.basis_functions(span, *u, p);
        for (j, b) in basis.into_iter().enumerate() {
            matrix[(i, span - p + j)] = b;
        }
    }

    Ok((knots, matrix))
}
