use nalgebra::{allocator::Allocator, convert, DefaultAllocator, DimName, OPoint};

use crate::error::{ensure, NurbsError, Result};
use crate::misc::{Binomial, FloatingPoint};

/// Coefficients raising a Bezier curve of degree `degree` by `t`.
///
/// Row `i` of the `(degree + t + 1) x (degree + 1)` table holds the weights of the original
/// control points in the `i`-th elevated control point.
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// let mut binom = Binomial::new();
/// let alfs = elevation_coefficients::<f64>(1, 1, &mut binom);
/// assert_eq!(alfs, vec![vec![1., 0.], vec![0.5, 0.5], vec![0., 1.]]);
/// ```
pub fn elevation_coefficients<T: FloatingPoint>(
    degree: usize,
    t: usize,
    binom: &mut Binomial<T>,
) -> Vec<Vec<T>> {
    let p = degree;
    let ph = p + t;
    let ph2 = ph / 2;

    let mut alfs = vec![vec![T::zero(); p + 1]; ph + 1];
    alfs[0][0] = T::one();
    alfs[ph][p] = T::one();

    for i in 1..=ph2 {
        let inv = T::one() / binom.get(ph, i);
        for j in i.saturating_sub(t)..=p.min(i) {
            alfs[i][j] = inv * binom.get(p, j) * binom.get(t, i - j);
        }
    }
    // lower half mirrors the upper half
    for i in (ph2 + 1)..ph {
        for j in i.saturating_sub(t)..=p.min(i) {
            alfs[i][j] = alfs[ph - i][p - j];
        }
    }

    alfs
}

/// Reduce a Bezier curve by one degree.
///
/// The reduced control points are solved from both ends towards the middle; for an odd degree
/// the two estimates of the middle point are averaged.
/// Returns the reduced control points and a bound on the distance between the two curves.
/// # Failures
/// - `InvalidDegree` if the curve is not at least quadratic
///
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// use nalgebra::Point2;
/// // a straight line written as a quadratic reduces without error
/// let ctrl = vec![Point2::new(0., 0.), Point2::new(1., 1.), Point2::new(2., 2.)];
/// let (reduced, error) = reduce_bezier(&ctrl).unwrap();
/// assert_eq!(reduced, vec![Point2::new(0., 0.), Point2::new(2., 2.)]);
/// assert_eq!(error, 0.);
/// ```
pub fn reduce_bezier<T: FloatingPoint, D: DimName>(
    control_points: &[OPoint<T, D>],
) -> Result<(Vec<OPoint<T, D>>, T)>
where
    DefaultAllocator: Allocator<D>,
{
    ensure!(
        control_points.len() >= 3,
        NurbsError::InvalidDegree(format!(
            "a Bezier curve of degree {} cannot be reduced",
            control_points.len().saturating_sub(1)
        ))
    );

    let q = control_points;
    let p = q.len() - 1;
    let r = (p - 1) / 2;
    let inv = T::one() / convert::<f64, T>(p as f64);
    let alpha = |i: usize| convert::<f64, T>(i as f64) * inv;
    let half = convert::<f64, T>(0.5);

    let mut reduced = vec![OPoint::<T, D>::origin(); p];
    reduced[0] = q[0].clone();
    for i in 1..=r {
        let a = alpha(i);
        reduced[i] = ((&q[i].coords - &reduced[i - 1].coords * a) / (T::one() - a)).into();
    }
    reduced[p - 1] = q[p].clone();
    for i in ((r + 1)..=(p - 2)).rev() {
        let a = alpha(i + 1);
        reduced[i] = ((&q[i + 1].coords - &reduced[i + 1].coords * (T::one() - a)) / a).into();
    }

    let error = if p % 2 == 1 {
        let a = alpha(r + 1);
        let left = reduced[r].clone();
        let right: OPoint<T, D> =
            ((&q[r + 1].coords - &reduced[r + 1].coords * (T::one() - a)) / a).into();
        let error = half * (T::one() - alpha(r)) * (&left - &right).norm();
        reduced[r] = left.lerp(&right, half);
        error
    } else {
        let middle = reduced[r].lerp(&reduced[r + 1], half);
        (&q[r + 1] - &middle).norm()
    };

    Ok((reduced, error))
}
