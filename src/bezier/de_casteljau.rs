use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, OVector};

use crate::misc::FloatingPoint;

use super::all_bernstein;

/// Evaluate a Bezier curve of degree `control_points.len() - 1` at each parameter in [0, 1]
/// by summing its Bernstein polynomials.
/// An empty control polygon gives no points.
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// use nalgebra::Point2;
/// let ctrl = vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)];
/// assert_eq!(bezier_points(&ctrl, &[0.5]), vec![Point2::new(1., 1.)]);
/// ```
pub fn bezier_points<T: FloatingPoint, D: DimName>(
    control_points: &[OPoint<T, D>],
    parameters: &[T],
) -> Vec<OPoint<T, D>>
where
    DefaultAllocator: Allocator<D>,
{
    if control_points.is_empty() {
        return vec![];
    }
    let n = control_points.len() - 1;
    parameters
        .iter()
        .map(|u| {
            let basis = all_bernstein(n, *u);
            let mut position = OVector::<T, D>::zeros();
            for (b, p) in basis.iter().zip(control_points.iter()) {
                position += &p.coords * *b;
            }
            position.into()
        })
        .collect()
}

/// Run de Casteljau's algorithm at `u`.
/// Returns every level of the triangle: the first is the control polygon,
/// the last holds the single point of the curve at `u`.
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// use nalgebra::Point2;
/// let ctrl = vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)];
/// let levels = de_casteljau(&ctrl, 0.5);
/// assert_eq!(levels.len(), 3);
/// assert_eq!(levels[2], vec![Point2::new(1., 1.)]);
/// ```
pub fn de_casteljau<T: FloatingPoint, D: DimName>(
    control_points: &[OPoint<T, D>],
    u: T,
) -> Vec<Vec<OPoint<T, D>>>
where
    DefaultAllocator: Allocator<D>,
{
    let mut levels = vec![control_points.to_vec()];
    while levels[levels.len() - 1].len() > 1 {
        let next = levels[levels.len() - 1]
            .windows(2)
            .map(|w| w[0].lerp(&w[1], u))
            .collect();
        levels.push(next);
    }
    levels
}

/// Split a Bezier curve at `u` into two Bezier curves of the same degree,
/// covering `[0, u]` and `[u, 1]` of the original.
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// use nalgebra::Point2;
/// let ctrl = vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)];
/// let (left, right) = split_bezier(&ctrl, 0.5);
/// assert_eq!(left, vec![Point2::new(0., 0.), Point2::new(0.5, 1.), Point2::new(1., 1.)]);
/// assert_eq!(right, vec![Point2::new(1., 1.), Point2::new(1.5, 1.), Point2::new(2., 0.)]);
/// ```
pub fn split_bezier<T: FloatingPoint, D: DimName>(
    control_points: &[OPoint<T, D>],
    u: T,
) -> (Vec<OPoint<T, D>>, Vec<OPoint<T, D>>)
where
    DefaultAllocator: Allocator<D>,
{
    let levels = de_casteljau(control_points, u);
    let left = levels.iter().filter_map(|l| l.first().cloned()).collect();
    let right = levels.iter().rev().filter_map(|l| l.last().cloned()).collect();
    (left, right)
}
