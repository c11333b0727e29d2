use log::{debug, trace};
use nalgebra::{allocator::Allocator, DefaultAllocator, DimName};

use crate::{
    bezier::reduce_bezier,
    curve::NurbsCurve,
    decompose::{decompose_clamped, join_bezier_segments, segment_breaks},
    error::{ensure, NurbsError, Result},
    knot::KnotVector,
    misc::FloatingPoint,
};

use super::DegreeReductionOption;

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Approximate the curve with a curve of one degree lower.
    ///
    /// Each Bezier segment of the curve is reduced independently, the segments are joined
    /// with interior knots of multiplicity `degree - 1`, then every joint is simplified back
    /// towards the continuity of the original curve with the knot removal tolerance of `option`.
    /// Returns the reduced curve and a bound on its distance to the original curve.
    /// # Failures
    /// - `InvalidDegree` if the curve is not at least quadratic
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    /// let curve = NurbsCurve::try_new(
    ///     2,
    ///     vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(3., 2.), Point2::new(4., 0.)],
    ///     vec![0., 0., 0., 0.5, 1., 1., 1.],
    /// ).unwrap();
    /// let (reduced, error) = curve.elevate_degree(1).try_reduce_degree(None).unwrap();
    /// assert_eq!(reduced.degree(), 2);
    /// assert_eq!(reduced.knots(), curve.knots());
    /// assert_relative_eq!(error, 0., epsilon = 1e-9);
    /// ```
    pub fn try_reduce_degree(
        &self,
        option: Option<DegreeReductionOption<T>>,
    ) -> Result<(Self, T)> {
        let option = option.unwrap_or_default();
        let p = self.degree();
        ensure!(
            p >= 2,
            NurbsError::InvalidDegree(format!("a curve of degree {} cannot be reduced", p))
        );

        let curve = self.clamped();
        let segments = decompose_clamped(&curve);
        let breaks = segment_breaks(&curve, &segments);

        let mut segment_error = T::zero();
        let mut reduced = Vec::with_capacity(segments.len());
        for segment in segments.iter() {
            let (points, error) = reduce_bezier(segment.control_points())?;
            let (start, end) = segment.knots_domain();
            trace!(
                "reduce: segment [{:?}, {:?}] error {:?}",
                start,
                end,
                error
            );
            segment_error = segment_error.max(error);
            let knots = [vec![start; p], vec![end; p]].concat();
            reduced.push(NurbsCurve::new_unchecked(points, KnotVector::new(knots)));
        }

        let mut joined = join_bezier_segments(&reduced, &breaks).ok_or_else(|| {
            NurbsError::Degenerate("the curve has no Bezier segment".to_string())
        })?;

        let mut removal_error = T::zero();
        for (segment, discontinuous) in segments.iter().skip(1).zip(breaks.iter()) {
            if *discontinuous {
                continue;
            }
            let u = segment.knots_domain().0;
            let multiplicity = curve
                .knots()
                .multiplicity_of(u)
                .map(|(_, m)| m)
                .unwrap_or(p);
            let times = p.saturating_sub(multiplicity);
            if times == 0 {
                continue;
            }
            let (next, removed, deviation) =
                joined.remove_knot_with_deviation(u, times, option.tolerance());
            trace!(
                "reduce: knot {:?} removed {} of {} times",
                u,
                removed,
                times
            );
            joined = next;
            removal_error += deviation;
        }

        let max_error = segment_error + removal_error;
        debug!(
            "reduce degree {} -> {}: {} control points, error {:?}",
            p,
            p - 1,
            joined.control_points().len(),
            max_error
        );
        Ok((joined, max_error))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};

    fn quadratic() -> NurbsCurve<f64, nalgebra::Const<3>> {
        NurbsCurve::try_new(
            2,
            vec![
                Point3::new(0., 0., 1.),
                Point3::new(1., 2., 1.),
                Point3::new(2., -1., 2.),
                Point3::new(3., 3., 1.),
                Point3::new(4., 0., 1.),
            ],
            vec![0., 0., 0., 0.3, 0.7, 1., 1., 1.],
        )
        .unwrap()
    }

    #[test]
    fn reduction_undoes_elevation() {
        let curve = quadratic();
        let (reduced, error) = curve
            .elevate_degree(1)
            .try_reduce_degree(Some(DegreeReductionOption::default().with_tolerance(1e-8)))
            .unwrap();
        assert_relative_eq!(error, 0., epsilon = 1e-9);
        assert_eq!(reduced.degree(), 2);
        assert_eq!(reduced.knots(), curve.knots());
        for (a, b) in reduced
            .control_points()
            .iter()
            .zip(curve.control_points().iter())
        {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn error_bounds_the_deviation() {
        let curve = NurbsCurve::try_new(
            3,
            vec![
                Point2::new(0., 0.),
                Point2::new(1., 3.),
                Point2::new(2., -2.),
                Point2::new(3., 2.),
                Point2::new(4., -1.),
                Point2::new(5., 0.),
            ],
            vec![0., 0., 0., 0., 0.4, 0.6, 1., 1., 1., 1.],
        )
        .unwrap();
        let (reduced, error) = curve.try_reduce_degree(None).unwrap();
        assert_eq!(reduced.degree(), 2);
        assert!(error > 0.);
        for s in 0..=50 {
            let u = s as f64 / 50.;
            let d = (reduced.point(u).unwrap() - curve.point(u).unwrap()).norm();
            assert!(d <= error + 1e-9, "deviation {} exceeds {}", d, error);
        }
    }

    #[test]
    fn discontinuous_curve_stays_discontinuous() {
        let curve = NurbsCurve::try_new(
            2,
            vec![
                Point2::new(0., 0.),
                Point2::new(1., 1.),
                Point2::new(2., 2.),
                Point2::new(5., 0.),
                Point2::new(6., 0.),
                Point2::new(7., 0.),
            ],
            vec![0., 0., 0., 1., 1., 1., 2., 2., 2.],
        )
        .unwrap();
        let (reduced, error) = curve.try_reduce_degree(None).unwrap();
        assert_relative_eq!(error, 0., epsilon = 1e-12);
        assert_eq!(reduced.knots().to_vec(), vec![0., 0., 1., 1., 2., 2.]);
        assert_relative_eq!(reduced.point(0.5).unwrap(), Point2::new(1., 1.), epsilon = 1e-12);
        assert_relative_eq!(reduced.point(1.5).unwrap(), Point2::new(6., 0.), epsilon = 1e-12);
    }

    #[test]
    fn linear_curve_cannot_be_reduced() {
        let line = NurbsCurve::try_bezier(vec![Point2::new(0., 0.), Point2::new(1., 1.)]).unwrap();
        assert!(matches!(
            line.try_reduce_degree(None),
            Err(NurbsError::InvalidDegree(_))
        ));
    }
}
