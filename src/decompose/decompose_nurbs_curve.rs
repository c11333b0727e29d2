use log::{debug, trace};
use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint};

use crate::{curve::NurbsCurve, knot::KnotVector, misc::FloatingPoint, prelude::Decompose};

impl<T: FloatingPoint, D: DimName> Decompose for NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    type Output = Vec<NurbsCurve<T, D>>;

    /// Decompose the curve into a set of Bezier segments of the same degree.
    ///
    /// Every interior knot is raised to multiplicity `degree`, walking the knot vector
    /// from left to right. Consecutive segments share their end control points
    /// unless the curve is discontinuous there.
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let curve = NurbsCurve::try_new(
    ///     2,
    ///     vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(3., 2.), Point2::new(4., 0.)],
    ///     vec![0., 0., 0., 0.5, 1., 1., 1.],
    /// ).unwrap();
    /// let segments = curve.decompose();
    /// assert_eq!(segments.len(), 2);
    /// assert_eq!(segments[0].knots().to_vec(), vec![0., 0., 0., 0.5, 0.5, 0.5]);
    /// assert_eq!(segments[0].control_points()[2], segments[1].control_points()[0]);
    /// ```
    fn decompose(&self) -> Self::Output {
        let curve = self.clamped();
        let segments = decompose_clamped(&curve);
        debug!(
            "decompose: {} Bezier segments of degree {}",
            segments.len(),
            curve.degree()
        );
        segments
    }
}

/// Bezier decomposition of a clamped curve
pub(crate) fn decompose_clamped<T: FloatingPoint, D: DimName>(
    curve: &NurbsCurve<T, D>,
) -> Vec<NurbsCurve<T, D>>
where
    DefaultAllocator: Allocator<D>,
{
    let p = curve.degree();
    let control_points = curve.control_points();
    let knots = curve.knots();
    let m = knots.len() - 1;

    let bezier = |points: Vec<OPoint<T, D>>, start: T, end: T| {
        let knots = [vec![start; p + 1], vec![end; p + 1]].concat();
        NurbsCurve::new_unchecked(points, KnotVector::new(knots))
    };

    if p == 0 {
        return control_points
            .iter()
            .enumerate()
            .filter(|(i, _)| knots[*i] < knots[i + 1])
            .map(|(i, pt)| bezier(vec![pt.clone()], knots[i], knots[i + 1]))
            .collect();
    }

    let mut segments = vec![];
    let mut alphas = vec![T::zero(); p];
    let mut current = control_points[..=p].to_vec();
    let mut next = current.clone();

    let mut a = p;
    let mut b = p + 1;
    while b < m {
        let i = b;
        while b < m && knots[b] == knots[b + 1] {
            b += 1;
        }
        let mult = b - i + 1;
        // a knot already at multiplicity >= p needs no insertion
        let r = p.saturating_sub(mult);

        if r > 0 {
            let numer = knots[b] - knots[a];
            for k in ((mult + 1)..=p).rev() {
                alphas[k - mult - 1] = numer / (knots[a + k] - knots[a]);
            }

            // insert knot U[b] r times
            for j in 1..=r {
                let save = r - j;
                let s = mult + j;
                for k in (s..=p).rev() {
                    current[k] = current[k - 1].lerp(&current[k], alphas[k - s]);
                }
                next[save] = current[p].clone();
            }
        }

        trace!(
            "decompose: segment [{:?}, {:?}] after {} insertions",
            knots[a],
            knots[b],
            r
        );
        segments.push(bezier(current.clone(), knots[a], knots[b]));

        if b < m {
            next[r..=p].clone_from_slice(&control_points[(b - p + r)..=b]);
            current = next.clone();
            a = b;
            b += 1;
        }
    }

    segments
}

/// Chain Bezier segments of a common degree into a single spline.
///
/// `discontinuous[i]` tells whether the break between segments `i` and `i + 1` keeps
/// both end points with a knot of multiplicity `degree + 1`;
/// otherwise the shared point is written once and the knot repeats `degree` times.
pub(crate) fn join_bezier_segments<T: FloatingPoint, D: DimName>(
    segments: &[NurbsCurve<T, D>],
    discontinuous: &[bool],
) -> Option<NurbsCurve<T, D>>
where
    DefaultAllocator: Allocator<D>,
{
    let first = segments.first()?;
    let last = segments.last()?;
    let p = first.degree();

    let mut control_points = first.control_points().clone();
    let mut knots = vec![first.knots_domain().0; p + 1];
    for (segment, disc) in segments.iter().skip(1).zip(discontinuous.iter()) {
        let (start, _) = segment.knots_domain();
        if *disc || p == 0 {
            knots.extend(std::iter::repeat_n(start, p + 1));
            control_points.extend(segment.control_points().iter().cloned());
        } else {
            knots.extend(std::iter::repeat_n(start, p));
            control_points.extend(segment.control_points().iter().skip(1).cloned());
        }
    }
    knots.extend(std::iter::repeat_n(last.knots_domain().1, p + 1));

    Some(NurbsCurve::new_unchecked(
        control_points,
        KnotVector::new(knots),
    ))
}

/// For each break between consecutive segments, whether the curve has a knot of
/// multiplicity `degree + 1` there
pub(crate) fn segment_breaks<T: FloatingPoint, D: DimName>(
    curve: &NurbsCurve<T, D>,
    segments: &[NurbsCurve<T, D>],
) -> Vec<bool>
where
    DefaultAllocator: Allocator<D>,
{
    let p = curve.degree();
    segments
        .iter()
        .skip(1)
        .map(|s| {
            curve
                .knots()
                .multiplicity_of(s.knots_domain().0)
                .is_some_and(|(_, mult)| mult > p)
        })
        .collect()
}

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// The Bezier decomposition as a single spline whose interior knots all have
    /// multiplicity `degree`, or `degree + 1` where the curve is discontinuous
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let curve = NurbsCurve::try_new(
    ///     2,
    ///     vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(3., 2.), Point2::new(4., 0.)],
    ///     vec![0., 0., 0., 0.5, 1., 1., 1.],
    /// ).unwrap();
    /// let unblended = curve.unblended();
    /// assert_eq!(unblended.knots().to_vec(), vec![0., 0., 0., 0.5, 0.5, 1., 1., 1.]);
    /// assert_eq!(unblended.control_points().len(), 5);
    /// ```
    pub fn unblended(&self) -> Self {
        let clamped = self.clamped();
        let segments = decompose_clamped(&clamped);
        let breaks = segment_breaks(&clamped, &segments);
        join_bezier_segments(&segments, &breaks).unwrap_or(clamped)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn sample(curve: &NurbsCurve<f64, nalgebra::Const<2>>, n: usize) -> Vec<f64> {
        let (start, end) = curve.knots_domain();
        (0..=n)
            .map(|i| start + (end - start) * i as f64 / n as f64)
            .collect()
    }

    #[test]
    fn segments_cover_the_curve() {
        let curve = NurbsCurve::try_new(
            3,
            vec![
                Point2::new(0., 0.),
                Point2::new(1., 2.),
                Point2::new(2., -1.),
                Point2::new(3., 3.),
                Point2::new(4., 0.),
                Point2::new(5., 1.),
            ],
            vec![0., 0., 0., 0., 0.2, 0.7, 1., 1., 1., 1.],
        )
        .unwrap();
        let segments = curve.decompose();
        assert_eq!(segments.len(), 3);
        for w in segments.windows(2) {
            assert_eq!(w[0].control_points()[3], w[1].control_points()[0]);
        }
        for segment in segments.iter() {
            assert_eq!(segment.degree(), 3);
            assert_eq!(segment.control_points().len(), 4);
            for u in sample(segment, 10) {
                assert_relative_eq!(
                    segment.point(u).unwrap(),
                    curve.point(u).unwrap(),
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn knot_with_multiplicity_degree_needs_no_insertion() {
        let points = vec![
            Point2::new(0., 0.),
            Point2::new(1., 1.),
            Point2::new(2., 0.),
            Point2::new(3., 1.),
            Point2::new(4., 0.),
        ];
        let curve =
            NurbsCurve::try_new(2, points.clone(), vec![0., 0., 0., 1., 1., 2., 2., 2.]).unwrap();
        let segments = curve.decompose();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].control_points(), &points[0..3].to_vec());
        assert_eq!(segments[1].control_points(), &points[2..5].to_vec());
    }

    #[test]
    fn discontinuous_knot_splits_the_polygon() {
        let points = vec![
            Point2::new(0., 0.),
            Point2::new(1., 1.),
            Point2::new(2., 0.),
            Point2::new(5., 5.),
            Point2::new(6., 6.),
            Point2::new(7., 5.),
        ];
        let curve =
            NurbsCurve::try_new(2, points.clone(), vec![0., 0., 0., 1., 1., 1., 2., 2., 2.])
                .unwrap();
        let segments = curve.decompose();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].control_points(), &points[0..3].to_vec());
        assert_eq!(segments[1].control_points(), &points[3..6].to_vec());
        assert_eq!(segments[1].knots_domain(), (1., 2.));

        let unblended = curve.unblended();
        assert_eq!(unblended, curve);
    }

    #[test]
    fn mixed_multiplicities() {
        let curve = NurbsCurve::try_new(
            3,
            vec![
                Point2::new(0., 0.),
                Point2::new(1., 2.),
                Point2::new(2., -1.),
                Point2::new(3., 3.),
                Point2::new(4., 0.),
                Point2::new(5., 1.),
                Point2::new(6., 2.),
            ],
            vec![0., 0., 0., 0., 0.3, 0.6, 0.6, 1., 1., 1., 1.],
        )
        .unwrap();
        let unblended = curve.unblended();
        assert_eq!(
            unblended.knots().to_vec(),
            vec![0., 0., 0., 0., 0.3, 0.3, 0.3, 0.6, 0.6, 0.6, 1., 1., 1., 1.]
        );
        for u in sample(&curve, 20) {
            assert_relative_eq!(
                unblended.point(u).unwrap(),
                curve.point(u).unwrap(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn unclamped_curve_is_clamped_first() {
        let curve = NurbsCurve::try_new(
            2,
            vec![
                Point2::new(0., 0.),
                Point2::new(1., 1.),
                Point2::new(2., 0.),
                Point2::new(3., 1.),
            ],
            vec![0., 1., 2., 3., 4., 5., 6.],
        )
        .unwrap();
        let segments = curve.decompose();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].knots_domain(), (2., 3.));
        assert_relative_eq!(
            segments[1].point(3.5).unwrap(),
            curve.point(3.5).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn degree_zero_segments() {
        let curve = NurbsCurve::try_new(
            0,
            vec![Point2::new(0., 0.), Point2::new(1., 1.), Point2::new(2., 0.)],
            vec![0., 1., 2., 3.],
        )
        .unwrap();
        let segments = curve.decompose();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].knots().to_vec(), vec![2., 3.]);
    }
}
