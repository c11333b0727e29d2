use log::{debug, trace};
use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint};

use crate::{curve::NurbsCurve, knot::KnotVector, misc::FloatingPoint};

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Try to remove the interior knot `u` up to `times` times.
    ///
    /// A removal is accepted only when the curve moves by at most `tolerance`,
    /// so fewer removals than requested may happen.
    /// Returns the new curve and the number of removals performed.
    /// End knots and values that are not knots are never removed.
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let curve = NurbsCurve::try_bezier(vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)]).unwrap();
    /// let refined = curve.try_refine_knot(&[0.5, 0.5]).unwrap();
    /// let (removed, count) = refined.remove_knot(0.5, 3, 1e-9);
    /// assert_eq!(count, 2);
    /// assert_eq!(removed.knots().to_vec(), curve.knots().to_vec());
    /// ```
    pub fn remove_knot(&self, u: T, times: usize, tolerance: T) -> (Self, usize) {
        let (curve, removed, deviation) = self.remove_knot_with_deviation(u, times, tolerance);
        debug!(
            "remove knot {:?}: {} of {} removals, deviation {:?}",
            u, removed, times, deviation
        );
        (curve, removed)
    }

    /// Remove every interior knot that can be removed within `tolerance`,
    /// until no further removal succeeds
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let curve = NurbsCurve::try_bezier(vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)]).unwrap();
    /// let refined = curve.try_refine_knot(&[0.2, 0.5, 0.5, 0.7]).unwrap();
    /// let simplified = refined.remove_all_knots(1e-9);
    /// assert_eq!(simplified.knots().to_vec(), vec![0., 0., 0., 1., 1., 1.]);
    /// ```
    pub fn remove_all_knots(&self, tolerance: T) -> Self {
        let mut curve = self.clone();
        loop {
            let (start, end) = curve.knots_domain();
            let removed = curve
                .knots()
                .distinct()
                .into_iter()
                .filter(|u| *u > start && *u < end)
                .find_map(|u| {
                    let (next, count) = curve.remove_knot(u, usize::MAX, tolerance);
                    (count > 0).then_some(next)
                });
            match removed {
                Some(next) => curve = next,
                None => break,
            }
        }
        curve
    }

    /// Knot removal also reporting the largest deviation among the accepted removals
    pub(crate) fn remove_knot_with_deviation(
        &self,
        u: T,
        times: usize,
        tolerance: T,
    ) -> (Self, usize, T) {
        let (start, end) = self.knots_domain();
        let located = self.knots().multiplicity_of(u);
        let (r, s) = match located {
            Some(found) if u > start && u < end && times > 0 => found,
            _ => return (self.clone(), 0, T::zero()),
        };

        let mut control_points = self.control_points().clone();
        let mut knots = self.knots().to_vec();
        let num = times.min(s) as isize;

        let n = control_points.len() as isize - 1;
        let m = knots.len() as isize - 1;
        let p = self.degree() as isize;
        let (r, s) = (r as isize, s as isize);
        let ord = p + 1;
        // first control point out
        let fout = (2 * r - s - p) / 2;
        let mut last = r - s;
        let mut first = r - p;

        let uk = |i: isize| knots[i as usize];
        let mut temp = vec![OPoint::<T, D>::origin(); (2 * p + 3) as usize];
        let mut deviation = T::zero();

        let mut t = 0;
        while t < num {
            // difference in index between temp and control_points
            let off = first - 1;
            temp[0] = control_points[off as usize].clone();
            temp[(last + 1 - off) as usize] = control_points[(last + 1) as usize].clone();

            let (mut i, mut j) = (first, last);
            let (mut ii, mut jj) = (1, last - off);
            while j - i > t {
                let alfi = (u - uk(i)) / (uk(i + ord + t) - uk(i));
                let alfj = (u - uk(j - t)) / (uk(j + ord) - uk(j - t));
                temp[ii as usize] = ((&control_points[i as usize].coords
                    - &temp[(ii - 1) as usize].coords * (T::one() - alfi))
                    / alfi)
                    .into();
                temp[jj as usize] = ((&control_points[j as usize].coords
                    - &temp[(jj + 1) as usize].coords * alfj)
                    / (T::one() - alfj))
                    .into();
                i += 1;
                ii += 1;
                j -= 1;
                jj -= 1;
            }

            let distance = if j - i < t {
                (&temp[(ii - 1) as usize] - &temp[(jj + 1) as usize]).norm()
            } else {
                let alfi = (u - uk(i)) / (uk(i + ord + t) - uk(i));
                let x = temp[(ii - 1) as usize].lerp(&temp[(ii + t + 1) as usize], alfi);
                (&control_points[i as usize] - &x).norm()
            };

            trace!("remove knot {:?}: attempt {} deviates by {:?}", u, t + 1, distance);
            if !(distance <= tolerance) {
                break;
            }
            deviation = deviation.max(distance);

            // accepted, save the new control points
            let (mut i, mut j) = (first, last);
            while j - i > t {
                control_points[i as usize] = temp[(i - off) as usize].clone();
                control_points[j as usize] = temp[(j - off) as usize].clone();
                i += 1;
                j -= 1;
            }
            first -= 1;
            last += 1;
            t += 1;
        }

        if t == 0 {
            return (self.clone(), 0, T::zero());
        }

        for k in (r + 1)..=m {
            knots[(k - t) as usize] = knots[k as usize];
        }
        knots.truncate((m + 1 - t) as usize);

        // control points j..=i are overwritten
        let mut j = fout;
        let mut i = j;
        for k in 1..t {
            if k % 2 == 1 {
                i += 1;
            } else {
                j -= 1;
            }
        }
        for k in (i + 1)..=n {
            control_points[j as usize] = control_points[k as usize].clone();
            j += 1;
        }
        control_points.truncate((n + 1 - t) as usize);

        (
            Self::new_unchecked(control_points, KnotVector::new(knots)),
            t as usize,
            deviation,
        )
    }
}
