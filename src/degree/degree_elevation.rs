use log::{debug, trace};
use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, OVector};

use crate::{
    bezier::elevation_coefficients,
    curve::NurbsCurve,
    knot::KnotVector,
    misc::{Binomial, FloatingPoint},
};

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Raise the degree of the curve by `t` without changing its shape.
    ///
    /// Every distinct interior knot gains `t` in multiplicity, which keeps the continuity
    /// of the curve. An unclamped curve is clamped to its domain first.
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
    /// let elevated = curve.elevate_degree(1);
    /// assert_eq!(elevated.degree(), 3);
    /// assert_eq!(elevated.knots().to_vec(), vec![0., 0., 0., 0., 0.5, 0.5, 1., 1., 1., 1.]);
    /// assert_relative_eq!(elevated.point(0.3).unwrap(), curve.point(0.3).unwrap(), epsilon = 1e-12);
    /// ```
    pub fn elevate_degree(&self, t: usize) -> Self {
        if t == 0 {
            return self.clone();
        }

        let curve = self.clamped();
        let p = curve.degree();
        let ph = p + t;
        let mut binom = Binomial::<T>::new();
        let bezalfs = elevation_coefficients(p, t, &mut binom);

        let pieces: Vec<_> = split_at_discontinuities(&curve)
            .iter()
            .map(|piece| {
                if p == 0 {
                    let (a, b) = piece.knots_domain();
                    let knots = [vec![a; ph + 1], vec![b; ph + 1]].concat();
                    let control_points = vec![piece.control_points()[0].clone(); ph + 1];
                    NurbsCurve::new_unchecked(control_points, KnotVector::new(knots))
                } else {
                    elevate_continuous(piece, t, &bezalfs)
                }
            })
            .collect();

        let mut control_points = vec![];
        let mut knots = vec![];
        let count = pieces.len();
        for (i, piece) in pieces.into_iter().enumerate() {
            let piece_knots = piece.knots().as_slice();
            if i + 1 < count {
                knots.extend_from_slice(&piece_knots[..(piece_knots.len() - ph - 1)]);
            } else {
                knots.extend_from_slice(piece_knots);
            }
            control_points.extend(piece.control_points().iter().cloned());
        }

        debug!(
            "elevate degree {} -> {}: {} control points",
            p,
            ph,
            control_points.len()
        );
        NurbsCurve::new_unchecked(control_points, KnotVector::new(knots))
    }
}

/// Split a clamped curve where a knot repeats `degree + 1` times
fn split_at_discontinuities<T: FloatingPoint, D: DimName>(
    curve: &NurbsCurve<T, D>,
) -> Vec<NurbsCurve<T, D>>
where
    DefaultAllocator: Allocator<D>,
{
    let p = curve.degree();
    let (start, end) = curve.knots_domain();
    let knots = curve.knots().as_slice();
    let control_points = curve.control_points();

    let mut pieces = vec![];
    let mut from = 0;
    let mut index = 0;
    for group in curve.knots().multiplicity() {
        let k = index;
        index += group.multiplicity();
        let v = *group.knot();
        if v > start && v < end && group.multiplicity() > p {
            pieces.push(NurbsCurve::new_unchecked(
                control_points[from..k].to_vec(),
                KnotVector::new(knots[from..=(k + p)].to_vec()),
            ));
            from = k;
        }
    }
    pieces.push(NurbsCurve::new_unchecked(
        control_points[from..].to_vec(),
        KnotVector::new(knots[from..].to_vec()),
    ));
    pieces
}

/// Degree elevation of a clamped curve of degree >= 1 whose interior knots repeat at most
/// `degree` times, with the Bezier elevation coefficients of `elevation_coefficients`
fn elevate_continuous<T: FloatingPoint, D: DimName>(
    curve: &NurbsCurve<T, D>,
    t: usize,
    bezalfs: &[Vec<T>],
) -> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    let points = curve.control_points();
    let knots = curve.knots();
    let p = curve.degree();
    let m = knots.len() - 1;
    let ph = p + t;
    let segments = knots.distinct().len();

    let mut qw = vec![OPoint::<T, D>::origin(); points.len() + t * segments + ph + 1];
    let mut uh = vec![T::zero(); knots.len() + (t + 1) * segments + ph + 1];

    let mut bpts = points[..=p].to_vec();
    let mut ebpts = vec![OPoint::<T, D>::origin(); ph + 1];
    let mut nbpts = vec![OPoint::<T, D>::origin(); p];
    let mut alfs = vec![T::zero(); p];

    let ph_i = ph as isize;
    let mut mh = ph;
    let mut kind = ph + 1;
    let mut r: isize = -1;
    let mut a = p;
    let mut b = p + 1;
    let mut cind = 1;
    let mut ua = knots[0];

    qw[0] = points[0].clone();
    uh[..=ph].iter_mut().for_each(|u| *u = ua);

    while b < m {
        let i = b;
        while b < m && knots[b] == knots[b + 1] {
            b += 1;
        }
        let mul = b - i + 1;
        mh += mul + t;
        let ub = knots[b];
        let oldr = r;
        r = p as isize - mul as isize;

        let lbz = if oldr > 0 { (oldr + 2) / 2 } else { 1 };
        let rbz = if r > 0 { ph_i - (r + 1) / 2 } else { ph_i };

        if r > 0 {
            // insert knot ub r times to get the Bezier segment
            let numer = ub - ua;
            for k in ((mul + 1)..=p).rev() {
                alfs[k - mul - 1] = numer / (knots[a + k] - ua);
            }
            for j in 1..=(r as usize) {
                let save = r as usize - j;
                let s = mul + j;
                for k in (s..=p).rev() {
                    bpts[k] = bpts[k - 1].lerp(&bpts[k], alfs[k - s]);
                }
                nbpts[save] = bpts[p].clone();
            }
        }

        // elevate the Bezier segment, only lbz..=ph are used below
        for i in (lbz as usize)..=ph {
            let mut v = OVector::<T, D>::zeros();
            for j in i.saturating_sub(t)..=p.min(i) {
                v += &bpts[j].coords * bezalfs[i][j];
            }
            ebpts[i] = v.into();
        }

        if oldr > 1 {
            // remove knot ua oldr times
            let kind_i = kind as isize;
            let mut first = kind_i - 2;
            let mut last = kind_i;
            let den = ub - ua;
            let bet = (ub - uh[kind - 1]) / den;

            for tr in 1..oldr {
                let (mut i, mut j) = (first, last);
                let mut kj = j - kind_i + 1;
                while j - i > tr {
                    if i < cind as isize {
                        let iu = i as usize;
                        let alf = (ub - uh[iu]) / (ua - uh[iu]);
                        qw[iu] = qw[iu - 1].lerp(&qw[iu], alf);
                    }
                    if j >= lbz {
                        let ku = kj as usize;
                        let weight = if j - tr <= kind_i - ph_i + oldr {
                            (ub - uh[(j - tr) as usize]) / den
                        } else {
                            bet
                        };
                        ebpts[ku] = ebpts[ku + 1].lerp(&ebpts[ku], weight);
                    }
                    i += 1;
                    j -= 1;
                    kj -= 1;
                }
                first -= 1;
                last += 1;
            }
        }

        if a != p {
            // load the knot ua
            for _ in 0..(ph_i - oldr) {
                uh[kind] = ua;
                kind += 1;
            }
        }

        for j in lbz..=rbz {
            qw[cind] = ebpts[j as usize].clone();
            cind += 1;
        }
        trace!(
            "elevate: segment ending at {:?}, multiplicity {}, {} control points so far",
            ub,
            mul,
            cind
        );

        if b < m {
            // set up for the next pass
            let r0 = r.max(0) as usize;
            bpts[..r0].clone_from_slice(&nbpts[..r0]);
            bpts[r0..=p].clone_from_slice(&points[(b - p + r0)..=b]);
            a = b;
            b += 1;
            ua = ub;
        } else {
            uh[kind..=(kind + ph)].iter_mut().for_each(|u| *u = ub);
        }
    }

    qw.truncate(mh - ph);
    uh.truncate(kind + ph + 1);
    NurbsCurve::new_unchecked(qw, KnotVector::new(uh))
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use approx::assert_relative_eq;
    use nalgebra::{Const, Point2, Point3};

    fn check_same_shape(a: &NurbsCurve<f64, Const<3>>, b: &NurbsCurve<f64, Const<3>>) {
        let (start, end) = a.knots_domain();
        for s in 0..=40 {
            let u = start + (end - start) * s as f64 / 40.;
            assert_relative_eq!(a.point(u).unwrap(), b.point(u).unwrap(), epsilon = 1e-10);
        }
    }

    fn curve() -> NurbsCurve<f64, Const<3>> {
        NurbsCurve::try_new(
            3,
            vec![
                Point3::new(0., 0., 1.),
                Point3::new(1., 2., 1.),
                Point3::new(2., -1., 0.5),
                Point3::new(3., 3., 1.),
                Point3::new(4., 0., 2.),
                Point3::new(5., 1., 1.),
                Point3::new(6., 0., 1.),
            ],
            vec![0., 0., 0., 0., 0.25, 0.5, 0.5, 1., 1., 1., 1.],
        )
        .unwrap()
    }

    #[test]
    fn elevation_keeps_the_shape() {
        let curve = curve();
        for t in 1..=3 {
            let elevated = curve.elevate_degree(t);
            assert_eq!(elevated.degree(), 3 + t);
            // each distinct knot gains t
            assert_eq!(
                elevated.knots().len(),
                curve.knots().len() + t * curve.knots().distinct().len()
            );
            assert_eq!(
                elevated.control_points().len() + elevated.degree() + 1,
                elevated.knots().len()
            );
            check_same_shape(&curve, &elevated);
        }
    }

    #[test]
    fn zero_elevation_is_identity() {
        let curve = curve();
        assert_eq!(curve.elevate_degree(0), curve);
    }

    #[test]
    fn elevation_of_a_line() {
        let line = NurbsCurve::try_new(
            1,
            vec![Point2::new(0., 0.), Point2::new(3., 3.)],
            vec![0., 0., 1., 1.],
        )
        .unwrap();
        let elevated = line.elevate_degree(2);
        assert_eq!(elevated.degree(), 3);
        for (i, p) in elevated.control_points().iter().enumerate() {
            assert_relative_eq!(*p, Point2::new(i as f64, i as f64), epsilon = 1e-12);
        }
    }

    #[test]
    fn elevation_across_a_discontinuity() {
        let curve = NurbsCurve::try_new(
            2,
            vec![
                Point3::new(0., 0., 1.),
                Point3::new(1., 1., 1.),
                Point3::new(2., 0., 1.),
                Point3::new(5., 5., 1.),
                Point3::new(6., 6., 1.),
                Point3::new(7., 5., 1.),
            ],
            vec![0., 0., 0., 1., 1., 1., 2., 2., 2.],
        )
        .unwrap();
        let elevated = curve.elevate_degree(1);
        assert_eq!(
            elevated.knots().to_vec(),
            vec![0., 0., 0., 0., 1., 1., 1., 1., 2., 2., 2., 2.]
        );
        check_same_shape(&curve, &elevated);
        assert_relative_eq!(
            elevated.point(1.).unwrap(),
            curve.point(1.).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn elevation_of_a_piecewise_constant_curve() {
        let curve = NurbsCurve::try_new(
            0,
            vec![Point2::new(0., 0.), Point2::new(1., 1.)],
            vec![0., 0.5, 1.],
        )
        .unwrap();
        let elevated = curve.elevate_degree(1);
        assert_eq!(elevated.knots().to_vec(), vec![0., 0., 0.5, 0.5, 1., 1.]);
        assert_eq!(elevated.point(0.25).unwrap(), Point2::new(0., 0.));
        assert_eq!(elevated.point(0.75).unwrap(), Point2::new(1., 1.));
    }
}
