use log::debug;
use nalgebra::allocator::Allocator;
use nalgebra::{
    Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector, Point3, Vector3, U1,
};
use simba::scalar::SupersetOf;

use crate::error::{ensure, scalar, NurbsError, Result};
use crate::knot::KnotVector;
use crate::misc::{Binomial, FloatingPoint, Invertible};

use super::FrenetFrame;

/// NURBS curve representation
/// By generics, it can be used for 2D or 3D curves with f32 or f64 scalar types.
///
/// Every coordinate of a control point is treated alike, so a weighted curve simply carries
/// its weight as the last, pre-multiplied coordinate.
/// The degree is never stored: it is `knots.len() - control_points.len() - 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct NurbsCurve<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points, in homogeneous coordinates for rational curves
    control_points: Vec<OPoint<T, D>>,
    /// knot vector for the NURBS curve
    /// the length of the knot vector is equal to the `# of control points + degree + 1`
    knots: KnotVector<T>,
}

/// 2D NURBS curve alias
pub type NurbsCurve2D<T> = NurbsCurve<T, Const<3>>;

/// 3D NURBS curve alias
pub type NurbsCurve3D<T> = NurbsCurve<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new NURBS curve
    /// # Failures
    /// - `DimensionMismatch` if there are no more control points than the degree,
    ///   or the number of knots is not the number of control points + the degree + 1
    /// - `MalformedKnotVector` if the knots are not finite and non-decreasing,
    ///   or a knot repeats more than `degree + 1` times, or the domain `[U[p], U[n + 1]]` is empty
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let control_points = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 2.),
    ///     Point2::new(2., 0.),
    /// ];
    /// let curve = NurbsCurve::try_new(2, control_points.clone(), vec![0., 0., 0., 1., 1., 1.]);
    /// assert!(curve.is_ok());
    /// let curve = NurbsCurve::try_new(2, control_points, vec![0., 0., 1., 1., 1.]);
    /// assert!(curve.is_err());
    /// ```
    pub fn try_new(degree: usize, control_points: Vec<OPoint<T, D>>, knots: Vec<T>) -> Result<Self> {
        ensure!(
            control_points.len() > degree,
            NurbsError::DimensionMismatch(format!(
                "too few control points for degree {}: {}",
                degree,
                control_points.len()
            ))
        );
        ensure!(
            knots.len() == control_points.len() + degree + 1,
            NurbsError::DimensionMismatch(format!(
                "invalid number of knots, got {}, expected {}",
                knots.len(),
                control_points.len() + degree + 1
            ))
        );

        let knots = KnotVector::try_new(knots)?;
        if let Some(m) = knots
            .multiplicity()
            .iter()
            .find(|m| m.multiplicity() > degree + 1)
        {
            return Err(NurbsError::MalformedKnotVector(format!(
                "knot {} repeats {} times, more than degree + 1",
                scalar(*m.knot()),
                m.multiplicity()
            )));
        }
        let (start, end) = knots.domain(degree);
        ensure!(
            start < end,
            NurbsError::MalformedKnotVector(format!(
                "empty knot domain [{}, {}]",
                scalar(start),
                scalar(end)
            ))
        );

        Ok(Self {
            control_points,
            knots,
        })
    }

    /// Create a Bezier curve of degree `control_points.len() - 1` on [0, 1]
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let curve = NurbsCurve::try_bezier(vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)]).unwrap();
    /// assert_eq!(curve.degree(), 2);
    /// assert_eq!(curve.knots().to_vec(), vec![0., 0., 0., 1., 1., 1.]);
    /// ```
    pub fn try_bezier(control_points: Vec<OPoint<T, D>>) -> Result<Self> {
        ensure!(
            !control_points.is_empty(),
            NurbsError::DimensionMismatch("a Bezier curve needs control points".to_string())
        );
        let n = control_points.len();
        let knots = [vec![T::zero(); n], vec![T::one(); n]].concat();
        Self::try_new(n - 1, control_points, knots)
    }

    /// Assemble a curve from parts that are consistent by construction
    pub(crate) fn new_unchecked(control_points: Vec<OPoint<T, D>>, knots: KnotVector<T>) -> Self {
        Self {
            control_points,
            knots,
        }
    }

    pub fn degree(&self) -> usize {
        self.knots.len() - self.control_points.len() - 1
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub fn control_points(&self) -> &Vec<OPoint<T, D>> {
        &self.control_points
    }

    pub fn control_points_iter(&self) -> impl Iterator<Item = &OPoint<T, D>> {
        self.control_points.iter()
    }

    /// Parameter range `[U[p], U[n + 1]]` in which the curve is defined
    pub fn knots_domain(&self) -> (T, T) {
        self.knots.domain(self.degree())
    }

    /// Check if the curve is clamped
    pub fn is_clamped(&self) -> bool {
        self.knots.is_clamped(self.degree())
    }

    fn span(&self, u: T) -> Result<usize> {
        self.knots
            .find_span(self.control_points.len() - 1, self.degree(), u)
    }

    fn point_in_span(&self, span: usize, u: T) -> OPoint<T, D> {
        let p = self.degree();
        let basis = self.knots.basis_functions(span, u, p);
        let mut position = OVector::<T, D>::zeros();
        for (i, b) in basis.iter().enumerate() {
            position += &self.control_points[span - p + i].coords * *b;
        }
        position.into()
    }

    fn derivatives_in_span(&self, span: usize, u: T, derivs: usize) -> Vec<OVector<T, D>> {
        let p = self.degree();
        let du = derivs.min(p);
        let nders = self.knots.derivative_basis_functions(span, u, p, du);

        let mut derivatives = vec![OVector::<T, D>::zeros(); derivs + 1];
        for (k, row) in nders.iter().enumerate() {
            for (j, n) in row.iter().enumerate() {
                derivatives[k] += &self.control_points[span - p + j].coords * *n;
            }
        }
        derivatives
    }

    /// Evaluate the curve at a parameter
    /// # Failures
    /// - `OutOfDomain` if `u` lies outside of the knot domain
    pub fn point(&self, u: T) -> Result<OPoint<T, D>> {
        let span = self.span(u)?;
        Ok(self.point_in_span(span, u))
    }

    /// Evaluate the curve at a batch of parameters.
    /// Every parameter is checked before anything is evaluated.
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let curve = NurbsCurve::try_new(
    ///     2,
    ///     vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)],
    ///     vec![0., 0., 0., 1., 1., 1.],
    /// ).unwrap();
    /// let points = curve.points(&[0., 0.5, 1.]).unwrap();
    /// assert_eq!(points[1], Point2::new(1., 1.));
    /// assert!(curve.points(&[0.5, 1.5]).is_err());
    /// ```
    pub fn points(&self, parameters: &[T]) -> Result<Vec<OPoint<T, D>>> {
        let spans = parameters
            .iter()
            .map(|u| self.span(*u))
            .collect::<Result<Vec<_>>>()?;
        Ok(spans
            .into_iter()
            .zip(parameters.iter())
            .map(|(span, u)| self.point_in_span(span, *u))
            .collect())
    }

    /// Evaluate the derivatives up to order `derivs` at a batch of parameters.
    /// The result is indexed by `[order][sample]`, orders above the degree are zero.
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::{Point2, Vector2};
    /// let line = NurbsCurve::try_new(
    ///     1,
    ///     vec![Point2::new(0., 0.), Point2::new(2., 0.)],
    ///     vec![0., 0., 1., 1.],
    /// ).unwrap();
    /// let ders = line.derivatives(&[0.3], 2).unwrap();
    /// assert_eq!(ders[1][0], Vector2::new(2., 0.));
    /// assert_eq!(ders[2][0], Vector2::zeros());
    /// ```
    pub fn derivatives(&self, parameters: &[T], derivs: usize) -> Result<Vec<Vec<OVector<T, D>>>> {
        let spans = parameters
            .iter()
            .map(|u| self.span(*u))
            .collect::<Result<Vec<_>>>()?;

        let mut derivatives = vec![Vec::with_capacity(parameters.len()); derivs + 1];
        for (span, u) in spans.into_iter().zip(parameters.iter()) {
            for (k, d) in self
                .derivatives_in_span(span, *u, derivs)
                .into_iter()
                .enumerate()
            {
                derivatives[k].push(d);
            }
        }
        Ok(derivatives)
    }

    /// Evaluate the curve at a parameter and project it back from homogeneous coordinates
    /// # Failures
    /// - `OutOfDomain` if `u` lies outside of the knot domain
    /// - `Degenerate` if the evaluated weight is zero
    pub fn point_at(&self, u: T) -> Result<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let p = self.point(u)?;
        dehomogenize(&p).ok_or_else(|| {
            NurbsError::Degenerate(format!("zero weight at parameter {}", scalar(u)))
        })
    }

    /// Derivatives of the projected rational curve up to order `derivs`,
    /// by the quotient rule on the homogeneous derivatives
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point3;
    /// use approx::assert_relative_eq;
    /// // quarter of the unit circle
    /// let w = 1. / 2_f64.sqrt();
    /// let arc = NurbsCurve2D::try_new(
    ///     2,
    ///     vec![Point3::new(1., 0., 1.), Point3::new(w, w, w), Point3::new(0., 1., 1.)],
    ///     vec![0., 0., 0., 1., 1., 1.],
    /// ).unwrap();
    /// let ders = arc.rational_derivatives(0.5, 1).unwrap();
    /// assert_relative_eq!(ders[0].norm(), 1., epsilon = 1e-12);
    /// assert_relative_eq!(ders[0].dot(&ders[1]), 0., epsilon = 1e-12);
    /// ```
    pub fn rational_derivatives(
        &self,
        u: T,
        derivs: usize,
    ) -> Result<Vec<OVector<T, DimNameDiff<D, U1>>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let span = self.span(u)?;
        let ders = self.derivatives_in_span(span, u, derivs);
        let w = D::dim() - 1;
        ensure!(
            ders[0][w] != T::zero(),
            NurbsError::Degenerate(format!("zero weight at parameter {}", scalar(u)))
        );

        let a_ders: Vec<_> = ders
            .iter()
            .map(|d| OVector::<T, DimNameDiff<D, U1>>::from_fn(|i, _| d[i]))
            .collect();
        let w_ders: Vec<_> = ders.iter().map(|d| d[w]).collect();

        let mut ck: Vec<OVector<T, DimNameDiff<D, U1>>> = vec![];
        let mut binom = Binomial::<T>::new();
        for k in 0..=derivs {
            let mut v = a_ders[k].clone();

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i];
                v -= &ck[k - i] * coef;
            }

            ck.push(v / w_ders[0]);
        }
        Ok(ck)
    }

    /// Points of the curve at each distinct knot of its domain
    pub fn knot_points(&self) -> Result<Vec<OPoint<T, D>>> {
        let (start, end) = self.knots_domain();
        let knots: Vec<_> = self
            .knots
            .distinct()
            .into_iter()
            .filter(|k| *k >= start && *k <= end)
            .collect();
        self.points(&knots)
    }

    /// Insert a sorted batch of knots without changing the shape of the curve
    /// # Failures
    /// - `InvalidKnotValue` if the knots are unsorted, lie outside of `[U[p], U[n + 1]]`
    ///   or would repeat a knot more than `degree + 1` times
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// let curve = NurbsCurve::try_bezier(vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(2., 0.)]).unwrap();
    /// let refined = curve.try_refine_knot(&[0.5]).unwrap();
    /// assert_eq!(refined.control_points().len(), 4);
    /// assert_eq!(refined.knots().to_vec(), vec![0., 0., 0., 0.5, 1., 1., 1.]);
    /// assert_eq!(refined.point(0.5).unwrap(), Point2::new(1., 1.));
    /// ```
    pub fn try_refine_knot(&self, knots_to_insert: &[T]) -> Result<Self> {
        if knots_to_insert.is_empty() {
            return Ok(self.clone());
        }

        let degree = self.degree();
        let (min, max) = self.knots_domain();

        if let Some(i) = knots_to_insert.windows(2).position(|w| w[1] < w[0]) {
            return Err(NurbsError::InvalidKnotValue(format!(
                "knots to insert are unsorted at index {}",
                i + 1
            )));
        }
        if let Some(k) = knots_to_insert.iter().find(|k| !(**k >= min && **k <= max)) {
            return Err(NurbsError::InvalidKnotValue(format!(
                "knot {} is outside of [{}, {}]",
                scalar(*k),
                scalar(min),
                scalar(max)
            )));
        }
        for inserted in KnotVector::new(knots_to_insert.to_vec()).multiplicity() {
            let existing = self
                .knots
                .multiplicity_of(*inserted.knot())
                .map_or(0, |(_, s)| s);
            ensure!(
                existing + inserted.multiplicity() <= degree + 1,
                NurbsError::InvalidKnotValue(format!(
                    "knot {} would repeat {} times, more than degree + 1",
                    scalar(*inserted.knot()),
                    existing + inserted.multiplicity()
                ))
            );
        }

        debug!(
            "refine: inserting {} knots into a degree {} curve with {} control points",
            knots_to_insert.len(),
            degree,
            self.control_points.len()
        );
        Ok(self.refine(knots_to_insert))
    }

    /// Knot refinement on inputs already known to be sorted and inside the domain
    pub(crate) fn refine(&self, knots_to_insert: &[T]) -> Self {
        if knots_to_insert.is_empty() {
            return self.clone();
        }

        let degree = self.degree();
        let control_points = &self.control_points;
        let knots = &self.knots;

        let n = control_points.len() - 1;
        let m = n + degree + 1;
        let r = knots_to_insert.len() - 1;
        let a = knots.locate_span(n, degree, knots_to_insert[0]);
        let b = knots.locate_span(n, degree, knots_to_insert[r]) + 1;

        let mut control_points_post = vec![OPoint::<T, D>::origin(); n + r + 2];
        let mut knots_post = vec![T::zero(); m + r + 2];

        control_points_post[..=(a - degree)].clone_from_slice(&control_points[..=(a - degree)]);
        for i in (b - 1)..=n {
            control_points_post[i + r + 1] = control_points[i].clone();
        }

        knots_post[..=a].copy_from_slice(&knots.as_slice()[..=a]);
        for i in (b + degree)..=m {
            knots_post[i + r + 1] = knots[i];
        }

        let mut i = b + degree - 1;
        let mut k = b + degree + r;

        for j in (0..=r).rev() {
            while knots_to_insert[j] <= knots[i] && i > a {
                control_points_post[k - degree - 1] = control_points[i - degree - 1].clone();
                knots_post[k] = knots[i];
                k -= 1;
                i -= 1;
            }
            control_points_post[k - degree - 1] = control_points_post[k - degree].clone();
            for l in 1..=degree {
                let ind = k - degree + l;
                let alpha = knots_post[k + l] - knots_to_insert[j];
                if alpha == T::zero() {
                    control_points_post[ind - 1] = control_points_post[ind].clone();
                } else {
                    let alpha = alpha / (knots_post[k + l] - knots[i - degree + l]);
                    control_points_post[ind - 1] = control_points_post[ind - 1]
                        .lerp(&control_points_post[ind], T::one() - alpha);
                }
            }
            knots_post[k] = knots_to_insert[j];
            k -= 1;
        }

        Self::new_unchecked(control_points_post, KnotVector::new(knots_post))
    }

    /// Re-express the curve on its domain `[U[p], U[n + 1]]` with `degree + 1` end knots.
    /// The curve is unchanged inside the domain.
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    /// let curve = NurbsCurve::try_new(
    ///     2,
    ///     vec![Point2::new(0., 0.), Point2::new(1., 1.), Point2::new(2., 0.), Point2::new(3., 1.)],
    ///     vec![0., 1., 2., 3., 4., 5., 6.],
    /// ).unwrap();
    /// let clamped = curve.clamped();
    /// assert!(clamped.is_clamped());
    /// assert_eq!(clamped.knots().to_vec(), vec![2., 2., 2., 3., 4., 4., 4.]);
    /// assert_relative_eq!(clamped.point(2.5).unwrap(), curve.point(2.5).unwrap(), epsilon = 1e-12);
    /// ```
    pub fn clamped(&self) -> Self {
        let degree = self.degree();
        if self.is_clamped() {
            return self.clone();
        }

        let (start, end) = self.knots_domain();
        let count = |v: T| self.knots.iter().filter(|k| **k == v).count();
        let mut insert = vec![start; (degree + 1).saturating_sub(count(start))];
        insert.extend(std::iter::repeat_n(
            end,
            (degree + 1).saturating_sub(count(end)),
        ));
        debug!("clamp: inserting {} end knots", insert.len());

        let refined = self.refine(&insert);
        let knots = refined.knots.as_slice();
        let head = knots.iter().position(|k| *k == start).unwrap_or(0);
        let tail = knots.len() - 1 - knots.iter().rposition(|k| *k == end).unwrap_or(knots.len() - 1);

        let control_points =
            refined.control_points[head..(refined.control_points.len() - tail)].to_vec();
        let knots = KnotVector::new(knots[head..(knots.len() - tail)].to_vec());
        Self::new_unchecked(control_points, knots)
    }

    /// Cast the curve to a curve with another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsCurve<F, D>
    where
        DefaultAllocator: Allocator<D>,
    {
        NurbsCurve {
            control_points: self
                .control_points
                .iter()
                .map(|p| p.clone().cast())
                .collect(),
            knots: self.knots.cast(),
        }
    }
}

impl<T: FloatingPoint, D: DimName> Invertible for NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Reverse the direction of the curve
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    /// let curve = NurbsCurve::try_new(
    ///     2,
    ///     vec![Point2::new(0., 0.), Point2::new(1., 2.), Point2::new(3., 2.), Point2::new(4., 0.)],
    ///     vec![0., 0., 0., 0.3, 1., 1., 1.],
    /// ).unwrap();
    /// let reversed = curve.inverse();
    /// assert_relative_eq!(reversed.point(0.2).unwrap(), curve.point(0.8).unwrap(), epsilon = 1e-12);
    /// ```
    fn invert(&mut self) {
        self.control_points.reverse();
        self.knots.invert();
    }
}

impl<T: FloatingPoint> NurbsCurve3D<T> {
    /// Frenet frame of the curve at a parameter, from its first three derivatives
    ///
    /// Where the curvature vanishes the normal is any unit vector perpendicular to the
    /// tangent and the torsion is zero.
    /// # Failures
    /// - `OutOfDomain` if `u` lies outside of the knot domain
    /// - `Degenerate` if the tangent vanishes or a weight is zero
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point4;
    /// use approx::assert_relative_eq;
    /// // quarter of the unit circle
    /// let w = 1. / 2_f64.sqrt();
    /// let arc = NurbsCurve3D::try_new(
    ///     2,
    ///     vec![Point4::new(1., 0., 0., 1.), Point4::new(w, w, 0., w), Point4::new(0., 1., 0., 1.)],
    ///     vec![0., 0., 0., 1., 1., 1.],
    /// ).unwrap();
    /// let frame = arc.frenet_frame(0.5).unwrap();
    /// assert_relative_eq!(frame.curvature(), 1., epsilon = 1e-10);
    /// assert_relative_eq!(frame.binormal().z, 1., epsilon = 1e-10);
    /// ```
    pub fn frenet_frame(&self, u: T) -> Result<FrenetFrame<T>> {
        let ders = self.rational_derivatives(u, 3)?;
        let (d1, d2, d3) = (&ders[1], &ders[2], &ders[3]);

        let speed = d1.norm();
        ensure!(
            speed > T::zero(),
            NurbsError::Degenerate(format!("zero tangent at parameter {}", scalar(u)))
        );
        let tangent = d1 / speed;

        let cross = d1.cross(d2);
        let area = cross.norm();
        let curvature = area / (speed * speed * speed);
        let (normal, torsion) = if curvature > T::default_epsilon() {
            let normal = (d2 - tangent * d2.dot(&tangent)).normalize();
            (normal, cross.dot(d3) / (area * area))
        } else {
            (perpendicular(&tangent), T::zero())
        };
        let binormal = tangent.cross(&normal);

        Ok(FrenetFrame::new(
            Point3::from(ders[0]),
            tangent,
            normal,
            binormal,
            curvature,
            torsion,
        ))
    }

    /// Frenet frames at each of the given parameters
    pub fn frenet_frames(&self, parameters: &[T]) -> Result<Vec<FrenetFrame<T>>> {
        parameters.iter().map(|u| self.frenet_frame(*u)).collect()
    }
}

/// Unit vector perpendicular to a unit vector, leaning away from its largest component
fn perpendicular<T: FloatingPoint>(v: &Vector3<T>) -> Vector3<T> {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());
    let axis = if x <= y && x <= z {
        Vector3::x()
    } else if y <= z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let side = v.cross(&axis).normalize();
    v.cross(&side).normalize()
}

/// Dehomogenize a point
pub fn dehomogenize<T: FloatingPoint, D: DimName>(
    point: &OPoint<T, D>,
) -> Option<OPoint<T, DimNameDiff<D, U1>>>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let v = &point.coords;
    let idx = D::dim() - 1;
    let w = v[idx];
    if w != T::zero() {
        let coords =
            v.generic_view((0, 0), (<D as DimNameSub<U1>>::Output::name(), Const::<1>)) / w;
        Some(OPoint { coords })
    } else {
        None
    }
}
