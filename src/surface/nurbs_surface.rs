use nalgebra::{
    allocator::Allocator, Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint,
    OVector, U1,
};
use simba::scalar::SupersetOf;

use crate::{
    curve::dehomogenize,
    error::{ensure, scalar, NurbsError, Result},
    knot::KnotVector,
    misc::FloatingPoint,
};

/// NURBS surface representation
/// by generics, it can be used for 2D or 3D surfaces with f32 or f64 scalar types
///
/// `control_points[r][c]` is the control point of the `r`-th row along u and `c`-th column along v.
/// The degrees are derived from the grid size and the knot counts.
#[derive(Clone, Debug, PartialEq)]
pub struct NurbsSurface<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates
    /// the last element of the vector is the `weight`
    control_points: Vec<Vec<OPoint<T, D>>>,
    u_knots: KnotVector<T>,
    v_knots: KnotVector<T>,
}

/// 2D NURBS surface alias
pub type NurbsSurface2D<T> = NurbsSurface<T, Const<3>>;
/// 3D NURBS surface alias
pub type NurbsSurface3D<T> = NurbsSurface<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsSurface<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new NURBS surface
    /// # Failures
    /// - `DimensionMismatch` if the grid is empty or not rectangular, has no more rows (columns)
    ///   than the u (v) degree, or a knot count does not match the grid
    /// - `MalformedKnotVector` if a knot vector is not finite and non-decreasing,
    ///   repeats a knot more than `degree + 1` times or has an empty domain
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::Point3;
    /// let grid = vec![
    ///     vec![Point3::new(0., 0., 0.), Point3::new(0., 1., 0.)],
    ///     vec![Point3::new(1., 0., 0.), Point3::new(1., 1., 1.)],
    /// ];
    /// let surface = NurbsSurface::try_new(1, 1, grid, vec![0., 0., 1., 1.], vec![0., 0., 1., 1.]).unwrap();
    /// assert_eq!(surface.point(0.5, 0.5).unwrap(), Point3::new(0.5, 0.5, 0.25));
    /// ```
    pub fn try_new(
        u_degree: usize,
        v_degree: usize,
        control_points: Vec<Vec<OPoint<T, D>>>,
        u_knots: Vec<T>,
        v_knots: Vec<T>,
    ) -> Result<Self> {
        let rows = control_points.len();
        let columns = control_points.first().map(|row| row.len()).unwrap_or(0);
        ensure!(
            rows > 0 && columns > 0,
            NurbsError::DimensionMismatch("control point grid is empty".to_string())
        );
        if let Some(r) = control_points.iter().position(|row| row.len() != columns) {
            return Err(NurbsError::DimensionMismatch(format!(
                "row {} has {} control points, expected {}",
                r,
                control_points[r].len(),
                columns
            )));
        }

        let u_knots = checked_knots(u_knots, rows, u_degree, "u")?;
        let v_knots = checked_knots(v_knots, columns, v_degree, "v")?;

        Ok(Self {
            control_points,
            u_knots,
            v_knots,
        })
    }

    pub fn u_degree(&self) -> usize {
        self.u_knots.len() - self.control_points.len() - 1
    }

    pub fn v_degree(&self) -> usize {
        self.v_knots.len() - self.control_points[0].len() - 1
    }

    pub fn u_knots(&self) -> &KnotVector<T> {
        &self.u_knots
    }

    pub fn v_knots(&self) -> &KnotVector<T> {
        &self.v_knots
    }

    pub fn control_points(&self) -> &Vec<Vec<OPoint<T, D>>> {
        &self.control_points
    }

    /// Get the u domain of the knot vector by degree
    pub fn u_knots_domain(&self) -> (T, T) {
        self.u_knots.domain(self.u_degree())
    }

    /// Get the v domain of the knot vector by degree
    pub fn v_knots_domain(&self) -> (T, T) {
        self.v_knots.domain(self.v_degree())
    }

    fn spans(&self, u: T, v: T) -> Result<(usize, usize)> {
        let n = self.control_points.len() - 1;
        let m = self.control_points[0].len() - 1;
        let span_u = self.u_knots.find_span(n, self.u_degree(), u)?;
        let span_v = self.v_knots.find_span(m, self.v_degree(), v)?;
        Ok((span_u, span_v))
    }

    fn point_in_spans(&self, span_u: usize, span_v: usize, u: T, v: T) -> OPoint<T, D> {
        let (p, q) = (self.u_degree(), self.v_degree());
        let u_basis = self.u_knots.basis_functions(span_u, u, p);
        let v_basis = self.v_knots.basis_functions(span_v, v, q);
        let uind = span_u - p;

        let mut position = OVector::<T, D>::zeros();
        for (l, nv) in v_basis.iter().enumerate() {
            let vind = span_v - q + l;
            // sample u isoline
            let mut temp = OVector::<T, D>::zeros();
            for (k, nu) in u_basis.iter().enumerate() {
                temp += &self.control_points[uind + k][vind].coords * *nu;
            }
            position += temp * *nv;
        }
        position.into()
    }

    fn derivatives_in_spans(
        &self,
        span_u: usize,
        span_v: usize,
        u: T,
        v: T,
        mu: usize,
        mv: usize,
    ) -> Vec<Vec<OVector<T, D>>> {
        let (p, q) = (self.u_degree(), self.v_degree());
        let du = mu.min(p);
        let dv = mv.min(q);
        let uders = self
            .u_knots
            .derivative_basis_functions(span_u, u, p, du);
        let vders = self
            .v_knots
            .derivative_basis_functions(span_v, v, q, dv);

        let mut skl = vec![vec![OVector::<T, D>::zeros(); mv + 1]; mu + 1];
        let mut temp = vec![OVector::<T, D>::zeros(); q + 1];
        for k in 0..=du {
            for (s, column) in temp.iter_mut().enumerate() {
                *column = OVector::<T, D>::zeros();
                for r in 0..=p {
                    *column += &self.control_points[span_u - p + r][span_v - q + s].coords
                        * uders[k][r];
                }
            }
            for l in 0..=dv {
                for (s, column) in temp.iter().enumerate() {
                    skl[k][l] += column * vders[l][s];
                }
            }
        }
        skl
    }

    /// Evaluate the surface at the given u, v parameters to get a point
    /// # Failures
    /// - `OutOfDomain` if `u` or `v` lies outside of its knot domain
    pub fn point(&self, u: T, v: T) -> Result<OPoint<T, D>> {
        let (span_u, span_v) = self.spans(u, v)?;
        Ok(self.point_in_spans(span_u, span_v, u, v))
    }

    /// Evaluate the surface at a batch of (u, v) parameters.
    /// Every parameter pair is checked before anything is evaluated.
    pub fn points(&self, parameters: &[(T, T)]) -> Result<Vec<OPoint<T, D>>> {
        let spans = parameters
            .iter()
            .map(|(u, v)| self.spans(*u, *v))
            .collect::<Result<Vec<_>>>()?;
        Ok(spans
            .into_iter()
            .zip(parameters.iter())
            .map(|((su, sv), (u, v))| self.point_in_spans(su, sv, *u, *v))
            .collect())
    }

    /// Evaluate the partial derivatives of order `k <= mu` along u and `l <= mv` along v
    /// at a batch of (u, v) parameters.
    ///
    /// The result is indexed by `[k][l][sample]`; orders above the degree in a direction are zero.
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::{Point3, Vector3};
    /// let grid = vec![
    ///     vec![Point3::new(0., 0., 0.), Point3::new(0., 1., 0.)],
    ///     vec![Point3::new(1., 0., 0.), Point3::new(1., 1., 1.)],
    /// ];
    /// let surface = NurbsSurface::try_new(1, 1, grid, vec![0., 0., 1., 1.], vec![0., 0., 1., 1.]).unwrap();
    /// let ders = surface.derivatives(&[(0.25, 0.5)], 1, 1).unwrap();
    /// assert_eq!(ders[1][0][0], Vector3::new(1., 0., 0.5));
    /// assert_eq!(ders[1][1][0], Vector3::new(0., 0., 1.));
    /// ```
    #[allow(clippy::type_complexity)]
    pub fn derivatives(
        &self,
        parameters: &[(T, T)],
        mu: usize,
        mv: usize,
    ) -> Result<Vec<Vec<Vec<OVector<T, D>>>>> {
        let spans = parameters
            .iter()
            .map(|(u, v)| self.spans(*u, *v))
            .collect::<Result<Vec<_>>>()?;

        let mut derivatives = vec![vec![Vec::with_capacity(parameters.len()); mv + 1]; mu + 1];
        for ((su, sv), (u, v)) in spans.into_iter().zip(parameters.iter()) {
            let skl = self.derivatives_in_spans(su, sv, *u, *v, mu, mv);
            for (k, row) in skl.into_iter().enumerate() {
                for (l, d) in row.into_iter().enumerate() {
                    derivatives[k][l].push(d);
                }
            }
        }
        Ok(derivatives)
    }

    /// Evaluate the surface at the given u, v parameters and project it back from homogeneous coordinates
    /// # Failures
    /// - `OutOfDomain` if `u` or `v` lies outside of its knot domain
    /// - `Degenerate` if the evaluated weight is zero
    pub fn point_at(&self, u: T, v: T) -> Result<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let p = self.point(u, v)?;
        dehomogenize(&p).ok_or_else(|| {
            NurbsError::Degenerate(format!(
                "zero weight at parameters ({}, {})",
                scalar(u),
                scalar(v)
            ))
        })
    }

    /// Cast the surface to a surface with another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsSurface<F, D> {
        NurbsSurface {
            control_points: self
                .control_points
                .iter()
                .map(|row| row.iter().map(|p| p.clone().cast()).collect())
                .collect(),
            u_knots: self.u_knots.cast(),
            v_knots: self.v_knots.cast(),
        }
    }
}

/// Validate the knot vector of one direction of the grid
fn checked_knots<T: FloatingPoint>(
    knots: Vec<T>,
    count: usize,
    degree: usize,
    direction: &str,
) -> Result<KnotVector<T>> {
    ensure!(
        count > degree,
        NurbsError::DimensionMismatch(format!(
            "too few control points along {} for degree {}: {}",
            direction, degree, count
        ))
    );
    ensure!(
        knots.len() == count + degree + 1,
        NurbsError::DimensionMismatch(format!(
            "invalid number of {} knots, got {}, expected {}",
            direction,
            knots.len(),
            count + degree + 1
        ))
    );

    let knots = KnotVector::try_new(knots)?;
    if let Some(m) = knots
        .multiplicity()
        .iter()
        .find(|m| m.multiplicity() > degree + 1)
    {
        return Err(NurbsError::MalformedKnotVector(format!(
            "{} knot {} repeats {} times, more than degree + 1",
            direction,
            scalar(*m.knot()),
            m.multiplicity()
        )));
    }
    let (start, end) = knots.domain(degree);
    ensure!(
        start < end,
        NurbsError::MalformedKnotVector(format!(
            "empty {} knot domain [{}, {}]",
            direction,
            scalar(start),
            scalar(end)
        ))
    );
    Ok(knots)
}
