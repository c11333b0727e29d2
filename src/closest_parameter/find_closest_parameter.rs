use argmin::core::{ArgminFloat, Executor, State};
use log::debug;
use nalgebra::{
    allocator::Allocator, convert, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1,
};

use crate::{
    curve::NurbsCurve,
    error::{ensure, scalar, NurbsError, Result},
    misc::FloatingPoint,
};

use super::{ClosestParameterNewton, CurveClosestParameterProblem};

const MAX_ITERS: u64 = 20;
const MIN_SEEDS: usize = 20;

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Find the parameter of the curve point closest to `point`
    ///
    /// The nearest of evenly spaced samples seeds a Newton search on the distance,
    /// which keeps the parameter inside the domain. Curves whose first and last control
    /// points coincide wrap around instead.
    /// # Failures
    /// - `Degenerate` if the point is not finite, a weight vanishes, or the search fails
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// use nalgebra::{Point2, Point3};
    /// use approx::assert_relative_eq;
    /// let line = NurbsCurve2D::try_new(
    ///     1,
    ///     vec![Point3::new(0., 0., 1.), Point3::new(4., 0., 1.)],
    ///     vec![0., 0., 1., 1.],
    /// ).unwrap();
    /// let u = line.find_closest_parameter(&Point2::new(1., 2.)).unwrap();
    /// assert_relative_eq!(u, 0.25, epsilon = 1e-10);
    /// ```
    pub fn find_closest_parameter(&self, point: &OPoint<T, DimNameDiff<D, U1>>) -> Result<T>
    where
        T: ArgminFloat,
    {
        ensure!(
            point.coords.iter().all(|c| scalar(*c).is_finite()),
            NurbsError::Degenerate("the point to project is not finite".to_string())
        );

        let (start, end) = self.knots_domain();
        let seeds = (self.control_points().len() * self.degree()).max(MIN_SEEDS);
        let step = (end - start) * convert::<f64, T>(1. / seeds as f64);

        let mut u = start;
        let mut min: Option<T> = None;
        for i in 0..=seeds {
            let s = if i == seeds {
                end
            } else {
                start + step * convert::<f64, T>(i as f64)
            };
            let d = (self.point_at(s)? - point).norm_squared();
            if min.map_or(true, |m| d < m) {
                min = Some(d);
                u = s;
            }
        }

        let control_points = self.control_points();
        let closed = (&control_points[0] - &control_points[control_points.len() - 1]).norm()
            < T::default_epsilon();
        let tolerance = (end - start) * convert::<f64, T>(1e-12);

        let solver = ClosestParameterNewton::new((start, end), closed, tolerance);
        let res = Executor::new(CurveClosestParameterProblem::new(point, self), solver)
            .configure(|state| state.param(u).max_iters(MAX_ITERS))
            .run()
            .map_err(|e| {
                NurbsError::Degenerate(format!("closest parameter search failed: {}", e))
            })?;

        let found = res.state().get_param().cloned().ok_or_else(|| {
            NurbsError::Degenerate("closest parameter search produced no parameter".to_string())
        })?;
        debug!(
            "closest parameter: seed {} refined to {}",
            scalar(u),
            scalar(found)
        );
        Ok(found)
    }

    /// Find the curve point closest to `point` with its parameter
    pub fn find_closest_point(
        &self,
        point: &OPoint<T, DimNameDiff<D, U1>>,
    ) -> Result<(T, OPoint<T, DimNameDiff<D, U1>>)>
    where
        T: ArgminFloat,
    {
        let u = self.find_closest_parameter(point)?;
        Ok((u, self.point_at(u)?))
    }
}
