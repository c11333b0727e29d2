use argmin::core::{Error, Gradient, Hessian};
use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1,
};

use crate::{curve::NurbsCurve, misc::FloatingPoint};

/// Gradient and Hessian of the squared distance between a curve and a point,
/// up to a constant factor
pub struct CurveClosestParameterProblem<'a, T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// the point to project
    point: &'a OPoint<T, DimNameDiff<D, U1>>,
    /// the curve to project onto
    curve: &'a NurbsCurve<T, D>,
}

impl<'a, T: FloatingPoint, D: DimName> CurveClosestParameterProblem<'a, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    pub fn new(point: &'a OPoint<T, DimNameDiff<D, U1>>, curve: &'a NurbsCurve<T, D>) -> Self {
        Self { point, curve }
    }
}

impl<T: FloatingPoint, D: DimName> Gradient for CurveClosestParameterProblem<'_, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = T;
    type Gradient = T;

    /// C'(u) * (C(u) - P)
    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, Error> {
        let e = self.curve.rational_derivatives(*param, 1)?;
        let d = &e[0] - &self.point.coords;
        Ok(e[1].dot(&d))
    }
}

impl<T: FloatingPoint, D: DimName> Hessian for CurveClosestParameterProblem<'_, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = T;
    type Hessian = T;

    /// C''(u) * (C(u) - P) + C'(u) * C'(u)
    fn hessian(&self, param: &Self::Param) -> Result<Self::Hessian, Error> {
        let e = self.curve.rational_derivatives(*param, 2)?;
        let d = &e[0] - &self.point.coords;
        Ok(e[2].dot(&d) + e[1].dot(&e[1]))
    }
}
