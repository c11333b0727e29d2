use nalgebra::RealField;
use num_traits::ToPrimitive;

/// Scalar type accepted by the kernel (f32, f64)
/// `ToPrimitive` is only needed to report values inside errors
pub trait FloatingPoint: RealField + ToPrimitive + Copy {}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}
