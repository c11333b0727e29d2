use crate::curve::KnotStyle;

pub mod curve;
pub mod interpolation_matrix;
pub use interpolation_matrix::*;

/// Interpolation trait
pub trait Interpolation {
    type Input;
    type Output;
    fn interpolate(input: &Self::Input, degree: usize, knot_style: KnotStyle) -> Self::Output;
}
