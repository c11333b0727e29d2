#![allow(clippy::needless_range_loop)]
//! NURBS curve and surface kernel: span search, basis functions, evaluation,
//! knot refinement and removal, Bezier decomposition, degree elevation and reduction,
//! global interpolation, point projection and Frenet frames.
//!
//! Weighted control points carry the weight as their last, pre-multiplied coordinate
//! and go through the same algorithms as plain points.

mod bezier;
mod closest_parameter;
mod curve;
mod decompose;
mod degree;
mod error;
mod interpolation;
mod knot;
mod misc;
mod remove;
mod surface;

pub mod prelude {
    pub use crate::bezier::*;
    pub use crate::closest_parameter::*;
    pub use crate::curve::*;
    pub use crate::decompose::*;
    pub use crate::degree::*;
    pub use crate::error::{NurbsError, Result};
    pub use crate::interpolation::*;
    pub use crate::knot::*;
    pub use crate::misc::*;
    pub use crate::surface::*;
}
