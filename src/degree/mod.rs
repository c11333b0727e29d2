//! Degree elevation and reduction of curves
pub mod degree_elevation;
pub mod degree_reduction;
pub mod degree_reduction_option;
pub use degree_reduction_option::*;
