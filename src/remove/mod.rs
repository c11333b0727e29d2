//! Knot removal on curves
pub mod knot_removal;
