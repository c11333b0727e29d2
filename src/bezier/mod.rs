//! Utilities on single Bezier curves, given by their `degree + 1` control points

pub mod bernstein;
pub mod bezier_degree;
pub mod de_casteljau;
pub use bernstein::*;
pub use bezier_degree::*;
pub use de_casteljau::*;
