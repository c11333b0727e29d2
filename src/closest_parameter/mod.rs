//! Point projection onto curves by Newton iterations
pub mod closest_parameter_newton;
pub mod curve_closest_parameter_problem;
pub mod find_closest_parameter;
pub use closest_parameter_newton::*;
pub use curve_closest_parameter_problem::*;
