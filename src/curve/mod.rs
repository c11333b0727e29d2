pub mod frenet_frame;
pub mod knot_style;
pub mod nurbs_curve;
pub use frenet_frame::*;
pub use knot_style::*;
pub use nurbs_curve::*;
