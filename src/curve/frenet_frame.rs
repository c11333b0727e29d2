use nalgebra::{IsometryMatrix3, Point3, Rotation3, Translation3, Vector3};

use crate::misc::FloatingPoint;

/// Moving frame of a space curve at one parameter,
/// with the curvature and torsion that drive it
#[derive(Clone, Debug, PartialEq)]
pub struct FrenetFrame<T: FloatingPoint> {
    position: Point3<T>,
    tangent: Vector3<T>,
    normal: Vector3<T>,
    binormal: Vector3<T>,
    curvature: T,
    torsion: T,
}

impl<T: FloatingPoint> FrenetFrame<T> {
    pub fn new(
        position: Point3<T>,
        tangent: Vector3<T>,
        normal: Vector3<T>,
        binormal: Vector3<T>,
        curvature: T,
        torsion: T,
    ) -> Self {
        Self {
            position,
            tangent,
            normal,
            binormal,
            curvature,
            torsion,
        }
    }

    pub fn position(&self) -> &Point3<T> {
        &self.position
    }

    pub fn tangent(&self) -> &Vector3<T> {
        &self.tangent
    }

    pub fn normal(&self) -> &Vector3<T> {
        &self.normal
    }

    pub fn binormal(&self) -> &Vector3<T> {
        &self.binormal
    }

    /// Always non-negative, zero where the curve is straight
    pub fn curvature(&self) -> T {
        self.curvature
    }

    /// Zero where the curvature vanishes
    pub fn torsion(&self) -> T {
        self.torsion
    }

    /// Transformation from frame coordinates to world coordinates
    pub fn matrix(&self) -> IsometryMatrix3<T> {
        let rot = Rotation3::face_towards(&self.tangent, &self.normal);
        let trans = Translation3::from(self.position);
        trans * rot
    }
}
