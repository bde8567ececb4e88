//! Rigid-transform utilities shared by the walker, the Jacobian builder and
//! the solver.
//!
//! Poses are `nalgebra::Isometry3<f64>`, so composition is `*` and the inverse
//! is the exact rigid inverse rather than a general 4x4 matrix inverse. The
//! helpers here exist for the operations nalgebra does not spell the way the
//! controller needs them: skew matrices, angle-axis extraction through the
//! eigenvalue-1 direction, and URDF-style `xyz`/`rpy` origins.
//!
//! # Examples
//!
//! ```rust
//! use cartesian_control::transforms::{compose, invert, Pose};
//! use nalgebra::Vector3;
//!
//! let p = Pose::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.1, 0.2, 0.3));
//! let identity = compose(&p, &invert(&p));
//! assert!(identity.translation.vector.norm() < 1e-12);
//! ```

use nalgebra::{Isometry3, Matrix3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::KinematicsError;

pub type Pose = Isometry3<f64>;

/// Eigenvalues closer to 1 than this count as the rotation axis.
pub const EIGENVALUE_TOLERANCE: f64 = 1e-8;

/// Axis components smaller than this are not used as a divisor.
const AXIS_COMPONENT_EPSILON: f64 = 1e-8;

pub fn compose(a: &Pose, b: &Pose) -> Pose {
    a * b
}

pub fn invert(pose: &Pose) -> Pose {
    pose.inverse()
}

pub fn translation(pose: &Pose) -> Vector3<f64> {
    pose.translation.vector
}

pub fn rotation(pose: &Pose) -> Matrix3<f64> {
    pose.rotation.to_rotation_matrix().into_inner()
}

/// Builds a pose rotating by `angle` about `axis`, then translated by `translation`.
///
/// A zero axis yields a pure translation.
pub fn from_axis_angle(angle: f64, axis: &Vector3<f64>, translation: Vector3<f64>) -> Pose {
    let rotation = match Unit::try_new(*axis, f64::EPSILON) {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle),
        None => UnitQuaternion::identity(),
    };
    Isometry3::from_parts(Translation3::from(translation), rotation)
}

/// Builds a pose from a URDF origin: translation `xyz`, then fixed-axis
/// roll, pitch, yaw about x, y, z.
pub fn from_xyz_rpy(xyz: [f64; 3], rpy: [f64; 3]) -> Pose {
    let rotation = UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]);
    Isometry3::from_parts(Translation3::new(xyz[0], xyz[1], xyz[2]), rotation)
}

/// Skew-symmetric matrix of `w`, such that `skew(w) * v == w.cross(&v)`.
pub fn skew(w: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -w.z, w.y,
        w.z, 0.0, -w.x,
        -w.y, w.x, 0.0,
    )
}

/// Extracts `(angle, axis)` from a rotation matrix.
///
/// The axis is the direction left unchanged by `r`, i.e. the null space of
/// `r - I`. It is only defined up to sign; the returned angle carries the
/// matching sign so that `angle * axis` is unambiguous.
///
/// Returns [`KinematicsError::DegenerateRotation`] when `r` has no eigenvalue
/// within [`EIGENVALUE_TOLERANCE`] of 1.
pub fn rotation_from_matrix(r: &Matrix3<f64>) -> Result<(f64, Vector3<f64>), KinematicsError> {
    if !r.iter().all(|x| x.is_finite()) {
        return Err(KinematicsError::DegenerateRotation);
    }
    // r is normal, so the singular values of r - I are |lambda - 1|.
    let svd = (r - Matrix3::identity()).svd(false, true);
    let v_t = svd.v_t.ok_or(KinematicsError::DegenerateRotation)?;
    let i = svd.singular_values.imin();
    if svd.singular_values[i] >= EIGENVALUE_TOLERANCE {
        return Err(KinematicsError::DegenerateRotation);
    }
    let axis: Vector3<f64> = v_t.row(i).transpose().normalize();

    let cosa = (r.trace() - 1.0) / 2.0;
    let sina = if axis.z.abs() > AXIS_COMPONENT_EPSILON {
        (r[(1, 0)] + (cosa - 1.0) * axis.x * axis.y) / axis.z
    } else if axis.y.abs() > AXIS_COMPONENT_EPSILON {
        (r[(0, 2)] + (cosa - 1.0) * axis.x * axis.z) / axis.y
    } else {
        (r[(2, 1)] + (cosa - 1.0) * axis.y * axis.z) / axis.x
    };

    Ok((sina.atan2(cosa), axis))
}
