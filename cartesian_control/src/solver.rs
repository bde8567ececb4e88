//! Velocity-level inverse kinematics.
//!
//! The pose error between the current and the desired end-effector pose is
//! turned into a twist by a proportional law and mapped to joint velocities
//! through a thresholded pseudo-inverse of the Jacobian. An optional
//! secondary objective pulls one joint toward a target angle inside the
//! Jacobian's null space, so it does not disturb the end-effector.
//!
//! The angular part of the twist is `angle * axis` of the pose error, a first
//! order approximation that is only accurate for moderate rotation errors.
//! It is deliberately not clamped.

use nalgebra::{DMatrix, DVector, Vector6};
use serde::{Deserialize, Serialize};

use crate::transforms::{invert, rotation, rotation_from_matrix, translation, Pose};
use crate::KinematicsError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    pub linear_gain: f64,
    pub angular_gain: f64,
    /// Singular values below this are dropped for the primary solve.
    pub pinv_threshold: f64,
    /// Singular values below this are dropped for the null-space projector.
    pub exact_pinv_threshold: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            linear_gain: 1.5,
            angular_gain: 1.5,
            pinv_threshold: 1e-2,
            exact_pinv_threshold: 1e-10,
        }
    }
}

/// Drive joint `joint` (index into the Jacobian's columns) toward `target` radians.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SecondaryObjective {
    pub joint: usize,
    pub target: f64,
}

/// Desired end-effector twist `[v; w]` in the current end-effector frame.
pub fn pose_error_twist(
    current: &Pose,
    desired: &Pose,
    params: &SolverParams,
) -> Result<Vector6<f64>, KinematicsError> {
    let delta = invert(current) * desired;
    let (angle, axis) = rotation_from_matrix(&rotation(&delta))?;

    let linear = translation(&delta) * params.linear_gain;
    let angular = axis * angle * params.angular_gain;

    Ok(Vector6::new(linear.x, linear.y, linear.z, angular.x, angular.y, angular.z))
}

/// Moore-Penrose pseudo-inverse, treating singular values below `threshold` as zero.
pub fn pseudo_inverse(matrix: &DMatrix<f64>, threshold: f64) -> Result<DMatrix<f64>, KinematicsError> {
    if matrix.is_empty() {
        return Ok(DMatrix::zeros(matrix.ncols(), matrix.nrows()));
    }
    matrix
        .clone()
        .pseudo_inverse(threshold)
        .map_err(|e| KinematicsError::PseudoInverse(e.to_string()))
}

/// `I - pinv(J) * J`, with `pinv` taken at `threshold`.
pub fn null_space_projector(jacobian: &DMatrix<f64>, threshold: f64) -> Result<DMatrix<f64>, KinematicsError> {
    let n = jacobian.ncols();
    let pinv = pseudo_inverse(jacobian, threshold)?;
    Ok(DMatrix::identity(n, n) - pinv * jacobian)
}

/// Joint velocities moving the end-effector from `current` toward `desired`.
///
/// `current_angles` is indexed like the Jacobian's columns. When `secondary`
/// is given, `(target - current_angles[joint])` seeds that joint and the seed
/// is projected into the null space with the exact pseudo-inverse before being
/// added. An out-of-range secondary joint is ignored.
pub fn solve(
    jacobian: &DMatrix<f64>,
    current: &Pose,
    desired: &Pose,
    current_angles: &[f64],
    secondary: Option<SecondaryObjective>,
    params: &SolverParams,
) -> Result<DVector<f64>, KinematicsError> {
    let n = jacobian.ncols();
    let twist = pose_error_twist(current, desired, params)?;
    let x_dot = DVector::from_column_slice(twist.as_slice());

    let j_pinv = pseudo_inverse(jacobian, params.pinv_threshold)?;
    let mut dq = j_pinv * x_dot;

    if let Some(secondary) = secondary {
        if secondary.joint < n && secondary.joint < current_angles.len() {
            let mut seed = DVector::zeros(n);
            seed[secondary.joint] = secondary.target - current_angles[secondary.joint];

            let projector = null_space_projector(jacobian, params.exact_pinv_threshold)?;
            dq += projector * seed;
        }
    }

    Ok(dq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::from_axis_angle;
    use nalgebra::Vector3;

    /// 6x7 Jacobian of a generic redundant arm, rank 6.
    fn redundant_jacobian() -> DMatrix<f64> {
        DMatrix::from_fn(6, 7, |r, c| ((r * 7 + c) as f64 * 0.37).sin() + if r == c { 1.0 } else { 0.0 })
    }

    #[test]
    fn test_twist_of_pure_translation() {
        let current = Pose::identity();
        let desired = from_axis_angle(0.0, &Vector3::z(), Vector3::new(0.1, 0.0, 0.0));
        let twist = pose_error_twist(&current, &desired, &SolverParams::default()).unwrap();
        let expected = Vector6::new(0.15, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!((twist - expected).norm() < 1e-12);
    }

    #[test]
    fn test_twist_is_expressed_in_current_frame() {
        // current frame is turned 90 degrees about z, so a base-frame +x step is -y locally
        let current = from_axis_angle(std::f64::consts::FRAC_PI_2, &Vector3::z(), Vector3::zeros());
        let desired = from_axis_angle(std::f64::consts::FRAC_PI_2, &Vector3::z(), Vector3::new(0.2, 0.0, 0.0));
        let params = SolverParams { linear_gain: 1.0, ..Default::default() };
        let twist = pose_error_twist(&current, &desired, &params).unwrap();
        assert!((twist - Vector6::new(0.0, -0.2, 0.0, 0.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_twist_of_pure_rotation_uses_angular_gain() {
        let current = Pose::identity();
        let desired = from_axis_angle(0.4, &Vector3::new(0.0, 1.0, 1.0), Vector3::zeros());
        let params = SolverParams { angular_gain: 2.0, ..Default::default() };
        let twist = pose_error_twist(&current, &desired, &params).unwrap();

        let expected = Vector3::new(0.0, 1.0, 1.0).normalize() * 0.4 * 2.0;
        assert!(twist.fixed_rows::<3>(0).norm() < 1e-12);
        assert!((twist.fixed_rows::<3>(3) - expected).norm() < 1e-9);
    }

    #[test]
    fn test_pseudo_inverse_drops_small_singular_values() {
        let m = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 1e-3]));
        let damped = pseudo_inverse(&m, 1e-2).unwrap();
        assert!((damped[(0, 0)] - 0.5).abs() < 1e-12);
        assert_eq!(damped[(1, 1)], 0.0);

        let exact = pseudo_inverse(&m, 1e-10).unwrap();
        assert!((exact[(1, 1)] - 1e3).abs() < 1e-6);
    }

    #[test]
    fn test_null_space_projector_is_annihilated_by_jacobian() {
        let j = redundant_jacobian();
        let p = null_space_projector(&j, 1e-10).unwrap();
        assert_eq!(p.shape(), (7, 7));
        assert!((&j * &p).norm() < 1e-9);
        // projector is idempotent
        assert!((&p * &p - &p).norm() < 1e-9);
    }

    #[test]
    fn test_secondary_objective_stays_in_null_space() {
        let j = redundant_jacobian();
        let angles = [0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let secondary = SecondaryObjective { joint: 0, target: 0.3 };
        let pose = Pose::identity();

        let dq = solve(&j, &pose, &pose, &angles, Some(secondary), &SolverParams::default()).unwrap();
        assert!(dq.norm() > 1e-6);
        assert!((&j * &dq).norm() < 1e-9);
        // the designated joint moves toward its target
        assert!(dq[0] > 0.0);
    }

    #[test]
    fn test_out_of_range_secondary_is_ignored() {
        let j = redundant_jacobian();
        let pose = Pose::identity();
        let secondary = SecondaryObjective { joint: 9, target: 1.0 };
        let dq = solve(&j, &pose, &pose, &[0.0; 7], Some(secondary), &SolverParams::default()).unwrap();
        assert!(dq.norm() < 1e-12);
    }

    #[test]
    fn test_empty_jacobian_gives_empty_velocities() {
        let j = DMatrix::zeros(6, 0);
        let pose = Pose::identity();
        let dq = solve(&j, &pose, &pose, &[], None, &SolverParams::default()).unwrap();
        assert_eq!(dq.len(), 0);
    }
}
