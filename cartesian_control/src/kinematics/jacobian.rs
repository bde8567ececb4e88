use nalgebra::{DMatrix, Matrix6};

use crate::transforms::{invert, rotation, skew, translation, Pose};

/// 6x6 block mapping a twist expressed in a joint's frame to the same twist
/// seen from the end-effector frame.
///
/// `joint_to_ee` is the end-effector pose relative to the joint. With
/// `R = rotation(inv(joint_to_ee))` and `t = translation(joint_to_ee)`:
///
/// ```text
/// [ R   -R·S(t) ]
/// [ 0    R      ]
/// ```
pub fn velocity_transform(joint_to_ee: &Pose) -> Matrix6<f64> {
    let r = rotation(&invert(joint_to_ee));
    let s = skew(&translation(joint_to_ee));

    let mut v = Matrix6::zeros();
    v.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    v.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-r * s));
    v.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
    v
}

/// Assembles the 6xN Jacobian in the end-effector frame.
///
/// Each joint pose must already have its rotation axis on z (see
/// [`super::align_with_z`]), so only the last column of its velocity transform
/// is kept. Rows are `[vx, vy, vz, wx, wy, wz]`.
pub fn build_jacobian(joint_poses: &[Pose], end_effector: &Pose) -> DMatrix<f64> {
    let mut jacobian = DMatrix::zeros(6, joint_poses.len());
    for (i, base_to_joint) in joint_poses.iter().enumerate() {
        let joint_to_ee = invert(base_to_joint) * end_effector;
        let v = velocity_transform(&joint_to_ee);
        jacobian.column_mut(i).copy_from(&v.column(5));
    }
    jacobian
}
