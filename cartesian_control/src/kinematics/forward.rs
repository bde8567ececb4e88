use nalgebra::Vector3;

use crate::model::KinematicTree;
use crate::transforms::{from_axis_angle, Pose};
use crate::{JointState, KinematicsError};

/// Poses of every active joint and of the end-effector for one joint-state
/// snapshot.
///
/// `joint_poses[i]` is the base-frame pose of `joint_names[i]` with the
/// joint's rotation axis turned onto the frame's z axis, taken before the
/// joint's own rotation is applied. `joint_angles[i]` is the angle that was
/// read for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedKinematics {
    pub joint_names: Vec<String>,
    pub joint_poses: Vec<Pose>,
    pub joint_angles: Vec<f64>,
    /// `None` when every path to a leaf was skipped.
    pub end_effector: Option<Pose>,
    /// Joints whose subtree was skipped, in visiting order.
    pub errors: Vec<KinematicsError>,
}

impl ResolvedKinematics {
    pub fn len(&self) -> usize {
        self.joint_poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joint_poses.is_empty()
    }

    pub fn index_of(&self, joint: &str) -> Option<usize> {
        self.joint_names.iter().position(|name| name == joint)
    }
}

/// Rotation taking the canonical z axis onto `axis`.
pub fn align_with_z(axis: &Vector3<f64>) -> Pose {
    let z = Vector3::z();
    let axis = axis.normalize();
    let rot_axis = z.cross(&axis);
    let dot = z.dot(&axis);

    if rot_axis.norm() < 1e-12 {
        return if dot > 0.0 {
            Pose::identity()
        } else {
            from_axis_angle(std::f64::consts::PI, &Vector3::x(), Vector3::zeros())
        };
    }
    from_axis_angle(dot.clamp(-1.0, 1.0).acos(), &rot_axis, Vector3::zeros())
}

/// Walks the tree from the root and resolves every joint pose for `state`.
///
/// Children are visited depth first in declaration order, so the output order
/// matches [`KinematicTree::active_joints`] whenever no joint is skipped. A
/// joint missing from the model or from `state` is recorded in
/// [`ResolvedKinematics::errors`] and its subtree is skipped; its siblings are
/// still visited.
pub fn resolve(tree: &KinematicTree, state: &JointState) -> ResolvedKinematics {
    let mut resolved = ResolvedKinematics::default();
    resolve_link(tree, tree.root(), &Pose::identity(), state, &mut resolved);
    resolved
}

fn resolve_link(
    tree: &KinematicTree,
    link: &str,
    link_pose: &Pose,
    state: &JointState,
    resolved: &mut ResolvedKinematics,
) {
    let children = tree.children(link);
    if children.is_empty() {
        resolved.end_effector = Some(*link_pose);
        return;
    }

    for child in children {
        let Some(joint) = tree.joint(&child.joint) else {
            resolved.errors.push(KinematicsError::MissingJoint(child.joint.clone()));
            continue;
        };

        let joint_pose = link_pose * joint.origin.to_pose();
        let next_link_pose = if joint.is_fixed() {
            joint_pose
        } else {
            let Some(angle) = state.get(&joint.name) else {
                resolved.errors.push(KinematicsError::MissingJointState(joint.name.clone()));
                continue;
            };
            let axis = joint.axis();
            resolved.joint_names.push(joint.name.clone());
            resolved.joint_poses.push(joint_pose * align_with_z(&axis));
            resolved.joint_angles.push(angle);
            joint_pose * from_axis_angle(angle, &axis, Vector3::zeros())
        };

        resolve_link(tree, &child.link, &next_link_pose, state, resolved);
    }
}
