use std::path::Path;

use super::{Joint, JointType, KinematicTree, ModelDescription, Origin};
use crate::ModelError;

impl KinematicTree {
    pub fn from_urdf_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let robot = urdf_rs::read_file(path).map_err(|e| ModelError::Urdf(e.to_string()))?;
        Self::from_urdf_robot(robot)
    }

    pub fn from_urdf_str(xml: &str) -> Result<Self, ModelError> {
        let robot = urdf_rs::read_from_string(xml).map_err(|e| ModelError::Urdf(e.to_string()))?;
        Self::from_urdf_robot(robot)
    }

    /// `revolute` and `continuous` joints become revolute joints; any other
    /// moving joint type is rejected.
    pub fn from_urdf_robot(robot: urdf_rs::Robot) -> Result<Self, ModelError> {
        let joints = robot
            .joints
            .into_iter()
            .map(|joint| {
                let joint_type = match joint.joint_type {
                    urdf_rs::JointType::Fixed => JointType::Fixed,
                    urdf_rs::JointType::Revolute | urdf_rs::JointType::Continuous => JointType::Revolute,
                    ref other => {
                        return Err(ModelError::UnsupportedJointType {
                            joint: joint.name.clone(),
                            kind: format!("{:?}", other).to_lowercase(),
                        })
                    }
                };
                Ok(Joint {
                    joint_type,
                    parent: joint.parent.link,
                    child: joint.child.link,
                    origin: Origin {
                        xyz: joint.origin.xyz.0,
                        rpy: joint.origin.rpy.0,
                    },
                    axis: joint.axis.xyz.0,
                    name: joint.name,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_description(ModelDescription {
            name: robot.name,
            links: robot.links.into_iter().map(|link| link.name).collect(),
            joints,
        })
    }
}
