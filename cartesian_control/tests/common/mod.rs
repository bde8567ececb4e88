#![allow(dead_code)]

use std::sync::Arc;

use cartesian_control::model::{Joint, JointType, ModelDescription, Origin};
use cartesian_control::KinematicTree;

/// Planar arm in the x-y plane: `links` revolute joints about z, each link
/// `length` long along x, followed by a fixed tool frame at the last link's tip.
pub fn planar_arm(links: usize, length: f64) -> Arc<KinematicTree> {
    let link_names: Vec<String> = (0..=links).map(|i| format!("link_{}", i)).chain(["tool".to_string()]).collect();
    let mut joints: Vec<Joint> = (0..links)
        .map(|i| Joint {
            name: format!("joint_{}", i),
            joint_type: JointType::Revolute,
            parent: link_names[i].clone(),
            child: link_names[i + 1].clone(),
            origin: Origin {
                xyz: [if i == 0 { 0.0 } else { length }, 0.0, 0.0],
                rpy: [0.0; 3],
            },
            axis: [0.0, 0.0, 1.0],
        })
        .collect();
    joints.push(Joint {
        name: "tool_joint".to_string(),
        joint_type: JointType::Fixed,
        parent: link_names[links].clone(),
        child: "tool".to_string(),
        origin: Origin { xyz: [length, 0.0, 0.0], rpy: [0.0; 3] },
        axis: [1.0, 0.0, 0.0],
    });

    let description = ModelDescription {
        name: format!("planar_{}", links),
        links: link_names,
        joints,
    };
    Arc::new(KinematicTree::from_description(description).expect("planar arm is valid"))
}
