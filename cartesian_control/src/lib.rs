//! Velocity-level Cartesian control for tree-structured manipulators.
//!
//! Every control tick the controller resolves the arm's forward kinematics,
//! builds the end-effector Jacobian numerically and solves for the joint
//! velocities that move the end-effector toward the commanded pose. A
//! redundancy command steers one designated joint through the Jacobian's
//! null space. Commands that are older than the staleness window are
//! ignored and the controller publishes zero velocities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub mod controller;
pub mod errors;
pub mod kinematics;
pub mod model;
pub mod solver;
pub mod transforms;

pub use errors::*;
pub use model::KinematicTree;
pub use transforms::Pose;

/// Latest measured joint angles in radians, keyed by joint name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct JointState {
    pub positions: HashMap<String, f64>,
}

impl JointState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, joint: &str) -> Option<f64> {
        self.positions.get(joint).copied()
    }

    pub fn set<S: Into<String>>(&mut self, joint: S, angle: f64) {
        self.positions.insert(joint.into(), angle);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for JointState {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().map(|(name, angle)| (name.into(), angle)).collect(),
        }
    }
}

/// One published control output: a velocity in rad/s per active joint, in
/// the model's active joint order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointVelocities {
    pub name: Vec<String>,
    pub velocity: Vec<f64>,
}

impl JointVelocities {
    pub fn zeros(names: &[String]) -> Self {
        Self {
            name: names.to_vec(),
            velocity: vec![0.0; names.len()],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.velocity.iter().all(|v| *v == 0.0)
    }

    pub fn get(&self, joint: &str) -> Option<f64> {
        self.name.iter().position(|n| n == joint).map(|i| self.velocity[i])
    }
}
