use std::sync::Arc;
use std::time::Duration;

use cartesian_control::controller::ControllerMessage;
use cartesian_control::{JointState, JointVelocities, KinematicTree};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Kinematic stand-in for a real arm: integrates commanded joint
/// velocities and reports the resulting joint state.
///
/// There is no dynamics and no joint limits; a velocity held for `dt`
/// moves the joint by exactly `velocity * dt`.
#[derive(Debug, Clone)]
pub struct SimulatedArm {
    tree: Arc<KinematicTree>,
    positions: Vec<f64>,
}

impl SimulatedArm {
    /// Start angles are taken by active joint index; missing ones are 0.
    pub fn new(tree: Arc<KinematicTree>, initial_angles: &[f64]) -> Self {
        let mut positions = vec![0.0; tree.active_joint_count()];
        for (position, angle) in positions.iter_mut().zip(initial_angles) {
            *position = *angle;
        }
        if initial_angles.len() > positions.len() {
            warn!(
                "Ignoring {} extra initial angles for '{}'",
                initial_angles.len() - positions.len(),
                tree.name()
            );
        }
        Self { tree, positions }
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn joint_state(&self) -> JointState {
        self.tree
            .active_joints()
            .iter()
            .cloned()
            .zip(self.positions.iter().copied())
            .collect()
    }

    /// Moves every named joint by `velocity * dt`. Unknown names are skipped.
    pub fn apply(&mut self, velocities: &JointVelocities, dt: Duration) {
        let dt = dt.as_secs_f64();
        for (name, velocity) in velocities.name.iter().zip(&velocities.velocity) {
            match self.tree.active_joint_index(name) {
                Some(i) => self.positions[i] += velocity * dt,
                None => debug!("Velocity for unknown joint '{}'", name),
            }
        }
    }

    /// Reports the start state, then integrates every received velocity
    /// vector over `dt` and reports again.
    ///
    /// Returns the final arm once either channel closes.
    pub async fn run(
        mut self,
        mut velocities: broadcast::Receiver<JointVelocities>,
        outbound: mpsc::Sender<ControllerMessage>,
        dt: Duration,
    ) -> Self {
        if outbound.send(ControllerMessage::JointState(self.joint_state())).await.is_err() {
            return self;
        }

        loop {
            match velocities.recv().await {
                Ok(command) => {
                    self.apply(&command, dt);
                    let state = ControllerMessage::JointState(self.joint_state());
                    if outbound.send(state).await.is_err() {
                        info!("Controller inbound closed, stopping arm");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Arm fell behind by {} velocity commands", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Velocity channel closed, stopping arm");
                    break;
                }
            }
        }
        self
    }
}
