use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use super::{ControlMode, ControllerConfig};
use crate::kinematics::{build_jacobian, resolve, ResolvedKinematics};
use crate::model::KinematicTree;
use crate::solver::{solve, SecondaryObjective};
use crate::transforms::Pose;
use crate::{JointState, JointVelocities, KinematicsError};

/// Inbound updates, in the order they arrive.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerMessage {
    JointState(JointState),
    /// Desired end-effector pose in the base frame.
    PoseCommand(Pose),
    /// Target angle in radians for the configured redundant joint.
    RedundancyCommand(f64),
}

#[derive(Debug, Clone, Copy)]
struct Stamped<T> {
    value: T,
    received: Instant,
}

impl<T> Stamped<T> {
    fn now(value: T) -> Self {
        Self {
            value,
            received: Instant::now(),
        }
    }
}

/// Everything guarded by the controller's lock.
#[derive(Debug, Default)]
struct ControlState {
    snapshot: Option<ResolvedKinematics>,
    pose_command: Option<Stamped<Pose>>,
    redundancy_command: Option<Stamped<f64>>,
    last_mode: ControlMode,
}

/// Fixed-rate Cartesian velocity controller.
///
/// All shared state sits behind one lock. Joint-state updates, commands and
/// ticks each take it once for their whole read-modify-write. Cloning the
/// controller shares that state.
///
/// ```rust,ignore
/// let tree = Arc::new(KinematicTree::from_file("arm.urdf")?);
/// let controller = CartesianController::new(tree, ControllerConfig::default())?;
/// let mut velocities = controller.subscribe();
///
/// let (tx, rx) = mpsc::channel(32);
/// let handle = controller.spawn(rx);
///
/// tx.send(ControllerMessage::JointState(state)).await?;
/// tx.send(ControllerMessage::PoseCommand(target)).await?;
/// while let Ok(out) = velocities.recv().await {
///     // forward `out` to the arm
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CartesianController {
    pub config: ControllerConfig,
    tree: Arc<KinematicTree>,
    state: Arc<Mutex<ControlState>>,
    velocity_channel: broadcast::Sender<JointVelocities>,
}

impl CartesianController {
    /// Fails if the configuration is invalid or names a redundant joint the
    /// model does not have.
    pub fn new(tree: Arc<KinematicTree>, config: ControllerConfig) -> Result<Self, String> {
        config.validate()?;
        let n = tree.active_joint_count();
        if n > 0 && config.redundant_joint >= n {
            return Err(format!(
                "Redundant joint index {} is out of range for {} active joints.",
                config.redundant_joint, n
            ));
        }

        let (velocity_channel, _rx) = broadcast::channel(16);
        Ok(Self {
            config,
            tree,
            state: Arc::new(Mutex::new(ControlState::default())),
            velocity_channel,
        })
    }

    pub fn tree(&self) -> &KinematicTree {
        &self.tree
    }

    /// Receives every published velocity vector, one per tick.
    pub fn subscribe(&self) -> broadcast::Receiver<JointVelocities> {
        self.velocity_channel.subscribe()
    }

    pub async fn handle(&self, message: ControllerMessage) {
        match message {
            ControllerMessage::JointState(state) => self.handle_joint_state(&state).await,
            ControllerMessage::PoseCommand(pose) => self.handle_pose_command(pose).await,
            ControllerMessage::RedundancyCommand(target) => self.handle_redundancy_command(target).await,
        }
    }

    /// Rebuilds the cached joint transforms and end-effector pose.
    ///
    /// Joints the walker could not resolve are logged and left out of the
    /// snapshot; the rest of the arm is still controlled.
    pub async fn handle_joint_state(&self, joint_state: &JointState) {
        let mut state = self.state.lock().await;
        let resolved = resolve(&self.tree, joint_state);
        for e in &resolved.errors {
            error!("Skipping subtree: {}", e);
        }
        if resolved.end_effector.is_none() {
            warn!("Joint state did not reach the end-effector; keeping no snapshot");
            state.snapshot = None;
        } else {
            trace!("Resolved {} joint transforms", resolved.len());
            state.snapshot = Some(resolved);
        }
    }

    pub async fn handle_pose_command(&self, pose: Pose) {
        let mut state = self.state.lock().await;
        state.pose_command = Some(Stamped::now(pose));
    }

    pub async fn handle_redundancy_command(&self, target: f64) {
        let mut state = self.state.lock().await;
        state.redundancy_command = Some(Stamped::now(target));
    }

    /// End-effector pose from the latest joint state, if one resolved.
    pub async fn end_effector_pose(&self) -> Option<Pose> {
        let state = self.state.lock().await;
        state.snapshot.as_ref().and_then(|s| s.end_effector)
    }

    /// Runs one control step and returns the velocities for every active joint.
    ///
    /// Falls back to all zeros when no command is fresh, when no joint state
    /// has been resolved yet, or when the solve fails.
    pub async fn tick(&self) -> (ControlMode, JointVelocities) {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let window = self.config.staleness_window();

        let selected = ControlMode::select(
            state.pose_command.map(|c| now.duration_since(c.received)),
            state.redundancy_command.map(|c| now.duration_since(c.received)),
            window,
        );

        let mut output = JointVelocities::zeros(self.tree.active_joints());
        let mode = match self.compute(&state, selected) {
            Ok(Some(velocities)) => {
                output = velocities;
                selected
            }
            Ok(None) => ControlMode::Idle,
            Err(e) => {
                error!("Control tick failed, publishing zero velocities: {}", e);
                ControlMode::Idle
            }
        };

        if mode != state.last_mode {
            info!("Control mode {:?} -> {:?}", state.last_mode, mode);
            state.last_mode = mode;
        }
        (mode, output)
    }

    fn compute(
        &self,
        state: &ControlState,
        mode: ControlMode,
    ) -> Result<Option<JointVelocities>, KinematicsError> {
        if mode == ControlMode::Idle {
            return Ok(None);
        }
        let Some((snapshot, current)) = state
            .snapshot
            .as_ref()
            .and_then(|s| s.end_effector.map(|ee| (s, ee)))
        else {
            debug!("No joint state received yet");
            return Ok(None);
        };

        let (desired, secondary) = match (mode, state.pose_command, state.redundancy_command) {
            (ControlMode::PrimaryTracking, Some(command), _) => (command.value, None),
            (ControlMode::RedundancyOnly, _, Some(command)) => (current, self.secondary_objective(snapshot, command.value)),
            _ => return Ok(None),
        };

        let jacobian = build_jacobian(&snapshot.joint_poses, &current);
        let dq = solve(
            &jacobian,
            &current,
            &desired,
            &snapshot.joint_angles,
            secondary,
            &self.config.solver_params(),
        )?;

        let mut output = JointVelocities::zeros(self.tree.active_joints());
        for (name, velocity) in snapshot.joint_names.iter().zip(dq.iter()) {
            if let Some(i) = self.tree.active_joint_index(name) {
                output.velocity[i] = *velocity;
            }
        }
        Ok(Some(output))
    }

    fn secondary_objective(&self, snapshot: &ResolvedKinematics, target: f64) -> Option<SecondaryObjective> {
        let name = self.tree.active_joints().get(self.config.redundant_joint)?;
        match snapshot.index_of(name) {
            Some(joint) => Some(SecondaryObjective { joint, target }),
            None => {
                warn!("Redundant joint '{}' is not in the current joint state", name);
                None
            }
        }
    }

    /// Ticks at the configured period and applies inbound messages between
    /// ticks until `inbound` is closed.
    ///
    /// Every tick publishes, whether or not a command was fresh.
    pub async fn run(&self, mut inbound: mpsc::Receiver<ControllerMessage>) {
        let mut interval = time::interval(self.config.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Controlling {} joints of '{}' every {:?}",
            self.tree.active_joint_count(),
            self.tree.name(),
            self.config.tick_period()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let (_, velocities) = self.tick().await;
                    // no subscribers is not an error
                    let _ = self.velocity_channel.send(velocities);
                }
                message = inbound.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => break,
                },
            }
        }
        info!("Inbound channel closed, stopping controller");
    }

    pub fn spawn(&self, inbound: mpsc::Receiver<ControllerMessage>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move { controller.run(inbound).await })
    }
}
