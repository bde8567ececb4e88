use std::error::Error;
use std::sync::Arc;

use cartesian_control::controller::{CartesianController, ControllerConfig, ControllerMessage};
use cartesian_control::transforms::from_axis_angle;
use cartesian_control::{KinematicTree, Pose};
use nalgebra::Vector3;
use sim::{SimConfig, SimulatedArm, DEFAULT_MODEL};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{info, warn};

// Usage: sim [model.json|model.urdf] [controller.json] [sim.json]
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let model_path = args.next().unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let controller_config = match args.next() {
        Some(path) => ControllerConfig::from_json_file(path)?,
        None => ControllerConfig::default(),
    };
    let sim_config = match args.next() {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    let tree = Arc::new(KinematicTree::from_file(&model_path)?);
    info!(
        "Loaded '{}' from {} with {} active joints",
        tree.name(),
        model_path,
        tree.active_joint_count()
    );

    let controller = CartesianController::new(tree.clone(), controller_config.clone())?;
    let arm = SimulatedArm::new(tree, &sim_config.initial_angles);

    let (tx, rx) = mpsc::channel(32);
    let controller_handle = controller.spawn(rx);
    let arm_handle = tokio::spawn(arm.run(
        controller.subscribe(),
        tx.clone(),
        controller_config.tick_period(),
    ));

    let start = loop {
        if let Some(pose) = controller.end_effector_pose().await {
            break pose;
        }
        time::sleep(controller_config.tick_period()).await;
    };
    log_pose("Start", &start);

    let offset = Vector3::from(sim_config.target_offset);
    let target = start * from_axis_angle(0.0, &Vector3::z(), offset);
    log_pose("Target", &target);

    // keep each command fresh by re-sending it well inside the staleness window
    let resend = controller_config.staleness_window() / 2;

    let phase_end = Instant::now() + sim_config.phase_duration();
    while Instant::now() < phase_end {
        tx.send(ControllerMessage::PoseCommand(target)).await?;
        time::sleep(resend).await;
    }
    if let Some(pose) = controller.end_effector_pose().await {
        let error = (pose.translation.vector - target.translation.vector).norm();
        log_pose("Reached", &pose);
        if error > 1e-3 {
            warn!("Still {:.4} m from target", error);
        } else {
            info!("Converged to within {:.2e} m", error);
        }
    }

    info!("Steering redundant joint towards {:.3} rad", sim_config.redundancy_target);
    let phase_end = Instant::now() + sim_config.phase_duration();
    while Instant::now() < phase_end {
        tx.send(ControllerMessage::RedundancyCommand(sim_config.redundancy_target)).await?;
        time::sleep(resend).await;
    }
    if let Some(pose) = controller.end_effector_pose().await {
        log_pose("Held", &pose);
    }

    // commands go stale and the controller settles to zero velocities
    time::sleep(controller_config.staleness_window() * 2).await;

    drop(tx);
    controller_handle.abort();
    let _ = controller_handle.await;
    drop(controller);
    let arm = arm_handle.await?;
    info!("Final joint angles: {:.3?}", arm.positions());

    Ok(())
}

fn log_pose(label: &str, pose: &Pose) {
    let t = pose.translation.vector;
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    info!(
        "{} pose: xyz [{:.4}, {:.4}, {:.4}] rpy [{:.4}, {:.4}, {:.4}]",
        label, t.x, t.y, t.z, roll, pitch, yaw
    );
}
