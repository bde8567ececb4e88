/// Tests for the spawned control loop: message intake, publication on every
/// tick and shutdown when the inbound channel closes.
mod common;

use std::time::Duration;

use cartesian_control::controller::{CartesianController, ControllerConfig, ControllerMessage};
use cartesian_control::transforms::from_axis_angle;
use cartesian_control::JointState;
use nalgebra::Vector3;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn state_of(angles: &[f64]) -> JointState {
    angles
        .iter()
        .enumerate()
        .map(|(i, angle)| (format!("joint_{}", i), *angle))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_publishes_every_tick_and_stops_on_close() {
    let controller = CartesianController::new(common::planar_arm(2, 1.0), ControllerConfig::default()).unwrap();
    let mut velocities = controller.subscribe();
    let (tx, rx) = mpsc::channel(8);
    let handle = controller.spawn(rx);

    // idle ticks are published too
    for _ in 0..3 {
        let out = timeout(Duration::from_secs(1), velocities.recv()).await.unwrap().unwrap();
        assert_eq!(out.name, ["joint_0", "joint_1"]);
        assert!(out.is_zero());
    }

    tx.send(ControllerMessage::JointState(state_of(&[0.3, 0.8]))).await.unwrap();
    let current = loop {
        if let Some(pose) = controller.end_effector_pose().await {
            break pose;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    let step = from_axis_angle(0.0, &Vector3::z(), Vector3::new(0.05, 0.0, 0.0));
    tx.send(ControllerMessage::PoseCommand(current * step)).await.unwrap();

    let mut moving = false;
    for _ in 0..5 {
        let out = timeout(Duration::from_secs(1), velocities.recv()).await.unwrap().unwrap();
        if !out.is_zero() {
            moving = true;
            break;
        }
    }
    assert!(moving, "fresh pose command never produced motion");

    // after the staleness window the loop goes back to publishing zeros
    tokio::time::sleep(Duration::from_millis(700)).await;
    let mut velocities = controller.subscribe();
    let out = timeout(Duration::from_secs(1), velocities.recv()).await.unwrap().unwrap();
    assert!(out.is_zero());

    drop(tx);
    timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_last_command_wins() {
    let controller = CartesianController::new(common::planar_arm(2, 1.0), ControllerConfig::default()).unwrap();
    controller.handle_joint_state(&state_of(&[0.3, 0.8])).await;
    let current = controller.end_effector_pose().await.unwrap();

    let far = from_axis_angle(0.0, &Vector3::z(), Vector3::new(0.3, 0.0, 0.0));
    controller.handle(ControllerMessage::PoseCommand(current * far)).await;
    controller.handle(ControllerMessage::PoseCommand(current)).await;

    let (_, out) = controller.tick().await;
    assert!(out.velocity.iter().all(|v| v.abs() < 1e-9));
}
