#[cfg(feature = "controller")]
mod controller;
#[cfg(feature = "controller")]
pub use controller::*;

mod config;
pub use config::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a control tick did, in priority order.
#[derive(Serialize, Deserialize, Copy, Debug, Clone, PartialEq, Eq)]
pub enum ControlMode {
    /// A fresh pose command is being tracked.
    PrimaryTracking,
    /// Only a fresh redundancy command: hold the pose, move in the null space.
    RedundancyOnly,
    Idle,
}

impl Default for ControlMode {
    fn default() -> Self {
        Self::Idle
    }
}

impl ControlMode {
    /// Picks the mode from the ages of the latest commands. A command is fresh
    /// while its age is strictly below `window`.
    pub fn select(pose_age: Option<Duration>, redundancy_age: Option<Duration>, window: Duration) -> Self {
        let fresh = |age: Option<Duration>| age.is_some_and(|age| age < window);
        if fresh(pose_age) {
            ControlMode::PrimaryTracking
        } else if fresh(redundancy_age) {
            ControlMode::RedundancyOnly
        } else {
            ControlMode::Idle
        }
    }
}
