//! Configuration of the simulated arm and of the demo run in `main.rs`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Start angles in radians, by active joint index. Missing entries start at 0.
    pub initial_angles: Vec<f64>,

    /// Step of the pose command relative to the start pose, in the
    /// end-effector frame, in meters.
    pub target_offset: [f64; 3],

    /// Target angle for the redundant joint once the pose is reached.
    pub redundancy_target: f64,

    /// How long each demo phase keeps re-sending its command.
    pub phase_duration_ms: u64,
}

impl SimConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
        serde_json::from_str(&json).map_err(|e| format!("Could not parse sim config: {}", e))
    }

    pub fn phase_duration(&self) -> Duration {
        Duration::from_millis(self.phase_duration_ms)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        // elbow and wrist bent so the arm starts away from singular poses
        Self {
            initial_angles: vec![0.0, 0.5, 0.0, -1.2, 0.0, 0.6, 0.0],
            target_offset: [0.05, 0.05, -0.05],
            redundancy_target: 0.5,
            phase_duration_ms: 3000,
        }
    }
}
