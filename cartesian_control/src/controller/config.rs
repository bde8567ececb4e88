use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::solver::SolverParams;

/// Startup configuration of the control loop. Fixed for the controller's lifetime.
///
/// ```rust,ignore
/// // Defaults: 10 Hz, 0.5 s staleness window, gains of 1.5
/// let config = ControllerConfig::default();
///
/// // Or read overrides from a JSON file; missing fields keep their defaults
/// let config = ControllerConfig::from_json_file("controller.json")?;
/// if let Err(e) = config.validate() {
///     println!("Configuration error: {}", e);
///     return;
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub tick_period_ms: u64,
    pub staleness_window_ms: u64,
    pub linear_gain: f64,
    pub angular_gain: f64,
    pub pinv_threshold: f64,
    pub exact_pinv_threshold: f64,
    /// Index into the model's active joints of the joint steered by
    /// redundancy commands.
    pub redundant_joint: usize,
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_period_ms == 0 {
            return Err("Tick period must be greater than 0.".to_string());
        }
        if self.staleness_window_ms == 0 {
            return Err("Staleness window must be greater than 0.".to_string());
        }
        if !self.linear_gain.is_finite() || !self.angular_gain.is_finite() {
            return Err("Gains must be finite.".to_string());
        }
        for (name, threshold) in [
            ("Pseudo-inverse threshold", self.pinv_threshold),
            ("Exact pseudo-inverse threshold", self.exact_pinv_threshold),
        ] {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(format!("{} must be finite and non-negative.", name));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Could not parse controller config: {}", e))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
        Self::from_json_str(&json)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_millis(self.staleness_window_ms)
    }

    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            linear_gain: self.linear_gain,
            angular_gain: self.angular_gain,
            pinv_threshold: self.pinv_threshold,
            exact_pinv_threshold: self.exact_pinv_threshold,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let solver = SolverParams::default();
        Self {
            tick_period_ms: 100,
            staleness_window_ms: 500,
            linear_gain: solver.linear_gain,
            angular_gain: solver.angular_gain,
            pinv_threshold: solver.pinv_threshold,
            exact_pinv_threshold: solver.exact_pinv_threshold,
            redundant_joint: 0,
        }
    }
}
