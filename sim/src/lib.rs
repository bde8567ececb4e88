// Library exports for the simulated arm

pub mod arm;
pub mod sim_config;

pub use arm::SimulatedArm;
pub use sim_config::SimConfig;

/// Path of the bundled seven-joint arm description.
pub const DEFAULT_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/models/lwr.json");
