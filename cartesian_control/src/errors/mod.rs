mod kinematics_error;
pub use kinematics_error::*;
