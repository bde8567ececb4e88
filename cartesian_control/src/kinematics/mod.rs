//! Forward kinematics over the link tree and the numerical Jacobian built
//! from its output.

mod forward;
mod jacobian;

pub use forward::*;
pub use jacobian::*;
