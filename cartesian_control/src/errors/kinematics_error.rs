use std::error::Error;
use std::fmt;
use serde::{Deserialize, Serialize};

/// Failures raised while resolving poses or solving for joint velocities.
///
/// None of these are fatal to the controller: a walker error skips the
/// affected subtree, a solver error turns the current tick into an idle tick.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// The rotation block has no eigenvalue-1 direction, so it is not a rotation.
    DegenerateRotation,
    /// The child map references a joint that is not in the joint map.
    MissingJoint(String),
    /// An active joint has no entry in the current joint-state snapshot.
    MissingJointState(String),
    PseudoInverse(String),
}

impl Error for KinematicsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            KinematicsError::DegenerateRotation => {
                write!(f, "no unit eigenvector corresponding to eigenvalue 1")
            }
            KinematicsError::MissingJoint(ref name) => write!(f, "joint '{}' not found in model", name),
            KinematicsError::MissingJointState(ref name) => {
                write!(f, "joint '{}' not found in joint state", name)
            }
            KinematicsError::PseudoInverse(ref msg) => write!(f, "pseudo-inverse failed: {}", msg),
        }
    }
}

/// Failures while loading the kinematic model. These are fatal at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ModelError {
    Io(String),
    Parse(String),
    Urdf(String),
    NoRoot,
    MultipleRoots(Vec<String>),
    /// A link is the child of more than one joint.
    MultipleParents(String),
    /// A joint names a parent or child link that does not exist.
    UnknownLink { joint: String, link: String },
    UnsupportedJointType { joint: String, kind: String },
    ZeroAxis(String),
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ModelError::Io(ref msg) => write!(f, "could not read model: {}", msg),
            ModelError::Parse(ref msg) => write!(f, "could not parse model: {}", msg),
            ModelError::Urdf(ref msg) => write!(f, "invalid URDF: {}", msg),
            ModelError::NoRoot => write!(f, "model has no root link"),
            ModelError::MultipleRoots(ref roots) => {
                write!(f, "model has more than one root link: {}", roots.join(", "))
            }
            ModelError::MultipleParents(ref link) => {
                write!(f, "link '{}' is the child of more than one joint", link)
            }
            ModelError::UnknownLink { ref joint, ref link } => {
                write!(f, "joint '{}' references unknown link '{}'", joint, link)
            }
            ModelError::UnsupportedJointType { ref joint, ref kind } => {
                write!(f, "joint '{}' has unsupported type '{}'", joint, kind)
            }
            ModelError::ZeroAxis(ref joint) => write!(f, "joint '{}' has a zero rotation axis", joint),
        }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(e: std::io::Error) -> Self {
        ModelError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Parse(e.to_string())
    }
}
