//! The robot's kinematic tree.
//!
//! The tree is loaded once at startup and never mutated afterwards; the
//! controller shares it behind an `Arc`. It can be built from a URDF file
//! (feature `urdf`) or from the compact JSON description below.
//!
//! ```json
//! {
//!   "name": "planar",
//!   "links": ["base", "upper", "tool"],
//!   "joints": [
//!     { "name": "shoulder", "type": "revolute", "parent": "base", "child": "upper",
//!       "origin": { "xyz": [0, 0, 0], "rpy": [0, 0, 0] }, "axis": [0, 0, 1] },
//!     { "name": "flange", "type": "fixed", "parent": "upper", "child": "tool",
//!       "origin": { "xyz": [1, 0, 0] } }
//!   ]
//! }
//! ```

#[cfg(feature = "urdf")]
mod urdf;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transforms::{from_xyz_rpy, Pose};
use crate::ModelError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    Fixed,
    Revolute,
}

/// Fixed offset of a joint frame relative to its parent link.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Origin {
    #[serde(default)]
    pub xyz: [f64; 3],
    #[serde(default)]
    pub rpy: [f64; 3],
}

impl Origin {
    pub fn to_pose(&self) -> Pose {
        from_xyz_rpy(self.xyz, self.rpy)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub origin: Origin,
    /// Rotation axis in the joint's own frame, unit length after loading.
    #[serde(default = "default_axis")]
    pub axis: [f64; 3],
}

fn default_axis() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

impl Joint {
    pub fn is_fixed(&self) -> bool {
        self.joint_type == JointType::Fixed
    }

    pub fn axis(&self) -> Vector3<f64> {
        Vector3::from(self.axis)
    }
}

/// Serialized form of a [`KinematicTree`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelDescription {
    pub name: String,
    pub links: Vec<String>,
    pub joints: Vec<Joint>,
}

/// Outgoing edge of a link: the joint and the link it leads to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub joint: String,
    pub link: String,
}

#[derive(Debug, Clone)]
pub struct KinematicTree {
    name: String,
    root: String,
    joints: HashMap<String, Joint>,
    child_map: HashMap<String, Vec<ChildRef>>,
    active_joints: Vec<String>,
}

impl KinematicTree {
    /// Validates a description and builds the tree.
    ///
    /// Joint axes are normalized. Children keep the order in which their
    /// joints appear in the description, which fixes the traversal order and
    /// therefore the column order of the Jacobian.
    pub fn from_description(description: ModelDescription) -> Result<Self, ModelError> {
        let links: HashSet<&str> = description.links.iter().map(String::as_str).collect();
        let mut has_parent: HashSet<&str> = HashSet::new();

        for joint in &description.joints {
            for link in [&joint.parent, &joint.child] {
                if !links.contains(link.as_str()) {
                    return Err(ModelError::UnknownLink {
                        joint: joint.name.clone(),
                        link: link.clone(),
                    });
                }
            }
            if !has_parent.insert(joint.child.as_str()) {
                return Err(ModelError::MultipleParents(joint.child.clone()));
            }
        }

        let roots: Vec<String> = description
            .links
            .iter()
            .filter(|link| !has_parent.contains(link.as_str()))
            .cloned()
            .collect();
        let root = match roots.len() {
            0 => return Err(ModelError::NoRoot),
            1 => roots[0].clone(),
            _ => return Err(ModelError::MultipleRoots(roots)),
        };

        let mut joints = HashMap::with_capacity(description.joints.len());
        let mut child_map: HashMap<String, Vec<ChildRef>> = HashMap::new();
        for mut joint in description.joints {
            if !joint.is_fixed() {
                let axis = joint.axis();
                let norm = axis.norm();
                if norm < f64::EPSILON {
                    return Err(ModelError::ZeroAxis(joint.name));
                }
                joint.axis = (axis / norm).into();
            }
            child_map.entry(joint.parent.clone()).or_default().push(ChildRef {
                joint: joint.name.clone(),
                link: joint.child.clone(),
            });
            joints.insert(joint.name.clone(), joint);
        }

        let tree = Self::from_parts(description.name, root, joints, child_map);

        let leaves = tree.leaves();
        if leaves.len() > 1 {
            warn!(
                "Model '{}' has {} leaf links ({}); the last one visited is used as the end-effector",
                tree.name,
                leaves.len(),
                leaves.join(", ")
            );
        }
        let reachable = tree.reachable_links().len();
        if reachable < description.links.len() {
            warn!(
                "Model '{}': {} of {} links are not reachable from root '{}'",
                tree.name,
                description.links.len() - reachable,
                description.links.len(),
                tree.root
            );
        }
        debug!(
            "Loaded model '{}' rooted at '{}' with {} active joints",
            tree.name,
            tree.root,
            tree.active_joints.len()
        );

        Ok(tree)
    }

    /// Assembles a tree from already-separated joint and child maps without
    /// validating them against each other.
    ///
    /// A child map entry naming a joint that `joints` does not contain is kept
    /// as is; the walker reports it as a missing joint. The child map must be
    /// acyclic.
    pub fn from_parts(
        name: String,
        root: String,
        joints: HashMap<String, Joint>,
        child_map: HashMap<String, Vec<ChildRef>>,
    ) -> Self {
        let mut tree = Self {
            name,
            root,
            joints,
            child_map,
            active_joints: Vec::new(),
        };
        tree.active_joints = tree.collect_active_joints();
        tree
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let description: ModelDescription = serde_json::from_str(json)?;
        Self::from_description(description)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Loads a URDF file, or a JSON description when the extension is `.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            #[cfg(feature = "urdf")]
            _ => Self::from_urdf_file(path),
            #[cfg(not(feature = "urdf"))]
            _ => Err(ModelError::Parse(format!(
                "unsupported model file '{}'",
                path.display()
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.get(name)
    }

    /// Outgoing edges of `link`; empty for a leaf.
    pub fn children(&self, link: &str) -> &[ChildRef] {
        self.child_map.get(link).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the non-fixed joints in traversal order.
    pub fn active_joints(&self) -> &[String] {
        &self.active_joints
    }

    pub fn active_joint_count(&self) -> usize {
        self.active_joints.len()
    }

    pub fn active_joint_index(&self, name: &str) -> Option<usize> {
        self.active_joints.iter().position(|j| j == name)
    }

    /// Reachable links without outgoing joints, in traversal order.
    pub fn leaves(&self) -> Vec<String> {
        self.reachable_links()
            .into_iter()
            .filter(|link| self.children(link).is_empty())
            .collect()
    }

    fn reachable_links(&self) -> Vec<String> {
        let mut links = vec![self.root.clone()];
        links.extend(self.edges().into_iter().map(|edge| edge.link.clone()));
        links
    }

    fn collect_active_joints(&self) -> Vec<String> {
        self.edges()
            .into_iter()
            .filter_map(|edge| self.joints.get(&edge.joint))
            .filter(|joint| !joint.is_fixed())
            .map(|joint| joint.name.clone())
            .collect()
    }

    /// Every edge reachable from the root, depth first, in the same order the
    /// walker visits them.
    fn edges(&self) -> Vec<&ChildRef> {
        fn visit<'a>(tree: &'a KinematicTree, link: &str, out: &mut Vec<&'a ChildRef>) {
            for child in tree.children(link) {
                out.push(child);
                visit(tree, &child.link, out);
            }
        }
        let mut out = Vec::new();
        visit(self, &self.root, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRANCHED: &str = r#"{
        "name": "branched",
        "links": ["base", "a", "b", "c", "d"],
        "joints": [
            { "name": "j1", "type": "revolute", "parent": "base", "child": "a", "axis": [0, 0, 2] },
            { "name": "j2", "type": "revolute", "parent": "a", "child": "b", "axis": [0, 1, 0] },
            { "name": "fixed", "type": "fixed", "parent": "a", "child": "c" },
            { "name": "j3", "type": "revolute", "parent": "c", "child": "d", "origin": { "xyz": [0.5, 0, 0] } }
        ]
    }"#;

    #[test]
    fn test_load_json_description() {
        let tree = KinematicTree::from_json_str(BRANCHED).unwrap();
        assert_eq!(tree.name(), "branched");
        assert_eq!(tree.root(), "base");
        assert_eq!(tree.active_joints(), ["j1", "j2", "j3"]);
        assert_eq!(tree.active_joint_index("j3"), Some(2));
        assert_eq!(tree.leaves(), ["b", "d"]);

        // axes are normalized and default to x
        assert_eq!(tree.joint("j1").unwrap().axis, [0.0, 0.0, 1.0]);
        assert_eq!(tree.joint("j3").unwrap().axis, [1.0, 0.0, 0.0]);
        assert_eq!(tree.joint("j3").unwrap().origin.xyz, [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_children_keep_declaration_order() {
        let tree = KinematicTree::from_json_str(BRANCHED).unwrap();
        let names: Vec<&str> = tree.children("a").iter().map(|c| c.joint.as_str()).collect();
        assert_eq!(names, ["j2", "fixed"]);
        assert!(tree.children("b").is_empty());
    }

    #[test]
    fn test_rejects_unknown_link() {
        let description = ModelDescription {
            name: "bad".to_string(),
            links: vec!["base".to_string()],
            joints: vec![Joint {
                name: "j1".to_string(),
                joint_type: JointType::Revolute,
                parent: "base".to_string(),
                child: "ghost".to_string(),
                origin: Origin::default(),
                axis: [0.0, 0.0, 1.0],
            }],
        };
        assert_eq!(
            KinematicTree::from_description(description).unwrap_err(),
            ModelError::UnknownLink { joint: "j1".to_string(), link: "ghost".to_string() }
        );
    }

    #[test]
    fn test_rejects_multiple_roots_and_parents() {
        let two_roots = r#"{ "name": "x", "links": ["a", "b"], "joints": [] }"#;
        assert_eq!(
            KinematicTree::from_json_str(two_roots).unwrap_err(),
            ModelError::MultipleRoots(vec!["a".to_string(), "b".to_string()])
        );

        let two_parents = r#"{
            "name": "x",
            "links": ["a", "b", "c"],
            "joints": [
                { "name": "j1", "type": "fixed", "parent": "a", "child": "c" },
                { "name": "j2", "type": "fixed", "parent": "b", "child": "c" }
            ]
        }"#;
        assert_eq!(
            KinematicTree::from_json_str(two_parents).unwrap_err(),
            ModelError::MultipleParents("c".to_string())
        );

        let cycle = r#"{
            "name": "x",
            "links": ["a", "b"],
            "joints": [
                { "name": "j1", "type": "fixed", "parent": "a", "child": "b" },
                { "name": "j2", "type": "fixed", "parent": "b", "child": "a" }
            ]
        }"#;
        assert_eq!(KinematicTree::from_json_str(cycle).unwrap_err(), ModelError::NoRoot);
    }

    #[test]
    fn test_rejects_zero_axis() {
        let json = r#"{
            "name": "x",
            "links": ["a", "b"],
            "joints": [{ "name": "j1", "type": "revolute", "parent": "a", "child": "b", "axis": [0, 0, 0] }]
        }"#;
        assert_eq!(
            KinematicTree::from_json_str(json).unwrap_err(),
            ModelError::ZeroAxis("j1".to_string())
        );
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = KinematicTree::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ModelError::Parse(_)));
    }

    #[test]
    fn test_from_parts_keeps_dangling_joint_reference() {
        let mut child_map = HashMap::new();
        child_map.insert(
            "base".to_string(),
            vec![ChildRef { joint: "ghost".to_string(), link: "tip".to_string() }],
        );
        let tree = KinematicTree::from_parts("x".to_string(), "base".to_string(), HashMap::new(), child_map);
        assert_eq!(tree.active_joint_count(), 0);
        assert!(tree.joint("ghost").is_none());
        assert_eq!(tree.children("base").len(), 1);
    }
}
