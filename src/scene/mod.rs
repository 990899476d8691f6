use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::math::Transform;
use crate::skeleton::SkeletonDictionary;

/// Kind of a node in the source file's node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain grouping node (scene root, containers)
    #[default]
    Group,
    Bone,
    Mesh,
    /// Attachment point such as a weapon or effect marker
    Marker,
}

/// What a node of a given kind can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Can become an armature bone
    pub articulates: bool,
    /// Can carry skin data
    pub carries_skin: bool,
    /// Is an attachment point for other objects
    pub attachment: bool,
}

impl NodeKind {
    pub fn capabilities(self) -> Capabilities {
        match self {
            NodeKind::Group => Capabilities {
                articulates: false,
                carries_skin: false,
                attachment: false,
            },
            NodeKind::Bone => Capabilities {
                articulates: true,
                carries_skin: false,
                attachment: false,
            },
            NodeKind::Mesh => Capabilities {
                articulates: false,
                carries_skin: true,
                attachment: false,
            },
            NodeKind::Marker => Capabilities {
                articulates: false,
                carries_skin: false,
                attachment: true,
            },
        }
    }
}

/// One entry of the file's flat node list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    /// Canonical (in-file) name
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub kind: NodeKind,
    /// Parent-relative pose transform as stored in the file
    #[serde(default)]
    pub transform: Transform,
}

impl SourceNode {
    pub fn new(name: &str, parent: Option<&str>, kind: NodeKind, transform: Transform) -> Self {
        SourceNode {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            kind,
            transform,
        }
    }
}

/// The file's node tree, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct SourceScene {
    nodes: Vec<SourceNode>,
    index: HashMap<String, usize>,
}

impl SourceScene {
    /// Later duplicates of a name are ignored; the first node wins.
    pub fn new(nodes: Vec<SourceNode>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.name.clone()).or_insert(i);
        }
        SourceScene { nodes, index }
    }

    pub fn nodes(&self) -> &[SourceNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&SourceNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&SourceNode> {
        let parent = self.node(name)?.parent.as_deref()?;
        self.node(parent)
    }

    /// Global pose of a node: the composition of every local transform from
    /// the root down. A broken chain (missing parent or cycle) stops the walk
    /// at the last reachable node.
    pub fn global_transform(&self, name: &str) -> Option<Transform> {
        let mut idx = *self.index.get(name)?;
        let mut global = self.nodes[idx].transform;
        let mut steps = 0;

        while let Some(parent) = self.nodes[idx].parent.as_deref() {
            let Some(&p) = self.index.get(parent) else {
                break;
            };
            steps += 1;
            if steps > self.nodes.len() {
                log::warn!("Parent chain of '{}' loops; truncating", name);
                break;
            }
            global = self.nodes[p].transform.compose(&global);
            idx = p;
        }

        Some(global)
    }

    /// Whether a node can become an armature bone: its kind articulates, or
    /// it is not a mesh and the dictionary knows it as a bone.
    pub fn is_bone_node(&self, name: &str, dictionary: &SkeletonDictionary) -> bool {
        match self.node(name) {
            Some(node) => {
                let caps = node.kind.capabilities();
                caps.articulates || (!caps.carries_skin && dictionary.is_bone(name))
            }
            None => false,
        }
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    fn translate(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_translation(Vector3::new(x, y, z))
    }

    #[test]
    fn test_global_transform_walks_parents() {
        let scene = SourceScene::new(vec![
            SourceNode::new("Scene Root", None, NodeKind::Group, translate(0.0, 0.0, 1.0)),
            SourceNode::new("Spine", Some("Scene Root"), NodeKind::Bone, translate(0.0, 0.0, 10.0)),
            SourceNode::new("Neck", Some("Spine"), NodeKind::Bone, translate(0.0, 2.0, 5.0)),
        ]);

        let global = scene.global_transform("Neck").unwrap();
        assert!(global.near_equal(&translate(0.0, 2.0, 16.0), 0.001));
        assert!(scene.global_transform("Head").is_none());
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let scene = SourceScene::new(vec![
            SourceNode::new("A", Some("B"), NodeKind::Bone, translate(1.0, 0.0, 0.0)),
            SourceNode::new("B", Some("A"), NodeKind::Bone, translate(1.0, 0.0, 0.0)),
        ]);
        assert!(scene.global_transform("A").is_some());
    }

    #[test]
    fn test_capabilities() {
        assert!(NodeKind::Bone.capabilities().articulates);
        assert!(NodeKind::Mesh.capabilities().carries_skin);
        assert!(NodeKind::Marker.capabilities().attachment);
        assert!(!NodeKind::Group.capabilities().articulates);
    }
}
