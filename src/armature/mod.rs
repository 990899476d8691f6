pub mod builder;
pub mod resolver;

use std::collections::HashMap;

use cgmath::Matrix4;
use ptree::{item::StringItem, TreeBuilder};

use crate::error::{Result, RigError};
use crate::math::Transform;

pub use builder::{BuildPhase, PopulateSummary, SkeletonBuilder};
pub use resolver::{find_compatible_armature, resolve_compatibility, Compatibility};

/// A bone of an armature. Bind and pose are independent; each is written
/// exactly once.
#[derive(Debug, Clone)]
pub struct Bone {
    /// Host-tool name; the armature's key
    pub name: String,
    /// Name used in the source file
    pub canonical: String,
    pub parent: Option<String>,
    bind: Transform,
    pose: Option<Transform>,
}

impl Bone {
    /// Rest transform in armature space.
    pub fn bind(&self) -> &Transform {
        &self.bind
    }

    /// Displayed transform in armature space, once the pose pass ran.
    pub fn pose(&self) -> Option<&Transform> {
        self.pose.as_ref()
    }
}

/// Named bones forming one or more trees.
#[derive(Debug, Clone, Default)]
pub struct Armature {
    pub name: String,
    bones: Vec<Bone>,
    index: HashMap<String, usize>,
}

impl Armature {
    pub fn new(name: &str) -> Self {
        Armature {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.index.get(name).map(|&i| &self.bones[i])
    }

    /// Bones in creation order; parents always precede their children.
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter()
    }

    /// Create a bone with its bind transform. The parent must already exist.
    pub fn add_bone(
        &mut self,
        name: &str,
        canonical: &str,
        parent: Option<&str>,
        bind: Transform,
    ) -> Result<()> {
        if self.contains(name) {
            return Err(RigError::BoneAlreadyExists(name.to_string()));
        }
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(RigError::UnknownBone(p.to_string()));
            }
        }

        self.index.insert(name.to_string(), self.bones.len());
        self.bones.push(Bone {
            name: name.to_string(),
            canonical: canonical.to_string(),
            parent: parent.map(str::to_string),
            bind,
            pose: None,
        });
        Ok(())
    }

    /// Write the pose transform of a bone. Only the first write is accepted.
    pub fn set_pose(&mut self, name: &str, pose: Transform) -> Result<()> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| RigError::UnknownBone(name.to_string()))?;
        let bone = &mut self.bones[i];
        if bone.pose.is_some() {
            return Err(RigError::PoseAlreadySet(name.to_string()));
        }
        bone.pose = Some(pose);
        Ok(())
    }

    /// Bind transform relative to the parent bone, as the host's bone
    /// creation API expects it.
    pub fn bind_local(&self, name: &str) -> Option<Transform> {
        let bone = self.bone(name)?;
        match bone.parent.as_deref().and_then(|p| self.bone(p)) {
            Some(parent) => Some(parent.bind.invert().compose(&bone.bind)),
            None => Some(bone.bind),
        }
    }

    pub fn bind_local_matrix(&self, name: &str) -> Option<Matrix4<f32>> {
        self.bind_local(name).map(|t| t.to_matrix())
    }

    /// Pose expressed in the bone's own rest space (`invert(bind) ∘ pose`).
    pub fn pose_space(&self, name: &str) -> Option<Transform> {
        let bone = self.bone(name)?;
        let pose = bone.pose?;
        Some(bone.bind.invert().compose(&pose))
    }

    pub fn pose_space_matrix(&self, name: &str) -> Option<Matrix4<f32>> {
        self.pose_space(name).map(|t| t.to_matrix())
    }

    pub fn roots(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.parent.is_none())
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bone> {
        self.bones
            .iter()
            .filter(move |b| b.parent.as_deref() == Some(name))
    }

    /// Indented bone hierarchy, two spaces per level.
    pub fn hierarchy_dump(&self) -> String {
        let mut lines = vec![self.name.clone()];
        for root in self.roots() {
            self.dump_bone(root, 1, &mut lines);
        }
        lines.join("\n")
    }

    fn dump_bone(&self, bone: &Bone, depth: usize, lines: &mut Vec<String>) {
        lines.push(format!("{}{}", "  ".repeat(depth), bone.name));
        for child in self.children(&bone.name) {
            self.dump_bone(child, depth + 1, lines);
        }
    }

    /// Tree for `ptree::print_tree`.
    pub fn to_tree(&self) -> StringItem {
        let mut tree = TreeBuilder::new(self.name.clone());
        for root in self.roots() {
            self.add_bone_to_tree(root, &mut tree);
        }
        tree.build()
    }

    fn add_bone_to_tree(&self, bone: &Bone, tree: &mut TreeBuilder) {
        let label = if bone.canonical == bone.name {
            bone.name.clone()
        } else {
            format!("{} ({})", bone.name, bone.canonical)
        };

        if self.children(&bone.name).next().is_none() {
            tree.add_empty_child(label);
        } else {
            tree.begin_child(label);
            for child in self.children(&bone.name) {
                self.add_bone_to_tree(child, tree);
            }
            tree.end_child();
        }
    }
}
