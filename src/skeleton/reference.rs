use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::SkeletonDictionary;
use crate::error::Result;
use crate::math::Transform;
use crate::scene::SourceScene;

/// A bone of the reference skeleton, with its bind transform in global space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceBone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub global: Transform,
}

/// Authoritative, complete skeleton used to fill gaps in incomplete files.
/// Keyed by canonical bone name; read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSkeleton {
    bones: Vec<ReferenceBone>,
    index: HashMap<String, usize>,
}

impl ReferenceSkeleton {
    pub fn new(bones: Vec<ReferenceBone>) -> Self {
        let mut index = HashMap::with_capacity(bones.len());
        for (i, bone) in bones.iter().enumerate() {
            index.entry(bone.name.clone()).or_insert(i);
        }
        ReferenceSkeleton { bones, index }
    }

    /// Take the bone-capable nodes of a loaded skeleton file, using their
    /// global transforms as bind transforms.
    pub fn from_scene(scene: &SourceScene, dictionary: &SkeletonDictionary) -> Self {
        let bones = scene
            .nodes()
            .iter()
            .filter(|n| scene.is_bone_node(&n.name, dictionary))
            .filter_map(|n| {
                let global = scene.global_transform(&n.name)?;
                let parent = n
                    .parent
                    .as_deref()
                    .filter(|p| scene.is_bone_node(p, dictionary))
                    .map(str::to_string);
                Some(ReferenceBone {
                    name: n.name.clone(),
                    parent,
                    global,
                })
            })
            .collect();
        Self::new(bones)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let bones: Vec<ReferenceBone> = serde_json::from_reader(reader)?;
        Ok(Self::new(bones))
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    pub fn bone(&self, name: &str) -> Option<&ReferenceBone> {
        self.index.get(name).map(|&i| &self.bones[i])
    }

    pub fn global(&self, name: &str) -> Option<Transform> {
        self.bone(name).map(|b| b.global)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.bone(name)?.parent.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ToleranceProfile;
    use crate::scene::{NodeKind, SourceNode};
    use cgmath::Vector3;

    #[test]
    fn test_from_scene_keeps_bones_only() {
        let up = |z: f32| Transform::from_translation(Vector3::new(0.0, 0.0, z));
        let scene = SourceScene::new(vec![
            SourceNode::new("skeleton.nif", None, NodeKind::Group, up(0.0)),
            SourceNode::new("Root", Some("skeleton.nif"), NodeKind::Bone, up(1.0)),
            SourceNode::new("Spine", Some("Root"), NodeKind::Bone, up(50.0)),
            SourceNode::new("Body", Some("skeleton.nif"), NodeKind::Mesh, up(0.0)),
        ]);
        let dict = SkeletonDictionary::new("empty", vec![], ToleranceProfile::STANDARD).unwrap();

        let reference = ReferenceSkeleton::from_scene(&scene, &dict);
        assert_eq!(reference.len(), 2);
        assert_eq!(reference.parent_of("Root"), None);
        assert_eq!(reference.parent_of("Spine"), Some("Root"));
        assert!(reference.global("Spine").unwrap().near_equal(&up(51.0), 0.001));
        assert!(!reference.contains("Body"));
    }
}
