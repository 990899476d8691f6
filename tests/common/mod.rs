// Common test fixtures: a small humanoid skeleton and helpers to fake file data
#![allow(dead_code)]

use cgmath::{Deg, Matrix3, Vector3};
use nif_rig_lib::math::{ToleranceProfile, Transform};
use nif_rig_lib::scene::{NodeKind, SourceNode, SourceScene};
use nif_rig_lib::skeleton::{BoneDescriptor, ReferenceBone, ReferenceSkeleton, SkeletonDictionary};
use nif_rig_lib::skin::{SkinBinding, SkinBone, SkinnedShape};

pub fn translate(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(Vector3::new(x, y, z))
}

/// (canonical name, parent, global bind transform), parents first
pub fn humanoid_bones() -> Vec<(&'static str, Option<&'static str>, Transform)> {
    vec![
        ("Root", None, Transform::identity()),
        ("Spine", Some("Root"), translate(0.0, 0.0, 80.0)),
        (
            "Spine1",
            Some("Spine"),
            Transform::new(
                Vector3::new(0.0, 0.0, 95.0),
                Matrix3::from_angle_x(Deg(5.0)),
                1.0,
            ),
        ),
        ("Spine2", Some("Spine1"), translate(0.0, 0.0, 110.0)),
        (
            "Neck",
            Some("Spine2"),
            Transform::new(
                Vector3::new(0.0, 1.0, 130.0),
                Matrix3::from_angle_x(Deg(-10.0)),
                1.0,
            ),
        ),
        ("Head", Some("Neck"), translate(0.0, 2.0, 140.0)),
        ("L Clavicle", Some("Spine2"), translate(5.0, 0.0, 125.0)),
        (
            "L Hand",
            Some("L Clavicle"),
            Transform::new(
                Vector3::new(60.0, 0.0, 100.0),
                Matrix3::from_angle_z(Deg(90.0)),
                1.0,
            ),
        ),
        ("R Clavicle", Some("Spine2"), translate(-5.0, 0.0, 125.0)),
        (
            "R Hand",
            Some("R Clavicle"),
            Transform::new(
                Vector3::new(-60.0, 0.0, 100.0),
                Matrix3::from_angle_z(Deg(-90.0)),
                1.0,
            ),
        ),
    ]
}

pub fn humanoid_dictionary() -> SkeletonDictionary {
    let descriptors = humanoid_bones()
        .into_iter()
        .map(|(name, parent, _)| BoneDescriptor::new(name, parent))
        .collect();
    SkeletonDictionary::new("Humanoid", descriptors, ToleranceProfile::STANDARD)
        .expect("Failed to build humanoid dictionary")
}

pub fn humanoid_reference_bones() -> Vec<ReferenceBone> {
    humanoid_bones()
        .into_iter()
        .map(|(name, parent, global)| ReferenceBone {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            global,
        })
        .collect()
}

pub fn humanoid_reference() -> ReferenceSkeleton {
    ReferenceSkeleton::new(humanoid_reference_bones())
}

/// Global bind transform of a humanoid bone.
pub fn humanoid_global(name: &str) -> Transform {
    humanoid_bones()
        .into_iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, _, g)| g)
        .unwrap_or_else(|| panic!("No humanoid bone '{}'", name))
}

/// Bone nodes with the given global transforms and no parent links, as in a
/// file that stores every bone at the root.
pub fn flat_scene(globals: &[(&str, Transform)]) -> SourceScene {
    SourceScene::new(
        globals
            .iter()
            .map(|(name, global)| SourceNode::new(name, None, NodeKind::Bone, *global))
            .collect(),
    )
}

/// The named humanoid bones, linked to their parents where the parent is
/// also listed, with parent-relative transforms.
pub fn humanoid_scene(names: &[&str]) -> SourceScene {
    let bones = humanoid_bones();
    let nodes = bones
        .iter()
        .filter(|(name, _, _)| names.contains(name))
        .map(|(name, parent, global)| {
            let parent = parent.filter(|p| names.contains(p));
            let local = match parent {
                Some(p) => humanoid_global(p).invert().compose(global),
                None => *global,
            };
            SourceNode::new(name, parent, NodeKind::Bone, local)
        })
        .collect();
    SourceScene::new(nodes)
}

/// A shape skinned to `bones` (name, bind-time global) with the mesh at
/// `placement`.
pub fn skinned_shape(name: &str, bones: &[(&str, Transform)], placement: &Transform) -> SkinnedShape {
    SkinnedShape {
        name: name.to_string(),
        transform: Transform::identity(),
        skin: Some(SkinBinding {
            bones: bones
                .iter()
                .enumerate()
                .map(|(i, (bone, global))| SkinBone {
                    name: bone.to_string(),
                    skin_to_bone: global.invert().compose(placement),
                    weights: vec![(i as u32, 1.0)],
                })
                .collect(),
            global_to_skin: None,
        }),
    }
}

/// `skinned_shape` with humanoid bind positions.
pub fn humanoid_shape(name: &str, bones: &[&str], placement: &Transform) -> SkinnedShape {
    let globals: Vec<(&str, Transform)> = bones.iter().map(|b| (*b, humanoid_global(b))).collect();
    skinned_shape(name, &globals, placement)
}
