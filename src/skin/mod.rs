pub mod calculator;
pub mod export;

use serde::{Deserialize, Serialize};

use crate::math::Transform;

pub use calculator::{
    calculate_shape_transforms, check_reference_consistency, BoneBind, BoneSources,
    CalculatorSettings, PlacementSource, ReferenceConsistency, ShapeTransforms,
};
pub use export::skin_binding_for_export;

/// Skin data for one bone of a shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinBone {
    /// Canonical (in-file) bone name
    pub name: String,
    /// Bone position relative to the mesh at bind time (skin space → bone space)
    pub skin_to_bone: Transform,
    /// (vertex index, weight)
    #[serde(default)]
    pub weights: Vec<(u32, f32)>,
}

/// Skin data of one shape. Consumed once by the calculator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinBinding {
    pub bones: Vec<SkinBone>,
    /// Transform applied to every vertex before skinning, when the file has one
    #[serde(default)]
    pub global_to_skin: Option<Transform>,
}

impl SkinBinding {
    pub fn bone(&self, name: &str) -> Option<&SkinBone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }
}

/// Vertex weights of a mesh, named after a host bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexGroup {
    pub name: String,
    pub weights: Vec<(u32, f32)>,
}

/// A mesh shape as read from the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinnedShape {
    pub name: String,
    /// The shape node's own transform
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub skin: Option<SkinBinding>,
}

impl SkinnedShape {
    pub fn is_skinned(&self) -> bool {
        self.skin.is_some()
    }
}
