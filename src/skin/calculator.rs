use cgmath::InnerSpace;
use serde::{Deserialize, Serialize};

use super::{SkinBinding, SkinnedShape};
use crate::import::report::{ImportWarning, WarningCategory, WarningSeverity};
use crate::math::{ToleranceProfile, Transform};
use crate::scene::SourceScene;
use crate::skeleton::{ReferenceSkeleton, SkeletonDictionary};

/// Where a bone's global transform can come from.
#[derive(Debug, Clone, Copy)]
pub struct BoneSources<'a> {
    pub scene: &'a SourceScene,
    pub reference: Option<&'a ReferenceSkeleton>,
}

impl<'a> BoneSources<'a> {
    pub fn new(scene: &'a SourceScene, reference: Option<&'a ReferenceSkeleton>) -> Self {
        BoneSources { scene, reference }
    }

    /// Bind-space global transform: the reference skeleton when it has the
    /// bone, otherwise the file's node tree.
    pub fn known_global(&self, name: &str) -> Option<Transform> {
        self.reference
            .and_then(|r| r.global(name))
            .or_else(|| self.scene.global_transform(name))
    }

    /// The file's own global pose of a node.
    pub fn pose_global(&self, name: &str) -> Option<Transform> {
        self.scene.global_transform(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalculatorSettings {
    pub tolerance: ToleranceProfile,
    /// Bones needed before a shared pose offset is trusted.
    pub min_pose_offset_samples: usize,
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        CalculatorSettings {
            tolerance: ToleranceProfile::STANDARD,
            min_pose_offset_samples: 1,
        }
    }
}

/// Which branch produced the placement transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSource {
    /// No skin: the shape's own transform.
    Unskinned,
    /// Explicit global-to-skin transform combined with the bone estimate.
    ExplicitSkinTransform,
    /// Mean of the bone-implied skin placements.
    BoneAverage,
    /// Every bone's pose sits at the same offset from its bind position.
    UniformPoseOffset,
    /// Nothing usable; identity placement.
    BindDataGap,
}

/// Bind transform a shape implies for one of its bones (armature space).
#[derive(Debug, Clone)]
pub struct BoneBind {
    pub canonical: String,
    pub host: String,
    pub bind: Transform,
}

#[derive(Debug, Clone)]
pub struct ShapeTransforms {
    /// Transform for the mesh object.
    pub placement: Transform,
    pub source: PlacementSource,
    pub bone_binds: Vec<BoneBind>,
    /// Bones found in neither the node tree nor the reference skeleton.
    pub excluded: Vec<String>,
    pub flagged_for_review: bool,
    pub warnings: Vec<ImportWarning>,
}

impl ShapeTransforms {
    pub fn bind_of(&self, canonical: &str) -> Option<&Transform> {
        self.bone_binds
            .iter()
            .find(|b| b.canonical == canonical)
            .map(|b| &b.bind)
    }

    /// Move the mesh and every implied bind by `correction` (applied last).
    pub fn apply_correction(&mut self, correction: &Transform) {
        self.placement = correction.compose(&self.placement);
        for b in &mut self.bone_binds {
            b.bind = correction.compose(&b.bind);
        }
    }
}

/// Derive the mesh placement and per-bone bind transforms for one shape.
pub fn calculate_shape_transforms(
    shape: &SkinnedShape,
    sources: &BoneSources,
    dictionary: &SkeletonDictionary,
    settings: &CalculatorSettings,
) -> ShapeTransforms {
    let Some(skin) = &shape.skin else {
        return ShapeTransforms {
            placement: shape.transform,
            source: PlacementSource::Unskinned,
            bone_binds: vec![],
            excluded: vec![],
            flagged_for_review: false,
            warnings: vec![],
        };
    };

    let eps = settings.tolerance.transform_epsilon;
    let mut warnings = Vec::new();

    let (terms, excluded) = bone_terms(skin, sources);
    for name in &excluded {
        warnings.push(ImportWarning::new(
            "BONE_NOT_FOUND",
            format!(
                "Bone '{}' is in neither the file's node tree nor the reference skeleton; \
                 left out of the placement estimate",
                name
            ),
            WarningSeverity::Warning,
            WarningCategory::Skin,
            &shape.name,
        ));
    }

    let estimate = Transform::average(terms.iter().map(|(_, t)| t));
    let agree = estimate
        .map(|avg| terms.iter().all(|(_, t)| t.near_equal(&avg, eps)))
        .unwrap_or(false);

    let (placement, source) = match (estimate, skin.global_to_skin) {
        (Some(avg), Some(global_to_skin)) => (
            explicit_placement(&shape.transform, &global_to_skin, &avg.invert()),
            PlacementSource::ExplicitSkinTransform,
        ),
        (Some(avg), None) if agree => (avg, PlacementSource::BoneAverage),
        _ => match uniform_pose_offset(skin, sources, eps, settings.min_pose_offset_samples) {
            Some(offset) => {
                warnings.push(ImportWarning::new(
                    "UNIFORM_POSE_OFFSET",
                    "Placement taken from the shared offset between bone poses and binds"
                        .to_string(),
                    WarningSeverity::Info,
                    WarningCategory::Skin,
                    &shape.name,
                ));
                (offset, PlacementSource::UniformPoseOffset)
            }
            None => match estimate {
                Some(avg) => {
                    warnings.push(ImportWarning::new(
                        "BIND_DATA_INCONSISTENT",
                        format!(
                            "Bones disagree on where the skin sits (epsilon {}); \
                             using their mean placement",
                            eps
                        ),
                        WarningSeverity::Warning,
                        WarningCategory::Skin,
                        &shape.name,
                    ));
                    (avg, PlacementSource::BoneAverage)
                }
                None => {
                    warnings.push(ImportWarning::new(
                        "BIND_DATA_GAP",
                        "No bone bind data usable for placement; imported at identity"
                            .to_string(),
                        WarningSeverity::Review,
                        WarningCategory::Skin,
                        &shape.name,
                    ));
                    (Transform::identity(), PlacementSource::BindDataGap)
                }
            },
        },
    };

    log::debug!("Shape '{}' placed via {:?}", shape.name, source);

    let bone_binds = skin
        .bones
        .iter()
        .map(|b| BoneBind {
            canonical: b.name.clone(),
            host: dictionary.host_name(&b.name).to_string(),
            bind: placement.compose(&b.skin_to_bone.invert()),
        })
        .collect();

    ShapeTransforms {
        placement,
        source,
        bone_binds,
        excluded,
        flagged_for_review: source == PlacementSource::BindDataGap,
        warnings,
    }
}

/// Per-bone "global bone transform ∘ skin-to-bone" terms, plus the names of
/// bones with no known global transform.
fn bone_terms(
    skin: &SkinBinding,
    sources: &BoneSources,
) -> (Vec<(String, Transform)>, Vec<String>) {
    let mut terms = Vec::with_capacity(skin.bones.len());
    let mut excluded = Vec::new();
    for bone in &skin.bones {
        match sources.known_global(&bone.name) {
            Some(global) => terms.push((bone.name.clone(), global.compose(&bone.skin_to_bone))),
            None => excluded.push(bone.name.clone()),
        }
    }
    (terms, excluded)
}

/// `invert(shape_transform ∘ global_to_skin ∘ xform_calc)`
fn explicit_placement(
    shape_transform: &Transform,
    global_to_skin: &Transform,
    xform_calc: &Transform,
) -> Transform {
    shape_transform
        .compose(global_to_skin)
        .compose(xform_calc)
        .invert()
}

/// Shared pose-vs-bind offset, if every bone with a pose in the file agrees.
fn uniform_pose_offset(
    skin: &SkinBinding,
    sources: &BoneSources,
    epsilon: f32,
    min_samples: usize,
) -> Option<Transform> {
    let deltas: Vec<Transform> = skin
        .bones
        .iter()
        .filter_map(|b| {
            sources
                .pose_global(&b.name)
                .map(|pose| pose.compose(&b.skin_to_bone))
        })
        .collect();

    if deltas.is_empty() || deltas.len() < min_samples {
        return None;
    }

    let mean = Transform::average(deltas.iter())?;
    if deltas.iter().all(|d| d.near_equal(&mean, epsilon)) {
        Some(mean)
    } else {
        None
    }
}

/// Outcome of comparing a shape's implied binds against the reference skeleton.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceConsistency {
    /// Every bone sits at the same offset from its reference bind.
    Consistent,
    /// `bone` deviates from the shared offset by `deviation` units.
    Inconsistent { bone: String, deviation: f32 },
    /// No bone of the shape is in the reference skeleton.
    NotChecked,
}

/// Check that the shape's implied binds differ from the reference skeleton by
/// one common offset. When they do not, the reference cannot be used to
/// synthesize bones for this shape.
pub fn check_reference_consistency(
    shape: &ShapeTransforms,
    reference: &ReferenceSkeleton,
    epsilon: f32,
) -> ReferenceConsistency {
    let deltas: Vec<(&str, Transform)> = shape
        .bone_binds
        .iter()
        .filter_map(|b| {
            reference
                .global(&b.canonical)
                .map(|r| (b.canonical.as_str(), b.bind.compose(&r.invert())))
        })
        .collect();

    let Some(mean) = Transform::average(deltas.iter().map(|(_, d)| d)) else {
        return ReferenceConsistency::NotChecked;
    };

    let worst = deltas
        .iter()
        .filter(|(_, delta)| !delta.near_equal(&mean, epsilon))
        .map(|(bone, delta)| (*bone, (delta.translation - mean.translation).magnitude()))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    if let Some((bone, deviation)) = worst {
        return ReferenceConsistency::Inconsistent {
            bone: bone.to_string(),
            deviation,
        };
    }

    ReferenceConsistency::Consistent
}
