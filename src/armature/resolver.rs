use super::Armature;
use crate::math::Transform;
use crate::skin::ShapeTransforms;

/// Whether a shape can join an existing armature.
#[derive(Debug, Clone, PartialEq)]
pub enum Compatibility {
    /// Every shared bone agrees with the stored bind.
    Compatible,
    /// The mismatching bones share one offset. The mesh object absorbs
    /// `invert(offset)`; the armature is left as is.
    ///
    /// Shared bones that already agreed do not veto the offset. After the
    /// correction their implied binds sit `invert(offset)` away from the
    /// stored binds; since existing bones are never rewritten, only the
    /// mesh placement is affected.
    CompatibleWithOffset(Transform),
    Incompatible,
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        !matches!(self, Compatibility::Incompatible)
    }

    /// Transform to apply to the mesh placement and implied binds, if any.
    pub fn correction(&self) -> Option<Transform> {
        match self {
            Compatibility::CompatibleWithOffset(offset) => Some(offset.invert()),
            _ => None,
        }
    }
}

/// Compare a shape's implied binds with the binds stored in `armature`.
/// Read-only: the armature is never touched.
pub fn resolve_compatibility(
    shape: &ShapeTransforms,
    armature: &Armature,
    epsilon: f32,
) -> Compatibility {
    let mut shared = 0usize;
    let mut offsets = Vec::new();

    for implied in &shape.bone_binds {
        let Some(bone) = armature.bone(&implied.host) else {
            continue;
        };
        shared += 1;
        if !implied.bind.near_equal(bone.bind(), epsilon) {
            offsets.push(implied.bind.compose(&bone.bind().invert()));
        }
    }

    if shared == 0 {
        return Compatibility::Incompatible;
    }
    if offsets.is_empty() {
        return Compatibility::Compatible;
    }

    match Transform::average(offsets.iter()) {
        Some(mean) if offsets.iter().all(|o| o.near_equal(&mean, epsilon)) => {
            Compatibility::CompatibleWithOffset(mean)
        }
        _ => Compatibility::Incompatible,
    }
}

/// First armature, in creation order, the shape can join.
pub fn find_compatible_armature(
    shape: &ShapeTransforms,
    armatures: &[Armature],
    epsilon: f32,
) -> Option<(usize, Compatibility)> {
    armatures.iter().enumerate().find_map(|(i, armature)| {
        let verdict = resolve_compatibility(shape, armature, epsilon);
        log::debug!("Armature '{}' verdict: {:?}", armature.name, verdict);
        verdict.is_compatible().then_some((i, verdict))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::{BoneBind, PlacementSource};
    use cgmath::{Deg, Matrix3, Vector3};

    fn translate(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_translation(Vector3::new(x, y, z))
    }

    fn armature() -> Armature {
        let mut armature = Armature::new("Armature");
        armature
            .add_bone("A", "A", None, translate(0.0, 0.0, 10.0))
            .unwrap();
        armature
            .add_bone(
                "B",
                "B",
                Some("A"),
                Transform::new(
                    Vector3::new(0.0, 4.0, 20.0),
                    Matrix3::from_angle_z(Deg(30.0)),
                    1.0,
                ),
            )
            .unwrap();
        armature
    }

    fn implied(binds: &[(&str, Transform)]) -> ShapeTransforms {
        ShapeTransforms {
            placement: Transform::identity(),
            source: PlacementSource::BoneAverage,
            bone_binds: binds
                .iter()
                .map(|(name, bind)| BoneBind {
                    canonical: name.to_string(),
                    host: name.to_string(),
                    bind: *bind,
                })
                .collect(),
            excluded: vec![],
            flagged_for_review: false,
            warnings: vec![],
        }
    }

    #[test]
    fn test_matching_binds_are_compatible() {
        let armature = armature();
        let shape = implied(&[
            ("A", *armature.bone("A").unwrap().bind()),
            ("B", *armature.bone("B").unwrap().bind()),
            ("Extra", translate(1.0, 1.0, 1.0)),
        ]);
        assert_eq!(
            resolve_compatibility(&shape, &armature, 0.001),
            Compatibility::Compatible
        );
    }

    #[test]
    fn test_single_mismatch_yields_its_offset() {
        let armature = armature();
        let delta = translate(0.0, 0.0, 2.5);
        let b = *armature.bone("B").unwrap().bind();
        let shape = implied(&[
            ("A", *armature.bone("A").unwrap().bind()),
            ("B", delta.compose(&b)),
        ]);

        let verdict = resolve_compatibility(&shape, &armature, 0.001);
        match &verdict {
            Compatibility::CompatibleWithOffset(offset) => {
                assert!(offset.near_equal(&delta, 0.001))
            }
            other => panic!("expected an offset, got {:?}", other),
        }

        let mut corrected = shape.clone();
        corrected.apply_correction(&verdict.correction().unwrap());
        assert!(corrected.bind_of("B").unwrap().near_equal(&b, 0.001));

        // A agreed before the correction and is moved off its stored bind by it.
        let a = *armature.bone("A").unwrap().bind();
        let a_after = corrected.bind_of("A").unwrap();
        assert!(a_after.near_equal(&delta.invert().compose(&a), 0.001));
        assert!(!a_after.near_equal(&a, 0.001));
        match resolve_compatibility(&corrected, &armature, 0.001) {
            Compatibility::CompatibleWithOffset(offset) => {
                assert!(offset.near_equal(&delta.invert(), 0.001))
            }
            other => panic!("expected A's offset, got {:?}", other),
        }
    }

    #[test]
    fn test_divergent_mismatches_are_incompatible() {
        let armature = armature();
        let shape = implied(&[
            ("A", translate(0.0, 0.0, 15.0)),
            (
                "B",
                translate(0.0, 3.0, 0.0).compose(armature.bone("B").unwrap().bind()),
            ),
        ]);
        assert_eq!(
            resolve_compatibility(&shape, &armature, 0.001),
            Compatibility::Incompatible
        );
    }

    #[test]
    fn test_no_shared_bones_is_incompatible() {
        let shape = implied(&[("C", Transform::identity())]);
        assert_eq!(
            resolve_compatibility(&shape, &armature(), 0.001),
            Compatibility::Incompatible
        );
        assert!(find_compatible_armature(&shape, &[armature()], 0.001).is_none());
    }

    #[test]
    fn test_first_compatible_armature_wins() {
        let unrelated = Armature::new("Armature");
        let target = armature();
        let shape = implied(&[("A", *target.bone("A").unwrap().bind())]);

        let found = find_compatible_armature(&shape, &[unrelated, target.clone(), target], 0.001);
        assert_eq!(found, Some((1, Compatibility::Compatible)));
    }
}
