use super::{SkinBinding, SkinBone, VertexGroup};
use crate::armature::Armature;
use crate::error::{Result, RigError};
use crate::math::Transform;
use crate::skeleton::SkeletonDictionary;

/// Skin data an exporter writes for a mesh placed at `placement` and bound
/// to `armature` through `groups`.
///
/// Bone names come back in the file's naming; each skin-to-bone transform is
/// `invert(bind) ∘ placement`.
pub fn skin_binding_for_export(
    armature: &Armature,
    placement: &Transform,
    groups: &[VertexGroup],
    dictionary: &SkeletonDictionary,
) -> Result<SkinBinding> {
    let bones = groups
        .iter()
        .map(|group| {
            let bone = armature
                .bone(&group.name)
                .ok_or_else(|| RigError::UnknownBone(group.name.clone()))?;
            Ok(SkinBone {
                name: dictionary.canonical_name(&group.name).to_string(),
                skin_to_bone: bone.bind().invert().compose(placement),
                weights: group.weights.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SkinBinding {
        bones,
        global_to_skin: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ToleranceProfile;
    use crate::scene::{NodeKind, SourceNode, SourceScene};
    use crate::skeleton::BoneDescriptor;
    use crate::skin::{
        calculate_shape_transforms, BoneSources, CalculatorSettings, PlacementSource,
        SkinnedShape,
    };
    use cgmath::{Deg, Matrix3, Vector3};

    fn dictionary() -> SkeletonDictionary {
        SkeletonDictionary::new(
            "test",
            vec![
                BoneDescriptor::new("Spine", None),
                BoneDescriptor::new("L Hand", Some("Spine")),
            ],
            ToleranceProfile::STANDARD,
        )
        .unwrap()
    }

    fn armature() -> Armature {
        let mut armature = Armature::new("Armature");
        armature
            .add_bone(
                "Spine",
                "Spine",
                None,
                Transform::from_translation(Vector3::new(0.0, 0.0, 80.0)),
            )
            .unwrap();
        armature
            .add_bone(
                "Hand.L",
                "L Hand",
                Some("Spine"),
                Transform::new(
                    Vector3::new(40.0, 0.0, 95.0),
                    Matrix3::from_angle_y(Deg(-20.0)),
                    1.0,
                ),
            )
            .unwrap();
        armature
    }

    fn group(name: &str) -> VertexGroup {
        VertexGroup {
            name: name.to_string(),
            weights: vec![(0, 1.0), (1, 0.5)],
        }
    }

    #[test]
    fn test_export_uses_canonical_names_and_recovers_placement() {
        let dict = dictionary();
        let armature = armature();
        let placement = Transform::new(
            Vector3::new(0.0, 2.0, -10.0),
            Matrix3::from_angle_z(Deg(90.0)),
            1.0,
        );

        let skin =
            skin_binding_for_export(&armature, &placement, &[group("Spine"), group("Hand.L")], &dict)
                .unwrap();
        assert_eq!(skin.bone_names().collect::<Vec<_>>(), vec!["Spine", "L Hand"]);
        assert_eq!(skin.bones[1].weights, vec![(0, 1.0), (1, 0.5)]);

        // Reading the exported data back against the same skeleton places the
        // mesh where it was.
        let scene = SourceScene::new(
            armature
                .bones()
                .map(|b| SourceNode::new(&b.canonical, None, NodeKind::Bone, *b.bind()))
                .collect(),
        );
        let shape = SkinnedShape {
            name: "Body".to_string(),
            transform: Transform::identity(),
            skin: Some(skin),
        };
        let result = calculate_shape_transforms(
            &shape,
            &BoneSources::new(&scene, None),
            &dict,
            &CalculatorSettings::default(),
        );
        assert_eq!(result.source, PlacementSource::BoneAverage);
        assert!(result.placement.near_equal(&placement, 0.001));
    }

    #[test]
    fn test_unknown_group_is_an_error() {
        let result = skin_binding_for_export(
            &armature(),
            &Transform::identity(),
            &[group("Tail")],
            &dictionary(),
        );
        assert!(matches!(result, Err(RigError::UnknownBone(ref name)) if name == "Tail"));
    }
}
