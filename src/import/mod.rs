pub mod report;

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::armature::{find_compatible_armature, Armature, SkeletonBuilder};
use crate::config::ImportOptions;
use crate::math::Transform;
use crate::scene::{SourceNode, SourceScene};
use crate::skeleton::{ReferenceSkeleton, SkeletonDictionary};
use crate::skin::{
    calculate_shape_transforms, check_reference_consistency, BoneSources, PlacementSource,
    ReferenceConsistency, SkinnedShape, VertexGroup,
};

use report::{ImportReport, ImportWarning, WarningCategory, WarningSeverity};

/// One file's worth of input: its node list and its shapes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportBatch {
    #[serde(default)]
    pub nodes: Vec<SourceNode>,
    #[serde(default)]
    pub shapes: Vec<SkinnedShape>,
}

impl ImportBatch {
    pub fn from_json_reader<R: Read>(reader: R) -> crate::error::Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_path(path: &Path) -> crate::error::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    pub fn scene(&self) -> SourceScene {
        SourceScene::new(self.nodes.clone())
    }
}

/// Result of importing one shape.
#[derive(Debug, Clone)]
pub struct ImportedShape {
    pub name: String,
    /// Transform of the mesh object, offset correction included
    pub placement: Transform,
    pub placement_source: PlacementSource,
    /// Index into the session's armatures; `None` for unskinned shapes
    pub armature: Option<usize>,
    /// Weights per host bone name
    pub vertex_groups: Vec<VertexGroup>,
    pub synthesis_active: bool,
    pub flagged_for_review: bool,
    /// Correction applied to the mesh to fit an existing armature
    pub corrective_offset: Option<Transform>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub shapes: Vec<ImportedShape>,
    pub report: ImportReport,
    /// Bone synthesis ran for at least one shape of the batch
    pub synthesis_active: bool,
    pub bones_created: usize,
}

impl BatchOutcome {
    pub fn shape(&self, name: &str) -> Option<&ImportedShape> {
        self.shapes.iter().find(|s| s.name == name)
    }
}

/// Armatures built up over any number of import batches.
pub struct ImportSession {
    dictionary: SkeletonDictionary,
    reference: Option<ReferenceSkeleton>,
    options: ImportOptions,
    armatures: Vec<Armature>,
}

impl ImportSession {
    /// The dictionary is switched to the naming mode of `options`.
    pub fn new(
        dictionary: SkeletonDictionary,
        reference: Option<ReferenceSkeleton>,
        options: ImportOptions,
    ) -> Self {
        ImportSession {
            dictionary: dictionary.with_mode(options.naming_mode),
            reference,
            options,
            armatures: Vec::new(),
        }
    }

    pub fn dictionary(&self) -> &SkeletonDictionary {
        &self.dictionary
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn armatures(&self) -> &[Armature] {
        &self.armatures
    }

    pub fn armature(&self, id: usize) -> Option<&Armature> {
        self.armatures.get(id)
    }

    pub fn into_armatures(self) -> Vec<Armature> {
        self.armatures
    }

    /// Import the shapes of one file. Every shape is calculated before any
    /// bone is created, and all binds of the batch are written before any
    /// pose; data problems end up in the report, not as errors.
    pub fn import_batch(
        &mut self,
        scene: &SourceScene,
        shapes: &[SkinnedShape],
    ) -> anyhow::Result<BatchOutcome> {
        let settings = self.options.calculator_settings(&self.dictionary);
        let tolerance = settings.tolerance;
        let reference = self.reference.as_ref();
        let synthesis_allowed = self.options.create_bones && reference.is_some();

        let sources = BoneSources::new(scene, reference);
        let mut builder = SkeletonBuilder::new(&self.dictionary, scene, reference);
        let mut report = ImportReport::new();
        let mut imported = Vec::with_capacity(shapes.len());

        let mut calculated = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let mut transforms =
                calculate_shape_transforms(shape, &sources, &self.dictionary, &settings);
            report.extend(transforms.warnings.drain(..));
            if shape.is_skinned() {
                builder
                    .claim(&transforms.bone_binds)
                    .with_context(|| format!("Failed to record binds of shape '{}'", shape.name))?;
            }
            calculated.push(transforms);
        }

        for (shape, mut transforms) in shapes.iter().zip(calculated) {
            let Some(skin) = &shape.skin else {
                imported.push(ImportedShape {
                    name: shape.name.clone(),
                    placement: transforms.placement,
                    placement_source: transforms.source,
                    armature: None,
                    vertex_groups: vec![],
                    synthesis_active: false,
                    flagged_for_review: false,
                    corrective_offset: None,
                });
                continue;
            };

            let mut corrective_offset = None;
            let armature_id = match find_compatible_armature(
                &transforms,
                &self.armatures,
                tolerance.transform_epsilon,
            ) {
                Some((id, verdict)) => {
                    if let Some(correction) = verdict.correction() {
                        transforms.apply_correction(&correction);
                        report.add(ImportWarning::new(
                            "MESH_OFFSET_APPLIED",
                            format!(
                                "Mesh moved to fit armature '{}'",
                                self.armatures[id].name
                            ),
                            WarningSeverity::Info,
                            WarningCategory::Armature,
                            &shape.name,
                        ));
                        corrective_offset = Some(correction);
                    }
                    Some(id)
                }
                None => None,
            };

            let extending = armature_id.is_some();
            let armature_id = match armature_id {
                Some(id) => id,
                None => {
                    let shares_bones = self.armatures.iter().any(|a| {
                        transforms.bone_binds.iter().any(|b| a.contains(&b.host))
                    });
                    if shares_bones {
                        report.add(ImportWarning::new(
                            "ARMATURE_INCOMPATIBLE",
                            "Bind transforms do not fit any existing armature; \
                             created a new one"
                                .to_string(),
                            WarningSeverity::Warning,
                            WarningCategory::Armature,
                            &shape.name,
                        ));
                    }
                    self.armatures
                        .push(Armature::new(&armature_name(self.armatures.len())));
                    self.armatures.len() - 1
                }
            };

            let mut synthesis_active = synthesis_allowed;
            if extending && synthesis_active {
                if let Some(reference) = reference {
                    if let ReferenceConsistency::Inconsistent { bone, deviation } =
                        check_reference_consistency(
                            &transforms,
                            reference,
                            tolerance.consistency_epsilon,
                        )
                    {
                        report.add(ImportWarning::new(
                            "REFERENCE_INCONSISTENT",
                            format!(
                                "Bone '{}' is {:.3} units off the reference skeleton; \
                                 no bones synthesized for this shape",
                                bone, deviation
                            ),
                            WarningSeverity::Warning,
                            WarningCategory::Skeleton,
                            &shape.name,
                        ));
                        synthesis_active = false;
                    }
                }
            }

            builder
                .populate(
                    armature_id,
                    &mut self.armatures[armature_id],
                    &transforms.bone_binds,
                    synthesis_active,
                )
                .with_context(|| format!("Failed to build bones for shape '{}'", shape.name))?;

            let vertex_groups = skin
                .bones
                .iter()
                .map(|b| VertexGroup {
                    name: self.dictionary.host_name(&b.name).to_string(),
                    weights: b.weights.clone(),
                })
                .collect();

            imported.push(ImportedShape {
                name: shape.name.clone(),
                placement: transforms.placement,
                placement_source: transforms.source,
                armature: Some(armature_id),
                vertex_groups,
                synthesis_active,
                flagged_for_review: transforms.flagged_for_review,
                corrective_offset,
            });
        }

        builder
            .finalize(&mut self.armatures)
            .context("Failed to set bone poses")?;
        let bones_created = builder.created_count();

        log::info!(
            "Imported {} shapes: {} bones created, {} warnings",
            imported.len(),
            bones_created,
            report.items.len()
        );

        Ok(BatchOutcome {
            synthesis_active: imported.iter().any(|s| s.synthesis_active),
            shapes: imported,
            report,
            bones_created,
        })
    }
}

/// "Armature", "Armature.001", ...
fn armature_name(index: usize) -> String {
    if index == 0 {
        "Armature".to_string()
    } else {
        format!("Armature.{:03}", index)
    }
}
