use std::collections::{HashMap, HashSet};

use super::Armature;
use crate::error::{Result, RigError};
use crate::math::Transform;
use crate::scene::SourceScene;
use crate::skeleton::{ReferenceSkeleton, SkeletonDictionary};
use crate::skin::BoneBind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Empty,
    Populated,
    Finalized,
}

impl BuildPhase {
    fn name(self) -> &'static str {
        match self {
            BuildPhase::Empty => "empty",
            BuildPhase::Populated => "populated",
            BuildPhase::Finalized => "finalized",
        }
    }
}

/// Bones touched by one `populate` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulateSummary {
    /// Host names of new bones, parents before children
    pub created: Vec<String>,
    /// Host names that already existed and were left alone
    pub existing: Vec<String>,
    /// Host names created only to fill the hierarchy (no skin owns them)
    pub synthesized: Vec<String>,
}

#[derive(Debug, Clone)]
struct CreatedBone {
    armature: usize,
    host: String,
    canonical: String,
    bind: Transform,
}

/// Creates missing bones for one import batch.
///
/// Bind writes (`populate`, any number of calls) all happen before pose
/// writes (`finalize`, once). Bones that already exist are never touched.
///
/// Skin-derived binds of every shape in the batch are `claim`ed up front, so a
/// bone created as an ancestor of one shape gets the bind another shape of the
/// same batch recorded for it, whichever shape is populated first.
pub struct SkeletonBuilder<'a> {
    dictionary: &'a SkeletonDictionary,
    scene: &'a SourceScene,
    reference: Option<&'a ReferenceSkeleton>,
    phase: BuildPhase,
    created: Vec<CreatedBone>,
    claimed: HashMap<String, Transform>,
}

impl<'a> SkeletonBuilder<'a> {
    pub fn new(
        dictionary: &'a SkeletonDictionary,
        scene: &'a SourceScene,
        reference: Option<&'a ReferenceSkeleton>,
    ) -> Self {
        SkeletonBuilder {
            dictionary,
            scene,
            reference,
            phase: BuildPhase::Empty,
            created: Vec::new(),
            claimed: HashMap::new(),
        }
    }

    /// Record the skin-derived binds of one shape of the batch. The first
    /// shape to claim a bone keeps it.
    pub fn claim(&mut self, binds: &[BoneBind]) -> Result<()> {
        if self.phase != BuildPhase::Empty {
            return Err(RigError::BuilderPhase {
                expected: "empty",
                found: self.phase.name(),
            });
        }
        for bind in binds {
            self.claimed
                .entry(bind.canonical.clone())
                .or_insert(bind.bind);
        }
        Ok(())
    }

    /// Bind claimed for `canonical` by any shape of the batch.
    pub fn claimed_bind(&self, canonical: &str) -> Option<&Transform> {
        self.claimed.get(canonical)
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Number of bones created so far in this batch.
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    /// Create every bone in `binds` that `armature` lacks, plus the ancestors
    /// needed to attach them. Bind priority: the shape's own bind, a bind
    /// claimed by another shape of the batch, the reference skeleton (with
    /// `synthesize` on), the file. With `synthesize` off, only the file's own
    /// parent links are followed.
    pub fn populate(
        &mut self,
        armature_id: usize,
        armature: &mut Armature,
        binds: &[BoneBind],
        synthesize: bool,
    ) -> Result<PopulateSummary> {
        if self.phase == BuildPhase::Finalized {
            return Err(RigError::BuilderPhase {
                expected: "empty or populated",
                found: self.phase.name(),
            });
        }
        self.phase = BuildPhase::Populated;

        let owned: HashMap<&str, Transform> = binds
            .iter()
            .map(|b| (b.canonical.as_str(), b.bind))
            .collect();

        let mut pass = PopulatePass {
            armature_id,
            owned,
            synthesize,
            visiting: HashSet::new(),
            summary: PopulateSummary::default(),
        };

        for bind in binds {
            if armature.contains(&bind.host) {
                if !pass.summary.existing.contains(&bind.host) {
                    pass.summary.existing.push(bind.host.clone());
                }
                continue;
            }
            self.ensure_bone(&mut pass, armature, &bind.canonical)?;
        }

        log::debug!(
            "Armature '{}': {} bones created, {} already present",
            armature.name,
            pass.summary.created.len(),
            pass.summary.existing.len()
        );
        Ok(pass.summary)
    }

    /// Write the pose of every bone created in this batch: the file's global
    /// pose of the node, or the bind when the file has no such node.
    pub fn finalize(&mut self, armatures: &mut [Armature]) -> Result<usize> {
        if self.phase == BuildPhase::Finalized {
            return Err(RigError::BuilderPhase {
                expected: "empty or populated",
                found: self.phase.name(),
            });
        }
        self.phase = BuildPhase::Finalized;

        for bone in &self.created {
            let armature = armatures
                .get_mut(bone.armature)
                .ok_or_else(|| RigError::UnknownBone(bone.host.clone()))?;
            let pose = self
                .scene
                .global_transform(&bone.canonical)
                .unwrap_or(bone.bind);
            armature.set_pose(&bone.host, pose)?;
        }

        Ok(self.created.len())
    }

    /// Make sure the bone exists; returns its host name, or `None` when no
    /// bind transform is known for it.
    fn ensure_bone(
        &mut self,
        pass: &mut PopulatePass<'_>,
        armature: &mut Armature,
        canonical: &str,
    ) -> Result<Option<String>> {
        let host = self.dictionary.host_name(canonical).to_string();
        if armature.contains(&host) {
            return Ok(Some(host));
        }

        let owned = pass
            .owned
            .get(canonical)
            .or_else(|| self.claimed.get(canonical))
            .copied();
        let Some(bind) = owned.or_else(|| self.fallback_bind(canonical, pass.synthesize)) else {
            return Ok(None);
        };

        if !pass.visiting.insert(canonical.to_string()) {
            log::warn!("Bone '{}' is its own ancestor; attached as a root", canonical);
            return Ok(None);
        }
        let parent = match self.parent_for(canonical, pass.synthesize) {
            Some(p) => self.ensure_bone(pass, armature, &p)?,
            None => None,
        };
        pass.visiting.remove(canonical);

        // A cyclic chain may have created this bone further down.
        if armature.contains(&host) {
            return Ok(Some(host));
        }

        armature.add_bone(&host, canonical, parent.as_deref(), bind)?;
        log::debug!(
            "Created bone '{}' ({}) under {:?}",
            host,
            canonical,
            parent.as_deref().unwrap_or("<root>")
        );

        if owned.is_none() {
            pass.summary.synthesized.push(host.clone());
        }
        pass.summary.created.push(host.clone());
        self.created.push(CreatedBone {
            armature: pass.armature_id,
            host: host.clone(),
            canonical: canonical.to_string(),
            bind,
        });
        Ok(Some(host))
    }

    /// Bind for a bone no shape of the batch owns: the reference skeleton,
    /// then the file.
    fn fallback_bind(&self, canonical: &str, synthesize: bool) -> Option<Transform> {
        let reference = if synthesize {
            self.reference.and_then(|r| r.global(canonical))
        } else {
            None
        };
        reference.or_else(|| self.scene.global_transform(canonical))
    }

    /// Canonical name of the bone's parent. The file's link wins when it
    /// points at a bone-capable node.
    fn parent_for(&self, canonical: &str, synthesize: bool) -> Option<String> {
        let from_file = self
            .scene
            .node(canonical)
            .and_then(|n| n.parent.as_deref())
            .filter(|p| self.scene.is_bone_node(p, self.dictionary));
        if let Some(p) = from_file {
            return Some(p.to_string());
        }
        if !synthesize {
            return None;
        }

        self.reference
            .and_then(|r| r.parent_of(canonical))
            .or_else(|| self.dictionary.parent_of(canonical))
            .filter(|p| {
                self.reference.is_some_and(|r| r.contains(p)) || self.scene.contains(p)
            })
            .map(str::to_string)
    }
}

struct PopulatePass<'b> {
    armature_id: usize,
    owned: HashMap<&'b str, Transform>,
    synthesize: bool,
    visiting: HashSet<String>,
    summary: PopulateSummary,
}
