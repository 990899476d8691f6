use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};
use crate::math::ToleranceProfile;
use crate::skeleton::{Game, NamingMode, SkeletonDictionary};
use crate::skin::CalculatorSettings;

/// Options controlling an import session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Host-side bone naming.
    pub naming_mode: NamingMode,
    /// Synthesize bones missing from the file out of the reference skeleton.
    /// Bones the file itself provides are always created.
    pub create_bones: bool,
    /// Overrides the dictionary's tolerance profile.
    pub tolerance: Option<ToleranceProfile>,
    /// Bones that must agree before a shared pose offset places a shape.
    pub min_pose_offset_samples: usize,
    /// Built-in dictionary to use; detected from the node names when unset.
    pub game: Option<Game>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            naming_mode: NamingMode::Mirrored,
            create_bones: true,
            tolerance: None,
            min_pose_offset_samples: 1,
            game: None,
        }
    }
}

impl ImportOptions {
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let options: ImportOptions = serde_json::from_reader(reader)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_pose_offset_samples == 0 {
            return Err(RigError::InvalidConfig(
                "min_pose_offset_samples must be at least 1".to_string(),
            ));
        }
        if let Some(t) = self.tolerance {
            if !(t.transform_epsilon > 0.0 && t.consistency_epsilon > 0.0) {
                return Err(RigError::InvalidConfig(format!(
                    "tolerances must be positive (got {} / {})",
                    t.transform_epsilon, t.consistency_epsilon
                )));
            }
        }
        Ok(())
    }

    /// Effective tolerances for a dictionary.
    pub fn tolerance_for(&self, dictionary: &SkeletonDictionary) -> ToleranceProfile {
        self.tolerance.unwrap_or_else(|| dictionary.tolerance())
    }

    pub fn calculator_settings(&self, dictionary: &SkeletonDictionary) -> CalculatorSettings {
        CalculatorSettings {
            tolerance: self.tolerance_for(dictionary),
            min_pose_offset_samples: self.min_pose_offset_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options =
            ImportOptions::from_json_reader(r#"{ "naming_mode": "alternate" }"#.as_bytes())
                .unwrap();
        assert_eq!(options.naming_mode, NamingMode::Alternate);
        assert!(options.create_bones);
        assert_eq!(options.min_pose_offset_samples, 1);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let result =
            ImportOptions::from_json_reader(r#"{ "min_pose_offset_samples": 0 }"#.as_bytes());
        assert!(matches!(result, Err(RigError::InvalidConfig(_))));
    }

    #[test]
    fn test_tolerance_override() {
        let dict = SkeletonDictionary::for_game(Game::Fallout4).unwrap();
        assert_eq!(
            ImportOptions::default().tolerance_for(&dict),
            ToleranceProfile::NOISY
        );
        let options = ImportOptions {
            tolerance: Some(ToleranceProfile::STANDARD),
            ..Default::default()
        };
        assert_eq!(options.calculator_settings(&dict).tolerance, ToleranceProfile::STANDARD);
    }
}
