use serde::{Deserialize, Serialize};

use crate::math::ToleranceProfile;

/// One row of a built-in bone table.
#[derive(Debug, Clone, Copy)]
pub struct GameBone {
    pub canonical: &'static str,
    /// Explicit mirrored host name; derived from `canonical` when `None`.
    pub host: Option<&'static str>,
    pub alternate: Option<&'static str>,
    pub parent: Option<&'static str>,
}

const fn bone(canonical: &'static str, parent: Option<&'static str>) -> GameBone {
    GameBone {
        canonical,
        host: None,
        alternate: None,
        parent,
    }
}

/// Games with a built-in skeleton dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Game {
    Skyrim,
    Fallout4,
}

impl Game {
    pub const ALL: [Game; 2] = [Game::Skyrim, Game::Fallout4];

    pub fn display_name(self) -> &'static str {
        match self {
            Game::Skyrim => "Skyrim",
            Game::Fallout4 => "Fallout 4",
        }
    }

    /// The canonical bone list, parents before children.
    pub fn bones(self) -> &'static [GameBone] {
        match self {
            Game::Skyrim => SKYRIM_BONES,
            Game::Fallout4 => FALLOUT4_BONES,
        }
    }

    /// Fallout 4 skin data is exported with visibly more rounding noise.
    pub fn tolerance(self) -> ToleranceProfile {
        match self {
            Game::Skyrim => ToleranceProfile::STANDARD,
            Game::Fallout4 => ToleranceProfile::NOISY,
        }
    }

    /// Guess the game from the bone names found in a file.
    pub fn detect(bone_names: &[String]) -> Option<Game> {
        let has_skyrim = bone_names
            .iter()
            .any(|n| n.starts_with("NPC ") && n.ends_with(']'));
        let has_fallout4 = bone_names.iter().any(|n| {
            n.starts_with("LArm_")
                || n.starts_with("RArm_")
                || n.starts_with("LLeg_")
                || n.starts_with("RLeg_")
                || n == "SPINE1"
        });

        if has_skyrim {
            Some(Game::Skyrim)
        } else if has_fallout4 {
            Some(Game::Fallout4)
        } else {
            None
        }
    }
}

pub const SKYRIM_BONES: &[GameBone] = &[
    bone("NPC Root [Root]", None),
    bone("NPC COM [COM ]", Some("NPC Root [Root]")),
    bone("NPC Pelvis [Pelv]", Some("NPC COM [COM ]")),
    bone("NPC L Thigh [LThg]", Some("NPC Pelvis [Pelv]")),
    bone("NPC L Calf [LClf]", Some("NPC L Thigh [LThg]")),
    bone("NPC L Foot [Lft ]", Some("NPC L Calf [LClf]")),
    bone("NPC L Toe0 [LToe]", Some("NPC L Foot [Lft ]")),
    bone("NPC R Thigh [RThg]", Some("NPC Pelvis [Pelv]")),
    bone("NPC R Calf [RClf]", Some("NPC R Thigh [RThg]")),
    bone("NPC R Foot [Rft ]", Some("NPC R Calf [RClf]")),
    bone("NPC R Toe0 [RToe]", Some("NPC R Foot [Rft ]")),
    bone("NPC Spine [Spn0]", Some("NPC COM [COM ]")),
    bone("NPC Spine1 [Spn1]", Some("NPC Spine [Spn0]")),
    bone("NPC Spine2 [Spn2]", Some("NPC Spine1 [Spn1]")),
    bone("NPC Neck [Neck]", Some("NPC Spine2 [Spn2]")),
    bone("NPC Head [Head]", Some("NPC Neck [Neck]")),
    bone("NPC L Clavicle [LClv]", Some("NPC Spine2 [Spn2]")),
    bone("NPC L UpperArm [LUar]", Some("NPC L Clavicle [LClv]")),
    bone("NPC L Forearm [LLar]", Some("NPC L UpperArm [LUar]")),
    bone("NPC L Hand [LHnd]", Some("NPC L Forearm [LLar]")),
    bone("NPC R Clavicle [RClv]", Some("NPC Spine2 [Spn2]")),
    bone("NPC R UpperArm [RUar]", Some("NPC R Clavicle [RClv]")),
    bone("NPC R Forearm [RLar]", Some("NPC R UpperArm [RUar]")),
    bone("NPC R Hand [RHnd]", Some("NPC R Forearm [RLar]")),
    GameBone {
        canonical: "NPC Head MagicNode [Hmag]",
        host: None,
        alternate: Some("MagicNode Head"),
        parent: Some("NPC Head [Head]"),
    },
    GameBone {
        canonical: "WEAPON",
        host: Some("Weapon"),
        alternate: None,
        parent: Some("NPC Spine2 [Spn2]"),
    },
];

pub const FALLOUT4_BONES: &[GameBone] = &[
    bone("Root", None),
    bone("COM", Some("Root")),
    bone("Pelvis", Some("COM")),
    bone("LLeg_Thigh", Some("Pelvis")),
    bone("LLeg_Calf", Some("LLeg_Thigh")),
    bone("LLeg_Foot", Some("LLeg_Calf")),
    bone("LLeg_Toe1", Some("LLeg_Foot")),
    bone("RLeg_Thigh", Some("Pelvis")),
    bone("RLeg_Calf", Some("RLeg_Thigh")),
    bone("RLeg_Foot", Some("RLeg_Calf")),
    bone("RLeg_Toe1", Some("RLeg_Foot")),
    bone("SPINE1", Some("COM")),
    bone("SPINE2", Some("SPINE1")),
    bone("Chest", Some("SPINE2")),
    bone("Neck", Some("Chest")),
    bone("Head", Some("Neck")),
    bone("LArm_Collarbone", Some("Chest")),
    bone("LArm_UpperArm", Some("LArm_Collarbone")),
    bone("LArm_ForeArm1", Some("LArm_UpperArm")),
    bone("LArm_Hand", Some("LArm_ForeArm1")),
    bone("RArm_Collarbone", Some("Chest")),
    bone("RArm_UpperArm", Some("RArm_Collarbone")),
    bone("RArm_ForeArm1", Some("RArm_UpperArm")),
    bone("RArm_Hand", Some("RArm_ForeArm1")),
    GameBone {
        canonical: "Weapon",
        host: Some("Weapon"),
        alternate: Some("WeaponNode"),
        parent: Some("RArm_Hand"),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_detect_skyrim() {
        let names = vec![
            "NPC Root [Root]".to_string(),
            "NPC L Hand [LHnd]".to_string(),
        ];
        assert_eq!(Game::detect(&names), Some(Game::Skyrim));
    }

    #[test]
    fn test_detect_fallout4() {
        let names = vec!["Root".to_string(), "LArm_Hand".to_string()];
        assert_eq!(Game::detect(&names), Some(Game::Fallout4));
    }

    #[test]
    fn test_detect_unknown() {
        let names = vec!["bone_root".to_string(), "bone_spine".to_string()];
        assert_eq!(Game::detect(&names), None);
    }

    #[test]
    fn test_tables_list_parents_first() {
        for game in Game::ALL {
            let index: HashMap<&str, usize> = game
                .bones()
                .iter()
                .enumerate()
                .map(|(i, b)| (b.canonical, i))
                .collect();
            for (i, b) in game.bones().iter().enumerate() {
                if let Some(parent) = b.parent {
                    let parent_idx = index[parent];
                    assert!(
                        parent_idx < i,
                        "{}: bone '{}' at {} has parent '{}' at {}",
                        game.display_name(),
                        b.canonical,
                        i,
                        parent,
                        parent_idx
                    );
                }
            }
        }
    }
}
