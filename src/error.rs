use std::io;

/// Rig reconciliation error types.
///
/// Problems in the imported data itself are not errors; they are recorded as
/// warnings in the import report. These variants cover broken configuration
/// and misuse of the builder/armature APIs.
#[derive(Debug)]
pub enum RigError {
    /// IO error occurred while reading configuration
    Io(io::Error),

    /// JSON configuration could not be parsed
    Json(serde_json::Error),

    /// Two bone descriptors share a name in the same lookup table
    DuplicateBoneName { table: &'static str, name: String },

    /// A bone was referenced that the armature does not contain
    UnknownBone(String),

    /// A bone with this name already exists in the armature
    BoneAlreadyExists(String),

    /// The bone's pose transform was already written
    PoseAlreadySet(String),

    /// Skeleton builder used out of phase order
    BuilderPhase {
        expected: &'static str,
        found: &'static str,
    },

    /// Invalid configuration value
    InvalidConfig(String),
}

impl std::fmt::Display for RigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RigError::Io(e) => write!(f, "IO error: {}", e),
            RigError::Json(e) => write!(f, "JSON error: {}", e),
            RigError::DuplicateBoneName { table, name } => {
                write!(f, "Duplicate bone name '{}' in {} table", name, table)
            }
            RigError::UnknownBone(name) => write!(f, "Unknown bone '{}'", name),
            RigError::BoneAlreadyExists(name) => write!(f, "Bone '{}' already exists", name),
            RigError::PoseAlreadySet(name) => {
                write!(f, "Pose transform of bone '{}' was already set", name)
            }
            RigError::BuilderPhase { expected, found } => write!(
                f,
                "Skeleton builder is {} but the operation requires {}",
                found, expected
            ),
            RigError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for RigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RigError::Io(e) => Some(e),
            RigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RigError {
    fn from(err: io::Error) -> Self {
        RigError::Io(err)
    }
}

impl From<serde_json::Error> for RigError {
    fn from(err: serde_json::Error) -> Self {
        RigError::Json(err)
    }
}

/// Result type for rig operations
pub type Result<T> = std::result::Result<T, RigError>;
