pub mod armature;
pub mod config;
pub mod error;
pub mod import;
pub mod math;
pub mod scene;
pub mod skeleton;
pub mod skin;

pub use config::ImportOptions;
pub use error::{Result, RigError};
pub use import::{BatchOutcome, ImportBatch, ImportSession, ImportedShape};
