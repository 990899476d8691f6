pub mod dictionary;
pub mod games;
pub mod reference;

pub use dictionary::{BoneDescriptor, DictionaryConfig, NamingMode, SkeletonDictionary};
pub use games::Game;
pub use reference::{ReferenceBone, ReferenceSkeleton};
