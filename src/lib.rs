//! Converts a parsed PMX model into host-agnostic scene data: an armature with
//! IK and limit constraints, a skinned mesh, and optional physics proxies.

pub mod armature;
pub mod coord;
pub mod deform;
pub mod error;
pub mod import;
pub mod mesh;
pub mod model;
pub mod naming;
pub mod physics;
pub mod texture;

pub use error::{ImportError, ImportFailure, ImportStage, ImportWarning, WarningKind};
pub use import::{ImportOptions, ImportReport, ImportedScene, ModelImporter, import_model};
pub use model::Model;
pub use texture::{FileTextureLoader, TextureLoader};
