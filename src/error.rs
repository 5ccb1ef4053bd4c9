use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of links an IK chain may carry.
pub const MAX_IK_CHAIN_LINKS: usize = 16;

/// Fatal conditions that abort an import.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("model is empty or could not be read")]
    EmptyModel,

    #[error("vertex {vertex} uses unsupported deform type {tag}")]
    UnsupportedDeform { vertex: usize, tag: u8 },

    #[error("rigid body {rigid_body} ({name}) has unknown shape type {shape_type}")]
    UnknownShapeType {
        rigid_body: usize,
        name: String,
        shape_type: u8,
    },

    #[error("IK bone {bone} ({name}) has {links} chain links (must be below 16)")]
    IkChainTooLong {
        bone: usize,
        name: String,
        links: usize,
    },

    #[error("{owner} refers to bone {index} through `{field}`, but the model has {bone_count} bones")]
    BoneIndexOutOfRange {
        owner: String,
        field: &'static str,
        index: i32,
        bone_count: usize,
    },

    #[error("joint {joint} ({name}) refers to rigid body {index}, but the model has {rigid_body_count} rigid bodies")]
    RigidBodyIndexOutOfRange {
        joint: usize,
        name: String,
        index: i32,
        rigid_body_count: usize,
    },

    #[error("face {face} refers to vertex {index}, but the model has {vertex_count} vertices")]
    VertexIndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("materials cover {covered} face vertices, but the index list has {indices}")]
    MaterialRangeMismatch { covered: usize, indices: usize },
}

/// Pipeline stage names used in logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStage {
    Validating,
    BuildingArmature,
    BuildingMesh,
    BuildingPhysics,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportStage::Validating => "validation",
            ImportStage::BuildingArmature => "armature",
            ImportStage::BuildingMesh => "mesh",
            ImportStage::BuildingPhysics => "physics",
        };
        f.write_str(name)
    }
}

/// Error returned by `import_model`: the fatal error plus the stage it
/// aborted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage} stage failed: {source}")]
pub struct ImportFailure {
    pub stage: ImportStage,
    #[source]
    pub source: ImportError,
}

// ─── Recoverable conditions ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Raw bone name repeats an earlier bone.
    DuplicateBoneName,
    /// Raw bone name does not survive host name sanitizing unchanged.
    InvalidBoneName,
    /// Display slot entry points at a bone that does not exist.
    MissingDisplayReference,
    /// Texture failed to load; a placeholder image was substituted.
    TextureLoadFailure,
}

impl WarningKind {
    pub fn code(self) -> &'static str {
        match self {
            WarningKind::DuplicateBoneName => "DUPLICATE_BONE_NAME",
            WarningKind::InvalidBoneName => "INVALID_BONE_NAME",
            WarningKind::MissingDisplayReference => "MISSING_DISPLAY_REFERENCE",
            WarningKind::TextureLoadFailure => "TEXTURE_LOAD_FAILURE",
        }
    }
}

/// A recoverable issue recorded during import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl ImportWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Collects warnings for one import and mirrors each one to the log.
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<ImportWarning>,
}

impl Warnings {
    pub fn push(&mut self, kind: WarningKind, message: impl Into<String>) {
        let warning = ImportWarning::new(kind, message);
        log::warn!("[{}] {}", kind.code(), warning.message);
        self.items.push(warning);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportWarning> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<ImportWarning> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_stage_failure_when_formatted_then_stage_and_cause_are_included() {
        let failure = ImportFailure {
            stage: ImportStage::BuildingPhysics,
            source: ImportError::UnknownShapeType {
                rigid_body: 3,
                name: "skirt".to_string(),
                shape_type: 7,
            },
        };

        let message = failure.to_string();
        assert!(message.contains("physics"));
        assert!(message.contains("skirt"));
        assert!(message.contains('7'));
    }

    #[test]
    fn given_pushed_warnings_when_collected_then_order_and_kind_are_kept() {
        let mut warnings = Warnings::default();
        warnings.push(WarningKind::InvalidBoneName, "first");
        warnings.push(WarningKind::TextureLoadFailure, "second");

        let items = warnings.into_vec();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, WarningKind::InvalidBoneName);
        assert_eq!(items[1].message, "second");
    }
}
