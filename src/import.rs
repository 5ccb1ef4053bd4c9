use std::path::Path;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::armature::{Armature, ArmatureMetadata, build_armature};
use crate::error::{ImportError, ImportFailure, ImportStage, ImportWarning, Warnings};
use crate::mesh::{SkinnedMesh, build_mesh};
use crate::model::Model;
use crate::physics::{PhysicsProxySet, build_physics};
use crate::texture::{TextureLoader, load_textures};

/// Caller-selected import settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Builds the skinned mesh and loads textures.
    pub include_mesh: bool,
    /// Builds rigid-body and joint proxies.
    pub include_physics: bool,
    /// Uniform position scale; the default maps MMD units to metres.
    pub scale: f32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            include_mesh: true,
            include_physics: false,
            scale: 1.63 / 20.0,
        }
    }
}

/// Progress of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Idle,
    Validating,
    BuildingArmature,
    BuildingMesh,
    BuildingPhysics,
    Done,
    Failed(ImportStage),
}

impl From<ImportStage> for ImportState {
    fn from(stage: ImportStage) -> Self {
        match stage {
            ImportStage::Validating => ImportState::Validating,
            ImportStage::BuildingArmature => ImportState::BuildingArmature,
            ImportStage::BuildingMesh => ImportState::BuildingMesh,
            ImportStage::BuildingPhysics => ImportState::BuildingPhysics,
        }
    }
}

/// Everything one import produced, ready for a host binding to realize.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedScene {
    /// Name of the container collecting the scene objects.
    pub name: String,
    pub armature: Armature,
    pub mesh: Option<SkinnedMesh>,
    pub physics: Option<PhysicsProxySet>,
    pub warnings: Vec<ImportWarning>,
}

/// Summary counts of an imported scene.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub model_name: String,
    pub bone_count: usize,
    pub vertex_count: usize,
    pub face_count: usize,
    pub material_count: usize,
    pub texture_count: usize,
    pub placeholder_texture_count: usize,
    pub rigid_body_count: usize,
    pub joint_count: usize,
    pub warnings: Vec<ImportWarning>,
}

impl ImportedScene {
    pub fn report(&self) -> ImportReport {
        let mesh = self.mesh.as_ref();
        ImportReport {
            model_name: self.name.clone(),
            bone_count: self.armature.bones.len(),
            vertex_count: mesh.map_or(0, |mesh| mesh.positions.len()),
            face_count: mesh.map_or(0, |mesh| mesh.triangles.len()),
            material_count: mesh.map_or(0, |mesh| mesh.materials.len()),
            texture_count: mesh.map_or(0, |mesh| mesh.textures.images.len()),
            placeholder_texture_count: mesh.map_or(0, |mesh| {
                mesh.textures
                    .images
                    .iter()
                    .filter(|image| image.placeholder)
                    .count()
            }),
            rigid_body_count: self
                .physics
                .as_ref()
                .map_or(0, |physics| physics.rigid_bodies.len()),
            joint_count: self.physics.as_ref().map_or(0, |physics| physics.joints.len()),
            warnings: self.warnings.clone(),
        }
    }
}

/// Picks the scene name: model name, English name, then the source file name.
pub fn resolve_model_name(model: &Model, source_path: &Path) -> String {
    if !model.name.is_empty() {
        return model.name.clone();
    }
    if !model.english_name.is_empty() {
        return model.english_name.clone();
    }
    source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

/// Runs the import pipeline for one model.
///
/// Stages run strictly in order: armature, then the optional mesh and physics
/// stages. The first fatal error ends the import and nothing is returned; the
/// caller discards whatever host objects it already created.
pub struct ModelImporter<'a> {
    model: &'a Model,
    source_path: &'a Path,
    options: ImportOptions,
    state: ImportState,
}

impl<'a> ModelImporter<'a> {
    /// `source_path` is the model file; textures resolve against its directory.
    pub fn new(model: &'a Model, source_path: &'a Path, options: ImportOptions) -> Self {
        Self {
            model,
            source_path,
            options,
            state: ImportState::Idle,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn run(&mut self, loader: &mut dyn TextureLoader) -> Result<ImportedScene, ImportFailure> {
        let model = self.model;
        let scale = self.options.scale;
        let mut warnings = Warnings::default();

        self.stage(ImportStage::Validating, || {
            if model.is_empty() {
                Err(ImportError::EmptyModel)
            } else {
                Ok(())
            }
        })?;

        let name = resolve_model_name(model, self.source_path);
        info!("importing model '{}' from {}", name, self.source_path.display());

        let mut armature = self.stage(ImportStage::BuildingArmature, || {
            build_armature(&name, &model.bones, &model.display_slots, scale, &mut warnings)
        })?;
        armature.metadata = ArmatureMetadata {
            name: model.name.clone(),
            english_name: model.english_name.clone(),
            comment: model.comment.clone(),
            english_comment: model.english_comment.clone(),
        };

        let mesh = if self.options.include_mesh {
            let texture_dir = self.source_path.parent().unwrap_or(Path::new(""));
            let textures = load_textures(&model.textures, texture_dir, loader, &mut warnings);
            Some(self.stage(ImportStage::BuildingMesh, || {
                build_mesh(model, &armature, textures, scale)
            })?)
        } else {
            None
        };

        let physics = if self.options.include_physics {
            Some(self.stage(ImportStage::BuildingPhysics, || {
                build_physics(model, &armature, scale)
            })?)
        } else {
            None
        };

        self.enter(ImportState::Done);
        info!("imported '{}' with {} warnings", name, warnings.len());

        Ok(ImportedScene {
            name,
            armature,
            mesh,
            physics,
            warnings: warnings.into_vec(),
        })
    }

    fn enter(&mut self, next: ImportState) {
        debug!("import state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn stage<T>(
        &mut self,
        stage: ImportStage,
        build: impl FnOnce() -> Result<T, ImportError>,
    ) -> Result<T, ImportFailure> {
        self.enter(ImportState::from(stage));
        build().map_err(|source| {
            error!("{} stage failed: {}", stage, source);
            self.enter(ImportState::Failed(stage));
            ImportFailure { stage, source }
        })
    }
}

/// Imports `model` in one call. See [`ModelImporter`].
pub fn import_model(
    model: &Model,
    source_path: &Path,
    options: &ImportOptions,
    loader: &mut dyn TextureLoader,
) -> Result<ImportedScene, ImportFailure> {
    ModelImporter::new(model, source_path, *options).run(loader)
}
