use log::info;
use nalgebra::{Vector2, Vector3};
use serde::Serialize;

use crate::armature::Armature;
use crate::coord::convert_position;
use crate::deform::normalize;
use crate::error::ImportError;
use crate::model::Model;
use crate::naming::{NameTemplate, make_name};
use crate::texture::TextureSet;

pub const MESH_NAME: &str = "Mesh";
pub const UV_LAYER_NAME: &str = "uv0";

/// Material slot of the mesh, in source material order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeshMaterial {
    pub name: String,
    pub source_name: String,
    /// Texture slot referenced by the source material.
    pub texture: Option<usize>,
    /// Image in [`TextureSet::images`] sampled by this material's faces.
    pub image: Option<usize>,
}

/// Per-face-loop texture coordinates; three loops per face.
#[derive(Debug, Clone, Serialize)]
pub struct UvLayer {
    pub name: String,
    pub loops: Vec<Vector2<f32>>,
    /// Image sampled by each face, by face index.
    pub face_images: Vec<Option<usize>>,
}

/// Influence of one armature bone on a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VertexWeight {
    /// Node index into [`Armature::bones`].
    pub bone: usize,
    pub weight: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkinnedMesh {
    pub name: String,
    /// Armature deforming this mesh; bones drive it through vertex groups
    /// only, never envelopes.
    pub armature: String,
    pub use_bone_envelopes: bool,
    pub positions: Vec<Vector3<f32>>,
    pub triangles: Vec<[u32; 3]>,
    pub face_materials: Vec<usize>,
    pub smooth_shading: bool,
    pub uv_layer: UvLayer,
    pub materials: Vec<MeshMaterial>,
    pub textures: TextureSet,
    /// Bone influences by vertex index.
    pub vertex_weights: Vec<Vec<VertexWeight>>,
}

impl SkinnedMesh {
    /// Vertex group of one bone: `(vertex, weight)` pairs in vertex order.
    pub fn vertex_group(&self, bone: usize) -> Vec<(usize, f32)> {
        self.vertex_weights
            .iter()
            .enumerate()
            .filter_map(|(vertex, weights)| {
                weights
                    .iter()
                    .find(|weight| weight.bone == bone)
                    .map(|weight| (vertex, weight.weight))
            })
            .collect()
    }

    /// Loop UVs of one face.
    pub fn face_uvs(&self, face: usize) -> &[Vector2<f32>] {
        &self.uv_layer.loops[face * 3..face * 3 + 3]
    }
}

/// UV in target image space: V runs the other way.
fn flip_uv(uv: &Vector2<f32>) -> Vector2<f32> {
    Vector2::new(uv.x, 1.0 - uv.y)
}

/// Builds the skinned mesh for `model`, bound to `armature`.
pub fn build_mesh(
    model: &Model,
    armature: &Armature,
    textures: TextureSet,
    scale: f32,
) -> Result<SkinnedMesh, ImportError> {
    let vertex_count = model.vertices.len();

    let covered: usize = model.materials.iter().map(|m| m.vertex_count).sum();
    if covered != model.indices.len() || model.materials.iter().any(|m| m.vertex_count % 3 != 0) {
        return Err(ImportError::MaterialRangeMismatch {
            covered,
            indices: model.indices.len(),
        });
    }

    let positions: Vec<Vector3<f32>> = model
        .vertices
        .iter()
        .map(|vertex| convert_position(&vertex.position, scale))
        .collect();

    // reversed winding for the handedness flip
    let mut triangles = Vec::with_capacity(model.indices.len() / 3);
    for (face, corners) in model.indices.chunks_exact(3).enumerate() {
        if let Some(index) = corners.iter().find(|index| **index as usize >= vertex_count) {
            return Err(ImportError::VertexIndexOutOfRange {
                face,
                index: *index,
                vertex_count,
            });
        }
        triangles.push([corners[2], corners[1], corners[0]]);
    }

    let mut face_materials = Vec::with_capacity(triangles.len());
    let mut uv_layer = UvLayer {
        name: UV_LAYER_NAME.to_string(),
        loops: Vec::with_capacity(model.indices.len()),
        face_images: Vec::with_capacity(triangles.len()),
    };
    let mut materials = Vec::with_capacity(model.materials.len());

    let mut next_face = 0;
    for (ordinal, material) in model.materials.iter().enumerate() {
        let image = textures.image_for_texture(material.texture_index);
        materials.push(MeshMaterial {
            name: make_name(NameTemplate::MATERIAL, ordinal, &material.name),
            source_name: material.name.clone(),
            texture: usize::try_from(material.texture_index)
                .ok()
                .filter(|index| *index < textures.textures.len()),
            image,
        });

        for face in next_face..next_face + material.vertex_count / 3 {
            face_materials.push(ordinal);
            for corner in triangles[face] {
                uv_layer
                    .loops
                    .push(flip_uv(&model.vertices[corner as usize].uv));
            }
            uv_layer.face_images.push(image);
        }
        next_face += material.vertex_count / 3;
    }

    let vertex_weights = bind_vertices(model, armature)?;

    info!(
        "built mesh: {} vertices, {} faces, {} materials",
        positions.len(),
        triangles.len(),
        materials.len()
    );

    Ok(SkinnedMesh {
        name: MESH_NAME.to_string(),
        armature: armature.name.clone(),
        use_bone_envelopes: false,
        positions,
        triangles,
        face_materials,
        smooth_shading: true,
        uv_layer,
        materials,
        textures,
        vertex_weights,
    })
}

/// Resolves every vertex deform to armature bone weights. Repeated bones on
/// one vertex accumulate, clamped to 1.
fn bind_vertices(model: &Model, armature: &Armature) -> Result<Vec<Vec<VertexWeight>>, ImportError> {
    let bone_count = armature.bones.len();

    model
        .vertices
        .iter()
        .enumerate()
        .map(|(vertex, source)| {
            let mut weights: Vec<VertexWeight> = Vec::with_capacity(4);
            for influence in normalize(vertex, &source.deform)? {
                let bone = usize::try_from(influence.bone)
                    .ok()
                    .filter(|bone| *bone < bone_count)
                    .ok_or_else(|| ImportError::BoneIndexOutOfRange {
                        owner: format!("vertex {vertex}"),
                        field: "deform",
                        index: influence.bone,
                        bone_count,
                    })?;
                match weights.iter_mut().find(|weight| weight.bone == bone) {
                    Some(existing) => {
                        existing.weight = (existing.weight + influence.weight).min(1.0);
                    }
                    None => weights.push(VertexWeight {
                        bone,
                        weight: influence.weight,
                    }),
                }
            }
            Ok(weights)
        })
        .collect()
}
