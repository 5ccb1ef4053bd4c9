use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::model::Deform;

/// One bone influence on a vertex, by raw source bone index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub bone: i32,
    pub weight: f32,
}

impl BoneWeight {
    pub fn new(bone: i32, weight: f32) -> Self {
        Self { bone, weight }
    }
}

/// Normalizes a vertex deform into a flat weighted-influence list.
///
/// - `Bdef1`: one bone at full weight.
/// - `Bdef2`/`Sdef`: `(w0, 1 - w0)`. SDEF curvature parameters are dropped
///   and the vertex is treated as a linear two-bone blend.
/// - `Bdef4`: weights passed through as stored. Slots with a negative bone
///   index are unused and skipped.
///
/// Anything else fails with [`ImportError::UnsupportedDeform`].
pub fn normalize(vertex: usize, deform: &Deform) -> Result<Vec<BoneWeight>, ImportError> {
    match deform {
        Deform::Bdef1 { bone } => Ok(vec![BoneWeight::new(*bone, 1.0)]),
        Deform::Bdef2 {
            bone0,
            bone1,
            weight0,
        }
        | Deform::Sdef {
            bone0,
            bone1,
            weight0,
            ..
        } => Ok(vec![
            BoneWeight::new(*bone0, *weight0),
            BoneWeight::new(*bone1, 1.0 - *weight0),
        ]),
        Deform::Bdef4 { bones, weights } => Ok(bones
            .iter()
            .zip(weights.iter())
            .filter(|(bone, _)| **bone >= 0)
            .map(|(bone, weight)| BoneWeight::new(*bone, *weight))
            .collect()),
        Deform::Unsupported { tag } => Err(ImportError::UnsupportedDeform {
            vertex,
            tag: *tag,
        }),
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;

    #[test]
    fn given_bdef1_when_normalizing_then_single_full_weight() {
        let weights = normalize(0, &Deform::Bdef1 { bone: 4 }).unwrap();
        assert_eq!(weights, vec![BoneWeight::new(4, 1.0)]);
    }

    #[test]
    fn given_bdef2_when_normalizing_then_weights_are_complementary() {
        let weights = normalize(
            0,
            &Deform::Bdef2 {
                bone0: 1,
                bone1: 2,
                weight0: 0.3,
            },
        )
        .unwrap();

        assert_eq!(
            weights,
            vec![BoneWeight::new(1, 0.3), BoneWeight::new(2, 1.0 - 0.3)]
        );
        let sum: f32 = weights.iter().map(|w| w.weight).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn given_bdef4_when_normalizing_then_weights_pass_through() {
        let weights = normalize(
            0,
            &Deform::Bdef4 {
                bones: [0, 1, 2, 3],
                weights: [0.5, 0.25, 0.125, 0.0625],
            },
        )
        .unwrap();

        assert_eq!(weights.len(), 4);
        assert_eq!(weights[3], BoneWeight::new(3, 0.0625));
    }

    #[test]
    fn given_bdef4_with_unused_slots_when_normalizing_then_slots_are_skipped() {
        let weights = normalize(
            0,
            &Deform::Bdef4 {
                bones: [5, 6, -1, -1],
                weights: [0.6, 0.4, 0.0, 0.0],
            },
        )
        .unwrap();

        assert_eq!(
            weights,
            vec![BoneWeight::new(5, 0.6), BoneWeight::new(6, 0.4)]
        );
    }

    #[test]
    fn given_sdef_when_normalizing_then_linear_two_bone_blend_is_used() {
        let weights = normalize(
            0,
            &Deform::Sdef {
                bone0: 7,
                bone1: 8,
                weight0: 0.75,
                c: Vector3::new(0.0, 1.0, 0.0),
                r0: Vector3::zeros(),
                r1: Vector3::zeros(),
            },
        )
        .unwrap();

        assert_eq!(
            weights,
            vec![BoneWeight::new(7, 0.75), BoneWeight::new(8, 0.25)]
        );
    }

    #[test]
    fn given_unsupported_deform_when_normalizing_then_vertex_is_reported() {
        let error = normalize(42, &Deform::Unsupported { tag: 4 }).unwrap_err();
        assert_eq!(error, ImportError::UnsupportedDeform { vertex: 42, tag: 4 });
    }
}
