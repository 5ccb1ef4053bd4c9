use log::info;
use nalgebra::Vector3;
use serde::Serialize;

use crate::armature::Armature;
use crate::coord::{convert_position, convert_rotation};
use crate::error::ImportError;
use crate::model::{Joint, Model, RigidBody, RigidBodyMode, RigidBodyParam};
use crate::naming::{NameTemplate, make_name};

pub const RIGID_BODY_COLLECTION: &str = "RigidBodies";
pub const JOINT_COLLECTION: &str = "Joints";

const JOINT_MARKER_SEGMENTS: u32 = 8;
const JOINT_MARKER_RINGS: u32 = 4;
const JOINT_MARKER_SIZE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Sphere,
    Box,
    Cylinder,
}

impl TryFrom<u8> for ShapeKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShapeKind::Sphere),
            1 => Ok(ShapeKind::Box),
            2 => Ok(ShapeKind::Cylinder),
            other => Err(other),
        }
    }
}

/// Host primitive used as proxy geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyPrimitive {
    IcoSphere { radius: f32 },
    /// Unit cube resized by `scale`.
    Cube { scale: Vector3<f32> },
    /// Unit cylinder resized by `scale`.
    Cylinder { scale: Vector3<f32> },
    UvSphere { segments: u32, rings: u32, size: f32 },
}

impl ProxyPrimitive {
    /// Primitive for a rigid body shape. Sizes are in source axis order.
    pub fn for_shape(shape: ShapeKind, size: &Vector3<f32>, scale: f32) -> Self {
        let size = size * scale;
        match shape {
            ShapeKind::Sphere => ProxyPrimitive::IcoSphere { radius: size.x },
            ShapeKind::Box => ProxyPrimitive::Cube {
                scale: Vector3::new(size.x, size.z, size.y),
            },
            ShapeKind::Cylinder => ProxyPrimitive::Cylinder {
                scale: Vector3::new(size.x, size.x, size.y),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayHint {
    Wire,
    Solid,
}

/// Collision proxy of one rigid body, carrying its simulation parameters.
#[derive(Debug, Clone, Serialize)]
pub struct RigidBodyProxy {
    pub object_name: String,
    pub name: String,
    pub shape: ShapeKind,
    pub primitive: ProxyPrimitive,
    pub location: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub display: DisplayHint,
    /// Armature node the body follows.
    pub bone: usize,
    pub bone_name: String,
    pub mode: RigidBodyMode,
    pub collision_group: u8,
    pub collision_mask: u16,
    pub param: RigidBodyParam,
}

/// Marker proxy of one joint. Limits and springs are copied from the source
/// unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct JointProxy {
    pub object_name: String,
    pub name: String,
    pub primitive: ProxyPrimitive,
    pub location: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub display: DisplayHint,
    pub rigid_body_a: String,
    pub rigid_body_b: String,
    pub translation_limit_min: Vector3<f32>,
    pub translation_limit_max: Vector3<f32>,
    pub rotation_limit_min: Vector3<f32>,
    pub rotation_limit_max: Vector3<f32>,
    pub spring_constant_translation: Vector3<f32>,
    pub spring_constant_rotation: Vector3<f32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PhysicsProxySet {
    pub rigid_bodies: Vec<RigidBodyProxy>,
    pub joints: Vec<JointProxy>,
}

/// Builds rigid-body and joint proxies. Bone names come from `armature`.
pub fn build_physics(
    model: &Model,
    armature: &Armature,
    scale: f32,
) -> Result<PhysicsProxySet, ImportError> {
    let rigid_bodies = model
        .rigid_bodies
        .iter()
        .enumerate()
        .map(|(index, body)| rigid_body_proxy(index, body, armature, scale))
        .collect::<Result<Vec<_>, _>>()?;

    let joints = model
        .joints
        .iter()
        .enumerate()
        .map(|(index, joint)| joint_proxy(index, joint, &model.rigid_bodies, scale))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "built physics proxies: {} rigid bodies, {} joints",
        rigid_bodies.len(),
        joints.len()
    );

    Ok(PhysicsProxySet {
        rigid_bodies,
        joints,
    })
}

fn rigid_body_proxy(
    index: usize,
    body: &RigidBody,
    armature: &Armature,
    scale: f32,
) -> Result<RigidBodyProxy, ImportError> {
    let shape = ShapeKind::try_from(body.shape_type).map_err(|shape_type| {
        ImportError::UnknownShapeType {
            rigid_body: index,
            name: body.name.clone(),
            shape_type,
        }
    })?;

    // unbound bodies follow the first bone
    let bone_index = if body.bone_index == -1 { 0 } else { body.bone_index };
    let bone = usize::try_from(bone_index)
        .ok()
        .and_then(|bone| armature.bone(bone))
        .ok_or_else(|| ImportError::BoneIndexOutOfRange {
            owner: format!("rigid body {} ({})", index, body.name),
            field: "bone_index",
            index: body.bone_index,
            bone_count: armature.bones.len(),
        })?;

    Ok(RigidBodyProxy {
        object_name: make_name(NameTemplate::RIGID_BODY, index, &body.name),
        name: body.name.clone(),
        shape,
        primitive: ProxyPrimitive::for_shape(shape, &body.shape_size, scale),
        location: convert_position(&body.shape_position, scale),
        rotation: convert_rotation(&body.shape_rotation),
        display: DisplayHint::Wire,
        bone: bone.index,
        bone_name: bone.name.clone(),
        mode: body.mode,
        collision_group: body.collision_group,
        collision_mask: body.no_collision_group,
        param: body.param,
    })
}

fn joint_proxy(
    index: usize,
    joint: &Joint,
    rigid_bodies: &[RigidBody],
    scale: f32,
) -> Result<JointProxy, ImportError> {
    let body_name = |body_index: i32| {
        usize::try_from(body_index)
            .ok()
            .and_then(|body| rigid_bodies.get(body))
            .map(|body| body.name.clone())
            .ok_or_else(|| ImportError::RigidBodyIndexOutOfRange {
                joint: index,
                name: joint.name.clone(),
                index: body_index,
                rigid_body_count: rigid_bodies.len(),
            })
    };

    Ok(JointProxy {
        object_name: make_name(NameTemplate::JOINT, index, &joint.name),
        name: joint.name.clone(),
        primitive: ProxyPrimitive::UvSphere {
            segments: JOINT_MARKER_SEGMENTS,
            rings: JOINT_MARKER_RINGS,
            size: JOINT_MARKER_SIZE,
        },
        location: convert_position(&joint.position, scale),
        rotation: convert_rotation(&joint.rotation),
        display: DisplayHint::Solid,
        rigid_body_a: body_name(joint.rigidbody_index_a)?,
        rigid_body_b: body_name(joint.rigidbody_index_b)?,
        translation_limit_min: joint.translation_limit_min,
        translation_limit_max: joint.translation_limit_max,
        rotation_limit_min: joint.rotation_limit_min,
        rotation_limit_max: joint.rotation_limit_max,
        spring_constant_translation: joint.spring_constant_translation,
        spring_constant_rotation: joint.spring_constant_rotation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::build_armature;
    use crate::error::Warnings;
    use crate::model::Bone;

    fn body(name: &str, shape_type: u8, bone_index: i32) -> RigidBody {
        RigidBody {
            name: name.to_string(),
            bone_index,
            shape_type,
            shape_size: Vector3::new(1.0, 2.0, 3.0),
            shape_position: Vector3::new(0.5, 10.0, -1.0),
            shape_rotation: Vector3::new(0.1, 0.2, 0.3),
            collision_group: 3,
            no_collision_group: 0xfff0,
            param: RigidBodyParam {
                mass: 2.5,
                linear_damping: 0.5,
                angular_damping: 0.9,
                restitution: 0.1,
                friction: 0.4,
            },
            mode: RigidBodyMode::Dynamic,
            ..RigidBody::default()
        }
    }

    fn physics_model() -> Model {
        Model {
            bones: vec![
                Bone {
                    name: "center".to_string(),
                    ..Bone::default()
                },
                Bone {
                    name: "head".to_string(),
                    parent_index: 0,
                    ..Bone::default()
                },
            ],
            rigid_bodies: vec![body("ball", 0, 1), body("crate", 1, -1), body("can", 2, 0)],
            joints: vec![Joint {
                name: "neck_joint".to_string(),
                rigidbody_index_a: 0,
                rigidbody_index_b: 2,
                position: Vector3::new(1.0, 2.0, 3.0),
                rotation: Vector3::new(0.1, 0.2, 0.3),
                translation_limit_min: Vector3::new(-1.0, -2.0, -3.0),
                rotation_limit_max: Vector3::new(0.5, 0.25, 0.125),
                spring_constant_rotation: Vector3::new(10.0, 20.0, 30.0),
                ..Joint::default()
            }],
            ..Model::default()
        }
    }

    fn build(model: &Model) -> Result<PhysicsProxySet, ImportError> {
        let mut warnings = Warnings::default();
        let armature = build_armature("model", &model.bones, &[], 1.0, &mut warnings).unwrap();
        build_physics(model, &armature, 1.0)
    }

    #[test]
    fn given_each_shape_when_building_then_primitive_sizes_are_axis_swapped() {
        let proxies = build(&physics_model()).unwrap();

        assert_eq!(proxies.rigid_bodies[0].primitive, ProxyPrimitive::IcoSphere { radius: 1.0 });
        assert_eq!(
            proxies.rigid_bodies[1].primitive,
            ProxyPrimitive::Cube {
                scale: Vector3::new(1.0, 3.0, 2.0)
            }
        );
        assert_eq!(
            proxies.rigid_bodies[2].primitive,
            ProxyPrimitive::Cylinder {
                scale: Vector3::new(1.0, 1.0, 2.0)
            }
        );
    }

    #[test]
    fn given_rigid_body_when_building_then_transform_and_metadata_are_attached() {
        let proxies = build(&physics_model()).unwrap();

        let ball = &proxies.rigid_bodies[0];
        assert_eq!(ball.object_name, "r00:ball");
        assert_eq!(ball.location, Vector3::new(0.5, -1.0, 10.0));
        assert_eq!(ball.rotation, Vector3::new(-0.1, -0.3, -0.2));
        assert_eq!(ball.bone_name, "head");
        assert_eq!(ball.collision_group, 3);
        assert_eq!(ball.collision_mask, 0xfff0);
        assert_eq!(ball.mode, RigidBodyMode::Dynamic);
        assert_eq!(ball.param.mass, 2.5);
        assert_eq!(ball.param.friction, 0.4);
        assert_eq!(ball.display, DisplayHint::Wire);
    }

    #[test]
    fn given_unbound_rigid_body_when_building_then_first_bone_is_used() {
        let proxies = build(&physics_model()).unwrap();

        assert_eq!(proxies.rigid_bodies[1].bone, 0);
        assert_eq!(proxies.rigid_bodies[1].bone_name, "center");
    }

    #[test]
    fn given_unknown_shape_type_when_building_then_physics_build_fails() {
        let mut model = physics_model();
        model.rigid_bodies[2].shape_type = 3;

        let error = build(&model).unwrap_err();

        assert_eq!(
            error,
            ImportError::UnknownShapeType {
                rigid_body: 2,
                name: "can".to_string(),
                shape_type: 3,
            }
        );
    }

    #[test]
    fn given_joint_when_building_then_marker_carries_body_names_and_raw_limits() {
        let proxies = build(&physics_model()).unwrap();

        let joint = &proxies.joints[0];
        assert_eq!(joint.object_name, "j00:neck_joint");
        assert_eq!(joint.location, Vector3::new(1.0, 3.0, 2.0));
        assert_eq!(joint.rotation, Vector3::new(-0.1, -0.3, -0.2));
        assert_eq!(joint.rigid_body_a, "ball");
        assert_eq!(joint.rigid_body_b, "can");
        assert_eq!(joint.translation_limit_min, Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(joint.rotation_limit_max, Vector3::new(0.5, 0.25, 0.125));
        assert_eq!(joint.spring_constant_rotation, Vector3::new(10.0, 20.0, 30.0));
        assert_eq!(
            joint.primitive,
            ProxyPrimitive::UvSphere {
                segments: 8,
                rings: 4,
                size: 0.1
            }
        );
    }

    #[test]
    fn given_joint_with_missing_body_when_building_then_reference_error() {
        let mut model = physics_model();
        model.joints[0].rigidbody_index_b = 7;

        let error = build(&model).unwrap_err();

        assert!(matches!(
            error,
            ImportError::RigidBodyIndexOutOfRange {
                joint: 0,
                index: 7,
                rigid_body_count: 3,
                ..
            }
        ));
    }

    #[test]
    fn given_scale_when_building_shape_then_size_is_scaled() {
        let primitive = ProxyPrimitive::for_shape(ShapeKind::Sphere, &Vector3::new(2.0, 0.0, 0.0), 0.5);
        assert_eq!(primitive, ProxyPrimitive::IcoSphere { radius: 1.0 });
    }
}
