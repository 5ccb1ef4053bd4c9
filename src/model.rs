use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ─── Model ────────────────────────────────────────────────────────────────────

/// Parsed PMX model as handed over by the binary reader.
///
/// All cross references are raw source indices; `-1` means "none". The
/// importer only reads this structure and never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub name: String,
    pub english_name: String,
    pub comment: String,
    pub english_comment: String,
    pub bones: Vec<Bone>,
    pub vertices: Vec<Vertex>,
    /// Flat vertex index list; every three entries form one triangle.
    pub indices: Vec<u32>,
    pub materials: Vec<Material>,
    /// Texture paths relative to the model file.
    pub textures: Vec<String>,
    pub rigid_bodies: Vec<RigidBody>,
    pub joints: Vec<Joint>,
    pub display_slots: Vec<DisplaySlot>,
}

impl Model {
    /// True when the reader produced nothing importable.
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty() && self.vertices.is_empty()
    }
}

// ─── Bones ────────────────────────────────────────────────────────────────────

/// PMX bone flag bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneFlags(pub u16);

impl BoneFlags {
    /// Tail is given as a bone index instead of an offset. The importer also
    /// reads this bit as the "connection" flag.
    pub const TAILPOS_IS_BONE: Self = Self(0x0001);
    pub const CAN_ROTATE: Self = Self(0x0002);
    pub const CAN_TRANSLATE: Self = Self(0x0004);
    pub const IS_VISIBLE: Self = Self(0x0008);
    pub const CAN_MANIPULATE: Self = Self(0x0010);
    pub const IS_IK: Self = Self(0x0020);
    pub const IS_EXTERNAL_ROTATION: Self = Self(0x0100);
    pub const IS_EXTERNAL_TRANSLATION: Self = Self(0x0200);
    pub const HAS_FIXED_AXIS: Self = Self(0x0400);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for BoneFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bone {
    pub name: String,
    pub english_name: String,
    pub position: Vector3<f32>,
    /// Tail offset from `position`; meaningful only without `TAILPOS_IS_BONE`.
    pub tail_position: Vector3<f32>,
    pub parent_index: i32,
    pub tail_index: i32,
    pub flags: BoneFlags,
    pub ik: Option<Ik>,
    pub external_rotation: Option<ExternalRotation>,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            name: String::new(),
            english_name: String::new(),
            position: Vector3::zeros(),
            tail_position: Vector3::zeros(),
            parent_index: -1,
            tail_index: -1,
            flags: BoneFlags::default(),
            ik: None,
            external_rotation: None,
        }
    }
}

impl Bone {
    pub fn has_flag(&self, flag: BoneFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_connected(&self) -> bool {
        self.has_flag(BoneFlags::TAILPOS_IS_BONE)
    }
}

/// IK descriptor carried by a bone flagged `IS_IK`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ik {
    /// End-effector bone that receives the IK constraint.
    pub target_index: i32,
    pub limit_radian: f32,
    pub loop_count: u32,
    pub links: Vec<IkLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IkLink {
    pub bone_index: i32,
    pub limit: Option<AngleLimit>,
}

/// Per-axis rotation bounds in radians, source space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleLimit {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExternalRotation {
    pub effect_index: i32,
    pub effect_factor: f32,
}

// ─── Vertices ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Vector2<f32>,
    pub deform: Deform,
}

/// Vertex-to-bone binding variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Deform {
    Bdef1 {
        bone: i32,
    },
    Bdef2 {
        bone0: i32,
        bone1: i32,
        weight0: f32,
    },
    Bdef4 {
        bones: [i32; 4],
        weights: [f32; 4],
    },
    Sdef {
        bone0: i32,
        bone1: i32,
        weight0: f32,
        c: Vector3<f32>,
        r0: Vector3<f32>,
        r1: Vector3<f32>,
    },
    /// Any binding the reader could decode but the importer cannot skin,
    /// identified by its raw PMX deform tag.
    Unsupported {
        tag: u8,
    },
}

// ─── Materials ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    pub english_name: String,
    /// Number of face-loop vertices covered, a contiguous run of `indices`.
    pub vertex_count: usize,
    pub texture_index: i32,
    pub toon_texture_index: i32,
    pub toon_sharing_flag: u8,
    pub sphere_texture_index: i32,
    pub sphere_mode: u8,
    pub flags: u8,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            english_name: String::new(),
            vertex_count: 0,
            texture_index: -1,
            toon_texture_index: -1,
            toon_sharing_flag: 0,
            sphere_texture_index: -1,
            sphere_mode: 0,
            flags: 0,
        }
    }
}

// ─── Physics ──────────────────────────────────────────────────────────────────

/// How the simulation drives a rigid body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigidBodyMode {
    /// Follows its bone, not simulated.
    #[default]
    Kinematic,
    Dynamic,
    /// Simulated, with position reset to the bone every step.
    DynamicWithBoneReset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBodyParam {
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    pub friction: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBody {
    pub name: String,
    pub english_name: String,
    /// `-1` binds the body to the first bone.
    pub bone_index: i32,
    pub collision_group: u8,
    pub no_collision_group: u16,
    /// Raw PMX shape tag: 0 sphere, 1 box, 2 cylinder.
    pub shape_type: u8,
    pub shape_size: Vector3<f32>,
    pub shape_position: Vector3<f32>,
    pub shape_rotation: Vector3<f32>,
    pub param: RigidBodyParam,
    pub mode: RigidBodyMode,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            name: String::new(),
            english_name: String::new(),
            bone_index: -1,
            collision_group: 0,
            no_collision_group: 0,
            shape_type: 0,
            shape_size: Vector3::zeros(),
            shape_position: Vector3::zeros(),
            shape_rotation: Vector3::zeros(),
            param: RigidBodyParam::default(),
            mode: RigidBodyMode::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Joint {
    pub name: String,
    pub english_name: String,
    pub rigidbody_index_a: i32,
    pub rigidbody_index_b: i32,
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub translation_limit_min: Vector3<f32>,
    pub translation_limit_max: Vector3<f32>,
    pub rotation_limit_min: Vector3<f32>,
    pub rotation_limit_max: Vector3<f32>,
    pub spring_constant_translation: Vector3<f32>,
    pub spring_constant_rotation: Vector3<f32>,
}

// ─── Display slots ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySlot {
    pub name: String,
    pub english_name: String,
    pub references: Vec<DisplayReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayReference {
    /// 0 references a bone, 1 a morph.
    pub kind: u8,
    pub index: i32,
}

impl DisplayReference {
    pub const BONE: u8 = 0;
    pub const MORPH: u8 = 1;

    pub fn bone(index: i32) -> Self {
        Self {
            kind: Self::BONE,
            index,
        }
    }
}
