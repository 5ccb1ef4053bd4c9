use std::collections::{HashMap, HashSet};

use log::{debug, info};
use nalgebra::Vector3;
use serde::Serialize;

use crate::coord::convert_position;
use crate::error::{ImportError, MAX_IK_CHAIN_LINKS, WarningKind, Warnings};
use crate::model::{AngleLimit, Bone, BoneFlags, DisplayReference, DisplaySlot};
use crate::naming::sanitize_bone_name;

/// Length of the placeholder tail given to connected bones before their tail
/// bone is wired in.
const CONNECTED_TAIL_LENGTH: f32 = 1.0;
/// Tail length for twist (zero-length) and invisible bones.
const SHORT_TAIL_LENGTH: f32 = 0.01;
/// Z offset applied to a bone that is still zero-length after wiring.
const DEGENERATE_TAIL_NUDGE: f32 = 0.00001;
/// The target IK solver converges slower than the source one.
const IK_ITERATION_MULTIPLIER: u32 = 10;
/// Number of bone-group color themes offered by the host.
const BONE_GROUP_THEME_COUNT: usize = 20;

// ─── Output types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintSpace {
    Local,
}

/// Declarative pose-bone constraint. Bone references are node indices into
/// [`Armature::bones`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoneConstraint {
    /// IK solver owned by the chain's end bone, reaching for `target`.
    Ik {
        target: usize,
        chain_count: usize,
        iterations: u32,
        use_tail: bool,
    },
    CopyRotation {
        subtarget: usize,
        influence: f32,
        target_space: ConstraintSpace,
        owner_space: ConstraintSpace,
    },
    /// Emitted for fixed-axis bones. No bounds are set; the source format only
    /// says the bone is constrained to its axis.
    LimitRotation { owner_space: ConstraintSpace },
    /// Pins a bone that an ancestor uses as its tail.
    LimitLocation { owner_space: ConstraintSpace },
}

/// IK rotation freedom of one axis, target space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AxisLimit {
    #[default]
    Free,
    Locked,
    Limited {
        min: f32,
        max: f32,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IkLimits {
    pub x: AxisLimit,
    pub y: AxisLimit,
    pub z: AxisLimit,
}

impl IkLimits {
    /// Translates a source chain-link angle limit. An axis with both bounds
    /// at zero is locked. X bounds are negated and swapped for the handedness
    /// flip; Y and Z pass through.
    pub fn from_source(limit: &AngleLimit) -> Self {
        let axis = |min: f32, max: f32| {
            if min == 0.0 && max == 0.0 {
                AxisLimit::Locked
            } else {
                AxisLimit::Limited { min, max }
            }
        };
        let x = match axis(limit.min.x, limit.max.x) {
            AxisLimit::Limited { min, max } => AxisLimit::Limited {
                min: -max,
                max: -min,
            },
            other => other,
        };

        Self {
            x,
            y: axis(limit.min.y, limit.max.y),
            z: axis(limit.min.z, limit.max.z),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoneNode {
    pub index: usize,
    /// Name after host sanitizing; may collide with other bones.
    pub name: String,
    pub source_name: String,
    pub english_name: String,
    pub head: Vector3<f32>,
    pub tail: Vector3<f32>,
    pub parent: Option<usize>,
    /// Head is rigidly attached to the parent's tail.
    pub connected: bool,
    pub hidden: bool,
    /// The tail is a synthetic offset, not another bone.
    pub use_tail_offset: bool,
    pub lock_location: [bool; 3],
    /// IK unit angle, recorded on the bone that declares the IK chain.
    pub ik_unit_radian: Option<f32>,
    pub ik_limits: Option<IkLimits>,
    pub constraints: Vec<BoneConstraint>,
    /// Index into [`Armature::groups`].
    pub group: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoneGroup {
    pub name: String,
    pub color_set: String,
}

/// Model name and comment fields kept on the armature for round trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArmatureMetadata {
    pub name: String,
    pub english_name: String,
    pub comment: String,
    pub english_comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Armature {
    pub name: String,
    pub bones: Vec<BoneNode>,
    pub groups: Vec<BoneGroup>,
    pub metadata: ArmatureMetadata,
    #[serde(skip)]
    name_table: HashMap<String, usize>,
}

impl Armature {
    pub fn bone(&self, index: usize) -> Option<&BoneNode> {
        self.bones.get(index)
    }

    /// First node created under `name`.
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.name_table.get(name).copied()
    }

    /// Members of a bone group, in bone order.
    pub fn group_members(&self, group: usize) -> impl Iterator<Item = &BoneNode> {
        self.bones
            .iter()
            .filter(move |node| node.group == Some(group))
    }
}

// ─── Reference resolution ─────────────────────────────────────────────────────

fn out_of_range(bones: &[Bone], owner: usize, field: &'static str, index: i32) -> ImportError {
    ImportError::BoneIndexOutOfRange {
        owner: format!("bone {} ({})", owner, bones[owner].name),
        field,
        index,
        bone_count: bones.len(),
    }
}

/// Resolves an optional bone reference; `-1` means none.
fn optional_bone_ref(
    bones: &[Bone],
    owner: usize,
    field: &'static str,
    index: i32,
) -> Result<Option<usize>, ImportError> {
    if index == -1 {
        return Ok(None);
    }
    required_bone_ref(bones, owner, field, index).map(Some)
}

fn required_bone_ref(
    bones: &[Bone],
    owner: usize,
    field: &'static str,
    index: i32,
) -> Result<usize, ImportError> {
    usize::try_from(index)
        .ok()
        .filter(|resolved| *resolved < bones.len())
        .ok_or_else(|| out_of_range(bones, owner, field, index))
}

/// True when `ancestor` declares bone `index` as its tail.
fn pins_tail_of(ancestor: &Bone, index: usize) -> bool {
    ancestor.has_flag(BoneFlags::TAILPOS_IS_BONE)
        && usize::try_from(ancestor.tail_index).is_ok_and(|tail| tail == index)
}

// ─── Builder ──────────────────────────────────────────────────────────────────

/// Builds the bone hierarchy, pose constraints and display groups.
///
/// Fails without producing any armature on dangling bone references or an
/// IK chain of [`MAX_IK_CHAIN_LINKS`] links or more.
pub fn build_armature(
    name: &str,
    bones: &[Bone],
    display_slots: &[DisplaySlot],
    scale: f32,
    warnings: &mut Warnings,
) -> Result<Armature, ImportError> {
    let mut nodes: Vec<BoneNode> = bones
        .iter()
        .enumerate()
        .map(|(index, bone)| create_node(index, bone, scale))
        .collect();

    let mut name_table = HashMap::new();
    for node in &nodes {
        name_table.entry(node.name.clone()).or_insert(node.index);
    }

    wire_hierarchy(bones, &mut nodes, warnings)?;
    let ik_count = attach_constraints(bones, &mut nodes)?;
    let groups = assign_display_groups(display_slots, &mut nodes, warnings);

    info!(
        "built armature '{}': {} bones, {} IK constraints, {} bone groups",
        name,
        nodes.len(),
        ik_count,
        groups.len()
    );

    Ok(Armature {
        name: name.to_string(),
        bones: nodes,
        groups,
        metadata: ArmatureMetadata::default(),
        name_table,
    })
}

fn create_node(index: usize, bone: &Bone, scale: f32) -> BoneNode {
    let head = convert_position(&bone.position, 1.0);
    let short_tail = head + Vector3::new(0.0, SHORT_TAIL_LENGTH, 0.0);

    let mut tail = if bone.is_connected() {
        head + Vector3::new(0.0, CONNECTED_TAIL_LENGTH, 0.0)
    } else {
        let offset_tail = head + convert_position(&bone.tail_position, 1.0);
        if offset_tail == head {
            // twist bone
            short_tail
        } else {
            offset_tail
        }
    };

    let visible = bone.has_flag(BoneFlags::IS_VISIBLE);
    if !visible {
        tail = short_tail;
    }

    BoneNode {
        index,
        name: sanitize_bone_name(&bone.name),
        source_name: bone.name.clone(),
        english_name: bone.english_name.clone(),
        head: head * scale,
        tail: tail * scale,
        parent: None,
        connected: false,
        hidden: !visible,
        use_tail_offset: !bone.has_flag(BoneFlags::TAILPOS_IS_BONE),
        lock_location: [false; 3],
        ik_unit_radian: None,
        ik_limits: None,
        constraints: Vec::new(),
        group: None,
    }
}

fn wire_hierarchy(
    bones: &[Bone],
    nodes: &mut [BoneNode],
    warnings: &mut Warnings,
) -> Result<(), ImportError> {
    let mut used_names: HashSet<&str> = HashSet::new();

    for (index, bone) in bones.iter().enumerate() {
        if used_names.contains(bone.name.as_str()) {
            warnings.push(
                WarningKind::DuplicateBoneName,
                format!("duplicated bone name: [{}][{}]", bone.name, nodes[index].name),
            );
        } else if nodes[index].name != bone.name {
            warnings.push(
                WarningKind::InvalidBoneName,
                format!("invalid bone name: [{}][{}]", bone.name, nodes[index].name),
            );
        }
        used_names.insert(bone.name.as_str());

        nodes[index].parent = optional_bone_ref(bones, index, "parent_index", bone.parent_index)?;

        let tail_bone = if bone.is_connected() {
            optional_bone_ref(bones, index, "tail_index", bone.tail_index)?
        } else {
            None
        };
        if let Some(tail_index) = tail_bone {
            nodes[index].tail = nodes[tail_index].head;
            if usize::try_from(bones[tail_index].parent_index).is_ok_and(|parent| parent == index)
            {
                nodes[tail_index].connected = true;
            }
        }

        if nodes[index].head == nodes[index].tail {
            debug!("bone '{}' has no length, nudging tail", nodes[index].name);
            nodes[index].tail.z -= DEGENERATE_TAIL_NUDGE;
        }
    }

    Ok(())
}

/// Adds IK, copy-rotation and limit constraints. Returns the number of IK
/// constraints created.
fn attach_constraints(bones: &[Bone], nodes: &mut [BoneNode]) -> Result<usize, ImportError> {
    let local = ConstraintSpace::Local;
    let mut ik_count = 0;

    for (index, bone) in bones.iter().enumerate() {
        if let Some(ik) = bone.ik.as_ref().filter(|_| bone.has_flag(BoneFlags::IS_IK)) {
            if ik.links.len() >= MAX_IK_CHAIN_LINKS {
                return Err(ImportError::IkChainTooLong {
                    bone: index,
                    name: bone.name.clone(),
                    links: ik.links.len(),
                });
            }

            let owner = required_bone_ref(bones, index, "ik.target_index", ik.target_index)?;
            nodes[owner].constraints.push(BoneConstraint::Ik {
                target: index,
                chain_count: ik.links.len(),
                iterations: ik.loop_count.saturating_mul(IK_ITERATION_MULTIPLIER),
                use_tail: false,
            });
            nodes[index].ik_unit_radian = Some(ik.limit_radian);
            ik_count += 1;
            debug!(
                "IK on '{}' toward '{}' ({} links)",
                nodes[owner].name,
                nodes[index].name,
                ik.links.len()
            );

            for link in &ik.links {
                let Some(limit) = &link.limit else {
                    continue;
                };
                let link_bone = required_bone_ref(bones, index, "ik.links.bone_index", link.bone_index)?;
                nodes[link_bone].ik_limits = Some(IkLimits::from_source(limit));
            }
        }

        if let Some(external) = bone
            .external_rotation
            .as_ref()
            .filter(|_| bone.has_flag(BoneFlags::IS_EXTERNAL_ROTATION))
        {
            let effect = required_bone_ref(
                bones,
                index,
                "external_rotation.effect_index",
                external.effect_index,
            )?;
            nodes[index].constraints.push(BoneConstraint::CopyRotation {
                subtarget: effect,
                influence: external.effect_factor,
                target_space: local,
                owner_space: local,
            });
        }

        if bone.has_flag(BoneFlags::HAS_FIXED_AXIS) {
            nodes[index]
                .constraints
                .push(BoneConstraint::LimitRotation { owner_space: local });
        }

        if let Some(parent) = nodes[index].parent {
            let pinned = pins_tail_of(&bones[parent], index)
                || nodes[parent]
                    .parent
                    .is_some_and(|grandparent| pins_tail_of(&bones[grandparent], index));
            if pinned {
                nodes[index]
                    .constraints
                    .push(BoneConstraint::LimitLocation { owner_space: local });
            }
        }

        if !bone.has_flag(BoneFlags::CAN_TRANSLATE) {
            nodes[index].lock_location = [true; 3];
        }
    }

    Ok(ik_count)
}

fn assign_display_groups(
    display_slots: &[DisplaySlot],
    nodes: &mut [BoneNode],
    warnings: &mut Warnings,
) -> Vec<BoneGroup> {
    let mut groups = Vec::with_capacity(display_slots.len());

    for (slot_index, slot) in display_slots.iter().enumerate() {
        let group = groups.len();
        groups.push(BoneGroup {
            name: slot.name.clone(),
            color_set: format!("THEME{:02}", slot_index % BONE_GROUP_THEME_COUNT + 1),
        });

        for reference in slot
            .references
            .iter()
            .filter(|reference| reference.kind == DisplayReference::BONE)
        {
            let node = usize::try_from(reference.index)
                .ok()
                .and_then(|index| nodes.get_mut(index));
            match node {
                Some(node) => node.group = Some(group),
                None => warnings.push(
                    WarningKind::MissingDisplayReference,
                    format!(
                        "display slot '{}' refers to missing bone {}",
                        slot.name, reference.index
                    ),
                ),
            }
        }
    }

    groups
}
