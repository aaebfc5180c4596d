//! Record trees shared by the paired container and mesh codecs.
//!
//! Every record is built fully during a single decode pass and is owned
//! exclusively by its parent; encoding is a read-only traversal.

/// Parent name carried by bones at the root of a skeleton.
pub const NO_PARENT: &str = "NULL";

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Property {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyList {
    pub properties: Vec<Property>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeProperty {
    pub time: u32,
    pub events: Vec<Property>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimePropertyList {
    pub time_properties: Vec<TimeProperty>,
}

/// One bone's channel data within a skill.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Motion {
    pub bone_name: String,
    pub frame_count: u32,
    pub duration: f32,
    pub positions_used_flag: u32,
    pub rotations_used_flag: u32,
    /// Element offset into the sibling skill's position channels, or -1 when
    /// `positions_used_flag` is unset.
    pub position_offset: i32,
    /// Element offset into the sibling skill's rotation channels, or -1 when
    /// `rotations_used_flag` is unset.
    pub rotation_offset: i32,
    pub property_lists: Vec<PropertyList>,
    pub time_property_lists: Vec<TimePropertyList>,
}

/// One animation clip.
///
/// `position_count` and `rotation_count` total the frame counts of the
/// motions whose respective used-flag is set, in motion order; the CFP
/// codec relies on that to size its channels.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skill {
    pub skill_name: String,
    pub animation_name: String,
    pub duration: f32,
    pub distance: f32,
    pub moving_flag: u32,
    pub position_count: u32,
    pub rotation_count: u32,
    pub motions: Vec<Motion>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skin {
    pub bone_name: String,
    pub skin_name: String,
    pub censor_flags: u32,
    pub unknown: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Suit {
    pub name: String,
    pub suit_type: u32,
    pub unknown: u32,
    pub skins: Vec<Skin>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bone {
    pub name: String,
    /// Name of an earlier bone in the same skeleton, or [`NO_PARENT`].
    pub parent: String,
    pub property_lists: Vec<PropertyList>,
    pub position_x: f32,
    pub position_y: f32,
    pub position_z: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub rotation_z: f32,
    pub rotation_w: f32,
    pub translate: u32,
    pub rotate: u32,
    pub blend_suits: u32,
    pub wiggle_value: f32,
    pub wiggle_power: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skeleton {
    pub name: String,
    pub bones: Vec<Bone>,
}

/// Payload of a `.bcf` or `.cmx` container: the skeletons, suits and skills
/// of one in-game subject.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Character {
    pub skeletons: Vec<Skeleton>,
    pub suits: Vec<Suit>,
    pub skills: Vec<Skill>,
}

/// Maps a contiguous vertex range to a bone, plus an optional secondary
/// range for blended vertices.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneBinding {
    pub bone_index: u32,
    pub vertex_index: u32,
    pub vertex_count: u32,
    /// -1 when the bone has no blended vertices.
    pub blended_vertex_index: i32,
    pub blended_vertex_count: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blend {
    /// Fixed-point weight, scale 2^15.
    pub weight: u32,
    pub vertex_index: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Payload of a `.bmf` or `.skn` file: a skinned mesh bound to a skeleton's
/// bones by name.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    pub skin_name: String,
    pub default_texture_name: String,
    pub bones: Vec<String>,
    pub faces: Vec<[u32; 3]>,
    pub bone_bindings: Vec<BoneBinding>,
    pub uvs: Vec<[f32; 2]>,
    pub blends: Vec<Blend>,
    pub vertices: Vec<Vertex>,
}
