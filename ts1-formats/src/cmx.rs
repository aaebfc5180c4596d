//! Text `.cmx` container codec, the human-readable sibling of [`bcf`].
//!
//! One field per line, sequences prefixed by a count line. Bone positions
//! and rotations are the only multi-value lines, written pipe-delimited as
//! `| x y z |` and `| x y z w |`. Files open with a `//` comment and a
//! `version 300` line; the files themselves are Windows-1252 on disk.

use crate::Error;
use crate::io::{TextInput, TextOutput, decode_windows_1252, encode_windows_1252, parse_field};
use crate::model::{
    Bone, Character, Motion, Property, PropertyList, Skeleton, Skill, Skin, Suit, TimeProperty,
    TimePropertyList,
};
use std::path::Path;

const EXPORT_COMMENT: &str = "// Exported with TS1 Blender IO";
const VERSION_LINE: &str = "version 300";

impl Character {
    pub fn from_cmx_text(text: &str) -> Result<Self, Error> {
        let mut input = TextInput::new(text);

        let comment = input.next_line()?;
        if !comment.starts_with("//") {
            return Err(Error::Format {
                line: input.line_number(),
                message: format!("expected a // comment header, found {comment:?}"),
            });
        }
        let version = input.next_line()?;
        if version != VERSION_LINE {
            return Err(Error::Format {
                line: input.line_number(),
                message: format!("expected {VERSION_LINE:?}, found {version:?}"),
            });
        }

        let character = read_character(&mut input)?;
        if input.has_more() {
            return Err(Error::TrailingData { format: "CMX" });
        }
        Ok(character)
    }

    pub fn to_cmx_text(&self) -> String {
        let mut output = TextOutput::new();
        output.line(EXPORT_COMMENT);
        output.line(VERSION_LINE);
        write_skeletons(&mut output, &self.skeletons);
        write_suits(&mut output, &self.suits);
        write_skills(&mut output, &self.skills);
        output.into_text()
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Character, Error> {
    Character::from_cmx_text(&decode_windows_1252(&std::fs::read(path)?))
}

pub fn write_file(path: impl AsRef<Path>, character: &Character) -> Result<(), Error> {
    std::fs::write(path, encode_windows_1252(&character.to_cmx_text())?)?;
    Ok(())
}

fn read_seq<'a, T>(
    input: &mut TextInput<'a>,
    read: impl Fn(&mut TextInput<'a>) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let count = input.parse_u32()? as usize;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(read(input)?);
    }
    Ok(items)
}

fn read_character(input: &mut TextInput<'_>) -> Result<Character, Error> {
    Ok(Character {
        skeletons: read_seq(input, read_skeleton)?,
        suits: read_seq(input, read_suit)?,
        skills: read_seq(input, read_skill)?,
    })
}

fn read_property(input: &mut TextInput<'_>) -> Result<Property, Error> {
    Ok(Property {
        name: input.next_line()?.to_string(),
        value: input.next_line()?.to_string(),
    })
}

fn write_properties(output: &mut TextOutput, properties: &[Property]) {
    output.value(properties.len());
    for property in properties {
        output.line(&property.name);
        output.line(&property.value);
    }
}

fn read_property_list(input: &mut TextInput<'_>) -> Result<PropertyList, Error> {
    Ok(PropertyList {
        properties: read_seq(input, read_property)?,
    })
}

fn write_property_lists(output: &mut TextOutput, lists: &[PropertyList]) {
    output.value(lists.len());
    for list in lists {
        write_properties(output, &list.properties);
    }
}

fn read_time_property(input: &mut TextInput<'_>) -> Result<TimeProperty, Error> {
    Ok(TimeProperty {
        time: input.parse_u32()?,
        events: read_seq(input, read_property)?,
    })
}

fn read_time_property_list(input: &mut TextInput<'_>) -> Result<TimePropertyList, Error> {
    Ok(TimePropertyList {
        time_properties: read_seq(input, read_time_property)?,
    })
}

fn write_time_property_lists(output: &mut TextOutput, lists: &[TimePropertyList]) {
    output.value(lists.len());
    for list in lists {
        output.value(list.time_properties.len());
        for time_property in &list.time_properties {
            output.value(time_property.time);
            write_properties(output, &time_property.events);
        }
    }
}

fn read_motion(input: &mut TextInput<'_>) -> Result<Motion, Error> {
    Ok(Motion {
        bone_name: input.next_line()?.to_string(),
        frame_count: input.parse_u32()?,
        duration: input.parse_f32()?,
        positions_used_flag: input.parse_u32()?,
        rotations_used_flag: input.parse_u32()?,
        position_offset: input.parse_i32()?,
        rotation_offset: input.parse_i32()?,
        property_lists: read_seq(input, read_property_list)?,
        time_property_lists: read_seq(input, read_time_property_list)?,
    })
}

fn write_skills(output: &mut TextOutput, skills: &[Skill]) {
    output.value(skills.len());
    for skill in skills {
        output.line(&skill.skill_name);
        output.line(&skill.animation_name);
        output.value(skill.duration);
        output.value(skill.distance);
        output.value(skill.moving_flag);
        output.value(skill.position_count);
        output.value(skill.rotation_count);
        output.value(skill.motions.len());
        for motion in &skill.motions {
            output.line(&motion.bone_name);
            output.value(motion.frame_count);
            output.value(motion.duration);
            output.value(motion.positions_used_flag);
            output.value(motion.rotations_used_flag);
            output.value(motion.position_offset);
            output.value(motion.rotation_offset);
            write_property_lists(output, &motion.property_lists);
            write_time_property_lists(output, &motion.time_property_lists);
        }
    }
}

fn read_skill(input: &mut TextInput<'_>) -> Result<Skill, Error> {
    Ok(Skill {
        skill_name: input.next_line()?.to_string(),
        animation_name: input.next_line()?.to_string(),
        duration: input.parse_f32()?,
        distance: input.parse_f32()?,
        moving_flag: input.parse_u32()?,
        position_count: input.parse_u32()?,
        rotation_count: input.parse_u32()?,
        motions: read_seq(input, read_motion)?,
    })
}

fn read_skin(input: &mut TextInput<'_>) -> Result<Skin, Error> {
    Ok(Skin {
        bone_name: input.next_line()?.to_string(),
        skin_name: input.next_line()?.to_string(),
        censor_flags: input.parse_u32()?,
        unknown: input.parse_u32()?,
    })
}

fn read_suit(input: &mut TextInput<'_>) -> Result<Suit, Error> {
    Ok(Suit {
        name: input.next_line()?.to_string(),
        suit_type: input.parse_u32()?,
        unknown: input.parse_u32()?,
        skins: read_seq(input, read_skin)?,
    })
}

fn write_suits(output: &mut TextOutput, suits: &[Suit]) {
    output.value(suits.len());
    for suit in suits {
        output.line(&suit.name);
        output.value(suit.suit_type);
        output.value(suit.unknown);
        output.value(suit.skins.len());
        for skin in &suit.skins {
            output.line(&skin.bone_name);
            output.line(&skin.skin_name);
            output.value(skin.censor_flags);
            output.value(skin.unknown);
        }
    }
}

/// Reads a `| a b c |` line. Components beyond the requested count are
/// ignored, matching the game's own tooling.
fn read_piped_floats<const N: usize>(input: &mut TextInput<'_>) -> Result<[f32; N], Error> {
    let line = input.next_line()?;
    let Some(fields) = line.split('|').nth(1) else {
        return Err(Error::Format {
            line: input.line_number(),
            message: format!("expected a |-delimited vector, found {line:?}"),
        });
    };

    let mut parts = fields.split_whitespace();
    let mut values = [0.0f32; N];
    for value in &mut values {
        let part = parts.next().ok_or_else(|| Error::Format {
            line: input.line_number(),
            message: format!("expected {N} vector components, found {line:?}"),
        })?;
        *value = parse_field(part, input.line_number())?;
    }
    Ok(values)
}

fn read_bone(input: &mut TextInput<'_>) -> Result<Bone, Error> {
    let name = input.next_line()?.to_string();
    let parent = input.next_line()?.to_string();
    let property_lists = read_seq(input, read_property_list)?;
    let [position_x, position_y, position_z] = read_piped_floats(input)?;
    let [rotation_x, rotation_y, rotation_z, rotation_w] = read_piped_floats(input)?;
    Ok(Bone {
        name,
        parent,
        property_lists,
        position_x,
        position_y,
        position_z,
        rotation_x,
        rotation_y,
        rotation_z,
        rotation_w,
        translate: input.parse_u32()?,
        rotate: input.parse_u32()?,
        blend_suits: input.parse_u32()?,
        wiggle_value: input.parse_f32()?,
        wiggle_power: input.parse_f32()?,
    })
}

fn read_skeleton(input: &mut TextInput<'_>) -> Result<Skeleton, Error> {
    Ok(Skeleton {
        name: input.next_line()?.to_string(),
        bones: read_seq(input, read_bone)?,
    })
}

fn write_skeletons(output: &mut TextOutput, skeletons: &[Skeleton]) {
    output.value(skeletons.len());
    for skeleton in skeletons {
        output.line(&skeleton.name);
        output.value(skeleton.bones.len());
        for bone in &skeleton.bones {
            output.line(&bone.name);
            output.line(&bone.parent);
            write_property_lists(output, &bone.property_lists);
            output.line(&format!(
                "| {} {} {} |",
                bone.position_x, bone.position_y, bone.position_z
            ));
            output.line(&format!(
                "| {} {} {} {} |",
                bone.rotation_x, bone.rotation_y, bone.rotation_z, bone.rotation_w
            ));
            output.value(bone.translate);
            output.value(bone.rotate);
            output.value(bone.blend_suits);
            output.value(bone.wiggle_value);
            output.value(bone.wiggle_power);
        }
    }
}
