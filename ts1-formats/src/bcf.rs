//! Binary `.bcf` container codec.
//!
//! Flat tree serialization: every sequence is a little-endian u32 count
//! followed by its elements, every record its fields in declaration order,
//! strings length-prefixed. No padding, alignment or checksums; a decode
//! must consume the payload exactly.

use crate::Error;
use crate::io::{BinaryInput, BinaryOutput};
use crate::model::{
    Bone, Character, Motion, Property, PropertyList, Skeleton, Skill, Skin, Suit, TimeProperty,
    TimePropertyList,
};
use std::path::Path;

impl Character {
    pub fn from_bcf_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = BinaryInput::new(bytes);
        let character = read_character(&mut input)?;
        if input.remaining() != 0 {
            return Err(Error::TrailingData { format: "BCF" });
        }
        Ok(character)
    }

    pub fn to_bcf_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut output = BinaryOutput::new();
        write_character(&mut output, self)?;
        Ok(output.into_bytes())
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Character, Error> {
    Character::from_bcf_bytes(&std::fs::read(path)?)
}

pub fn write_file(path: impl AsRef<Path>, character: &Character) -> Result<(), Error> {
    std::fs::write(path, character.to_bcf_bytes()?)?;
    Ok(())
}

fn read_seq<T>(
    input: &mut BinaryInput<'_>,
    read: impl Fn(&mut BinaryInput<'_>) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let count = input.read_u32()? as usize;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(read(input)?);
    }
    Ok(items)
}

fn write_seq<T>(
    output: &mut BinaryOutput,
    items: &[T],
    write: impl Fn(&mut BinaryOutput, &T) -> Result<(), Error>,
) -> Result<(), Error> {
    output.write_u32(items.len() as u32);
    for item in items {
        write(output, item)?;
    }
    Ok(())
}

fn read_character(input: &mut BinaryInput<'_>) -> Result<Character, Error> {
    Ok(Character {
        skeletons: read_seq(input, read_skeleton)?,
        suits: read_seq(input, read_suit)?,
        skills: read_seq(input, read_skill)?,
    })
}

fn write_character(output: &mut BinaryOutput, character: &Character) -> Result<(), Error> {
    write_seq(output, &character.skeletons, write_skeleton)?;
    write_seq(output, &character.suits, write_suit)?;
    write_seq(output, &character.skills, write_skill)
}

fn read_property(input: &mut BinaryInput<'_>) -> Result<Property, Error> {
    Ok(Property {
        name: input.read_string()?,
        value: input.read_string()?,
    })
}

fn write_property(output: &mut BinaryOutput, property: &Property) -> Result<(), Error> {
    output.write_string(&property.name)?;
    output.write_string(&property.value)
}

fn read_property_list(input: &mut BinaryInput<'_>) -> Result<PropertyList, Error> {
    Ok(PropertyList {
        properties: read_seq(input, read_property)?,
    })
}

fn write_property_list(output: &mut BinaryOutput, list: &PropertyList) -> Result<(), Error> {
    write_seq(output, &list.properties, write_property)
}

fn read_time_property(input: &mut BinaryInput<'_>) -> Result<TimeProperty, Error> {
    Ok(TimeProperty {
        time: input.read_u32()?,
        events: read_seq(input, read_property)?,
    })
}

fn write_time_property(output: &mut BinaryOutput, time_property: &TimeProperty) -> Result<(), Error> {
    output.write_u32(time_property.time);
    write_seq(output, &time_property.events, write_property)
}

fn read_time_property_list(input: &mut BinaryInput<'_>) -> Result<TimePropertyList, Error> {
    Ok(TimePropertyList {
        time_properties: read_seq(input, read_time_property)?,
    })
}

fn write_time_property_list(
    output: &mut BinaryOutput,
    list: &TimePropertyList,
) -> Result<(), Error> {
    write_seq(output, &list.time_properties, write_time_property)
}

fn read_motion(input: &mut BinaryInput<'_>) -> Result<Motion, Error> {
    Ok(Motion {
        bone_name: input.read_string()?,
        frame_count: input.read_u32()?,
        duration: input.read_f32()?,
        positions_used_flag: input.read_u32()?,
        rotations_used_flag: input.read_u32()?,
        position_offset: input.read_i32()?,
        rotation_offset: input.read_i32()?,
        property_lists: read_seq(input, read_property_list)?,
        time_property_lists: read_seq(input, read_time_property_list)?,
    })
}

fn write_motion(output: &mut BinaryOutput, motion: &Motion) -> Result<(), Error> {
    output.write_string(&motion.bone_name)?;
    output.write_u32(motion.frame_count);
    output.write_f32(motion.duration);
    output.write_u32(motion.positions_used_flag);
    output.write_u32(motion.rotations_used_flag);
    output.write_i32(motion.position_offset);
    output.write_i32(motion.rotation_offset);
    write_seq(output, &motion.property_lists, write_property_list)?;
    write_seq(output, &motion.time_property_lists, write_time_property_list)
}

fn read_skill(input: &mut BinaryInput<'_>) -> Result<Skill, Error> {
    Ok(Skill {
        skill_name: input.read_string()?,
        animation_name: input.read_string()?,
        duration: input.read_f32()?,
        distance: input.read_f32()?,
        moving_flag: input.read_u32()?,
        position_count: input.read_u32()?,
        rotation_count: input.read_u32()?,
        motions: read_seq(input, read_motion)?,
    })
}

fn write_skill(output: &mut BinaryOutput, skill: &Skill) -> Result<(), Error> {
    output.write_string(&skill.skill_name)?;
    output.write_string(&skill.animation_name)?;
    output.write_f32(skill.duration);
    output.write_f32(skill.distance);
    output.write_u32(skill.moving_flag);
    output.write_u32(skill.position_count);
    output.write_u32(skill.rotation_count);
    write_seq(output, &skill.motions, write_motion)
}

fn read_skin(input: &mut BinaryInput<'_>) -> Result<Skin, Error> {
    Ok(Skin {
        bone_name: input.read_string()?,
        skin_name: input.read_string()?,
        censor_flags: input.read_u32()?,
        unknown: input.read_u32()?,
    })
}

fn write_skin(output: &mut BinaryOutput, skin: &Skin) -> Result<(), Error> {
    output.write_string(&skin.bone_name)?;
    output.write_string(&skin.skin_name)?;
    output.write_u32(skin.censor_flags);
    output.write_u32(skin.unknown);
    Ok(())
}

fn read_suit(input: &mut BinaryInput<'_>) -> Result<Suit, Error> {
    Ok(Suit {
        name: input.read_string()?,
        suit_type: input.read_u32()?,
        unknown: input.read_u32()?,
        skins: read_seq(input, read_skin)?,
    })
}

fn write_suit(output: &mut BinaryOutput, suit: &Suit) -> Result<(), Error> {
    output.write_string(&suit.name)?;
    output.write_u32(suit.suit_type);
    output.write_u32(suit.unknown);
    write_seq(output, &suit.skins, write_skin)
}

fn read_bone(input: &mut BinaryInput<'_>) -> Result<Bone, Error> {
    Ok(Bone {
        name: input.read_string()?,
        parent: input.read_string()?,
        property_lists: read_seq(input, read_property_list)?,
        position_x: input.read_f32()?,
        position_y: input.read_f32()?,
        position_z: input.read_f32()?,
        rotation_x: input.read_f32()?,
        rotation_y: input.read_f32()?,
        rotation_z: input.read_f32()?,
        rotation_w: input.read_f32()?,
        translate: input.read_u32()?,
        rotate: input.read_u32()?,
        blend_suits: input.read_u32()?,
        wiggle_value: input.read_f32()?,
        wiggle_power: input.read_f32()?,
    })
}

fn write_bone(output: &mut BinaryOutput, bone: &Bone) -> Result<(), Error> {
    output.write_string(&bone.name)?;
    output.write_string(&bone.parent)?;
    write_seq(output, &bone.property_lists, write_property_list)?;
    output.write_f32(bone.position_x);
    output.write_f32(bone.position_y);
    output.write_f32(bone.position_z);
    output.write_f32(bone.rotation_x);
    output.write_f32(bone.rotation_y);
    output.write_f32(bone.rotation_z);
    output.write_f32(bone.rotation_w);
    output.write_u32(bone.translate);
    output.write_u32(bone.rotate);
    output.write_u32(bone.blend_suits);
    output.write_f32(bone.wiggle_value);
    output.write_f32(bone.wiggle_power);
    Ok(())
}

fn read_skeleton(input: &mut BinaryInput<'_>) -> Result<Skeleton, Error> {
    Ok(Skeleton {
        name: input.read_string()?,
        bones: read_seq(input, read_bone)?,
    })
}

fn write_skeleton(output: &mut BinaryOutput, skeleton: &Skeleton) -> Result<(), Error> {
    output.write_string(&skeleton.name)?;
    write_seq(output, &skeleton.bones, write_bone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_container_is_three_zero_counts() {
        let character = Character::default();
        let bytes = character.to_bcf_bytes().unwrap();
        assert_eq!(bytes, [0u8; 12]);
        assert_eq!(Character::from_bcf_bytes(&bytes).unwrap(), character);
    }

    #[test]
    fn trailing_byte_is_rejected() {
        let mut bytes = Character::default().to_bcf_bytes().unwrap();
        bytes.push(0x00);
        assert!(matches!(
            Character::from_bcf_bytes(&bytes),
            Err(Error::TrailingData { format: "BCF" })
        ));
    }

    #[test]
    fn truncated_container_is_rejected() {
        let character = Character {
            suits: vec![Suit {
                name: "a000".into(),
                suit_type: 0,
                unknown: 0,
                skins: Vec::new(),
            }],
            ..Character::default()
        };
        let bytes = character.to_bcf_bytes().unwrap();
        for len in 0..bytes.len() {
            assert!(
                matches!(
                    Character::from_bcf_bytes(&bytes[..len]),
                    Err(Error::Truncated { .. })
                ),
                "prefix of {len} bytes decoded"
            );
        }
    }
}
