//! Keyframe-channel compression codec for `.cfp` float streams.
//!
//! A stream is a flat sequence of variable-length tokens with no
//! self-describing length; the caller supplies how many values to decode
//! (from the owning skill's `position_count`/`rotation_count`). Three token
//! kinds exist: a raw little-endian float (`0xFF`), a repeat of the previous
//! value (`0xFE` plus a u16 run length), and any other byte, which indexes a
//! table of quantized deltas added to the previous value. Animation channels
//! are mostly static with occasional large swings, so the delta curve is
//! quartic-odd: fine steps near zero, coarse at the extremes.

use crate::Error;
use crate::io::{BinaryInput, BinaryOutput};
use std::path::Path;
use std::sync::LazyLock;

const TOKEN_FULL: u8 = 0xFF;
const TOKEN_REPEAT: u8 = 0xFE;

const DELTA_TABLE_LEN: usize = 253;
const ZERO_DELTA_INDEX: usize = 126;
// Indices whose deltas are small enough to fold into a repeat run.
const SMALL_DELTA_START: usize = 120;
const SMALL_DELTA_END: usize = 133;
const MAX_REPEAT_RUN: u16 = u16::MAX;
const DELTA_ACCEPT_THRESHOLD: f64 = 0.001;

fn decode_delta(index: usize) -> f64 {
    let centered = index as f64 - 126.0;
    3.9676e-10 * centered.powi(3) * centered.abs()
}

static DELTA_TABLE: LazyLock<[f64; DELTA_TABLE_LEN]> =
    LazyLock::new(|| std::array::from_fn(decode_delta));

/// Finds the table entry closest to `difference`. Ties keep the lowest
/// index; the encoding of existing game assets depends on that order.
fn nearest_delta(difference: f64) -> (usize, f64) {
    let mut best_index = 0;
    let mut best_delta = DELTA_TABLE[0];
    let mut best_error = (best_delta - difference).abs();
    for (index, &delta) in DELTA_TABLE.iter().enumerate().skip(1) {
        let error = (delta - difference).abs();
        if error < best_error {
            best_index = index;
            best_delta = delta;
            best_error = error;
        }
    }
    (best_index, best_delta)
}

/// Decodes `count` values from the token stream. The running value is
/// tracked as f64 so delta accumulation matches the game's tooling.
pub(crate) fn decode_values(input: &mut BinaryInput<'_>, count: usize) -> Result<Vec<f32>, Error> {
    let mut values = Vec::with_capacity(count);
    let mut previous = 0.0f64;

    while values.len() < count {
        match input.read_u8()? {
            TOKEN_FULL => {
                let value = input.read_f32()?;
                values.push(value);
                previous = f64::from(value);
            }
            TOKEN_REPEAT => {
                let run = input.read_u16()? as usize + 1;
                values.resize(values.len() + run, previous as f32);
            }
            token => {
                previous += decode_delta(token as usize);
                values.push(previous as f32);
            }
        }
    }

    // A final repeat run may overshoot the requested count; the excess
    // carries no information.
    values.truncate(count);
    Ok(values)
}

fn flush_repeat(output: &mut BinaryOutput, repeat_run: &mut u16) {
    if *repeat_run > 0 {
        output.write_u8(TOKEN_REPEAT);
        output.write_u16(*repeat_run - 1);
        *repeat_run = 0;
    }
}

/// Encodes a value sequence. With `compress` set, near-constant stretches
/// collapse into repeat runs and smooth changes into delta tokens, accepting
/// quantization error up to the threshold; without it, only exact
/// consecutive duplicates collapse and every other value is stored in full.
pub(crate) fn encode_values(values: &[f32], compress: bool) -> Vec<u8> {
    let mut output = BinaryOutput::new();

    let Some((&first, rest)) = values.split_first() else {
        return output.into_bytes();
    };

    output.write_u8(TOKEN_FULL);
    output.write_f32(first);
    let mut previous = f64::from(first);
    let mut repeat_run = 0u16;

    for &value in rest {
        let difference = f64::from(value) - previous;

        if compress {
            let (mut index, mut delta) = nearest_delta(difference);
            if (SMALL_DELTA_START..SMALL_DELTA_END).contains(&index) && repeat_run < MAX_REPEAT_RUN
            {
                // A sign change hidden inside a repeat run corrupts
                // quaternion continuity; force it onto a real token.
                if index != ZERO_DELTA_INDEX && !(f64::from(value) * previous >= 0.0) {
                    index = if value >= 0.0 {
                        SMALL_DELTA_END
                    } else {
                        SMALL_DELTA_START - 1
                    };
                    delta = DELTA_TABLE[index];
                } else {
                    repeat_run += 1;
                    continue;
                }
            }

            flush_repeat(&mut output, &mut repeat_run);

            if (difference - delta).abs() > DELTA_ACCEPT_THRESHOLD {
                output.write_u8(TOKEN_FULL);
                output.write_f32(value);
                previous = f64::from(value);
            } else {
                output.write_u8(index as u8);
                previous += delta;
            }
        } else {
            if f64::from(value) == previous && repeat_run < MAX_REPEAT_RUN {
                repeat_run += 1;
                continue;
            }

            flush_repeat(&mut output, &mut repeat_run);
            output.write_u8(TOKEN_FULL);
            output.write_f32(value);
            previous = f64::from(value);
        }
    }

    flush_repeat(&mut output, &mut repeat_run);
    output.into_bytes()
}

/// Channel data of a `.cfp` file: seven concatenated streams, positions
/// x/y/z then rotations x/y/z/w.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cfp {
    pub positions_x: Vec<f32>,
    pub positions_y: Vec<f32>,
    pub positions_z: Vec<f32>,
    pub rotations_x: Vec<f32>,
    pub rotations_y: Vec<f32>,
    pub rotations_z: Vec<f32>,
    pub rotations_w: Vec<f32>,
}

impl Cfp {
    /// Decodes a `.cfp` payload. The file stores no lengths of its own;
    /// `position_count` and `rotation_count` come from the skill record the
    /// file belongs to.
    pub fn parse(
        bytes: &[u8],
        position_count: usize,
        rotation_count: usize,
    ) -> Result<Self, Error> {
        let mut input = BinaryInput::new(bytes);
        let values = decode_values(&mut input, position_count * 3 + rotation_count * 4)?;
        if input.remaining() != 0 {
            return Err(Error::TrailingData { format: "CFP" });
        }

        let mut values = values.into_iter();
        let mut channel = |count: usize| values.by_ref().take(count).collect();
        Ok(Self {
            positions_x: channel(position_count),
            positions_y: channel(position_count),
            positions_z: channel(position_count),
            rotations_x: channel(rotation_count),
            rotations_y: channel(rotation_count),
            rotations_z: channel(rotation_count),
            rotations_w: channel(rotation_count),
        })
    }

    pub fn to_bytes(&self, compress: bool) -> Vec<u8> {
        let mut values = Vec::with_capacity(self.positions_x.len() * 3 + self.rotations_x.len() * 4);
        values.extend_from_slice(&self.positions_x);
        values.extend_from_slice(&self.positions_y);
        values.extend_from_slice(&self.positions_z);
        values.extend_from_slice(&self.rotations_x);
        values.extend_from_slice(&self.rotations_y);
        values.extend_from_slice(&self.rotations_z);
        values.extend_from_slice(&self.rotations_w);
        encode_values(&values, compress)
    }

    /// Position channel slices for one motion, given its `position_offset`
    /// and `frame_count`. `None` when the span falls outside the channels.
    pub fn position_frames(&self, offset: usize, frame_count: usize) -> Option<[&[f32]; 3]> {
        let end = offset.checked_add(frame_count)?;
        Some([
            self.positions_x.get(offset..end)?,
            self.positions_y.get(offset..end)?,
            self.positions_z.get(offset..end)?,
        ])
    }

    /// Rotation channel slices for one motion, given its `rotation_offset`
    /// and `frame_count`.
    pub fn rotation_frames(&self, offset: usize, frame_count: usize) -> Option<[&[f32]; 4]> {
        let end = offset.checked_add(frame_count)?;
        Some([
            self.rotations_x.get(offset..end)?,
            self.rotations_y.get(offset..end)?,
            self.rotations_z.get(offset..end)?,
            self.rotations_w.get(offset..end)?,
        ])
    }
}

pub fn read_file(
    path: impl AsRef<Path>,
    position_count: usize,
    rotation_count: usize,
) -> Result<Cfp, Error> {
    Cfp::parse(&std::fs::read(path)?, position_count, rotation_count)
}

pub fn write_file(path: impl AsRef<Path>, cfp: &Cfp, compress: bool) -> Result<(), Error> {
    std::fs::write(path, cfp.to_bytes(compress))?;
    Ok(())
}
