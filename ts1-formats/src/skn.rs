//! Text `.skn` skinned-mesh codec, the human-readable sibling of [`bmf`].
//!
//! One record per line with space-separated fields. UV and vertex floats are
//! written with seven fractional digits, which is enough for the game's
//! coordinate ranges to survive a parse back. Blends are stored on disk as
//! `vertex_index weight`, swapped relative to the in-memory field order.

use crate::Error;
use crate::io::{TextInput, TextOutput, decode_windows_1252, encode_windows_1252, parse_field};
use crate::model::{Blend, BoneBinding, Mesh, Vertex};
use std::path::Path;

impl Mesh {
    pub fn from_skn_text(text: &str) -> Result<Self, Error> {
        let mut input = TextInput::new(text);
        let mesh = read_mesh(&mut input)?;
        if input.has_more() {
            return Err(Error::TrailingData { format: "SKN" });
        }
        Ok(mesh)
    }

    pub fn to_skn_text(&self) -> String {
        let mut output = TextOutput::new();
        write_mesh(&mut output, self);
        output.into_text()
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Mesh, Error> {
    Mesh::from_skn_text(&decode_windows_1252(&std::fs::read(path)?))
}

pub fn write_file(path: impl AsRef<Path>, mesh: &Mesh) -> Result<(), Error> {
    std::fs::write(path, encode_windows_1252(&mesh.to_skn_text())?)?;
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

/// Splits the next line into exactly `N` whitespace-separated fields.
fn split_row<'a, const N: usize>(input: &mut TextInput<'a>) -> Result<[&'a str; N], Error> {
    let line = input.next_line()?;
    let mut parts = line.split_whitespace();
    let mut fields = [""; N];
    for field in &mut fields {
        *field = parts.next().ok_or_else(|| Error::Format {
            line: input.line_number(),
            message: format!("expected {N} fields, found {line:?}"),
        })?;
    }
    Ok(fields)
}

fn read_mesh(input: &mut TextInput<'_>) -> Result<Mesh, Error> {
    Ok(Mesh {
        skin_name: input.next_line()?.to_string(),
        default_texture_name: input.next_line()?.to_string(),
        bones: read_seq(input, |input| Ok(input.next_line()?.to_string()))?,
        faces: read_seq(input, read_face)?,
        bone_bindings: read_seq(input, read_bone_binding)?,
        uvs: read_seq(input, read_uv)?,
        blends: read_seq(input, read_blend)?,
        vertices: read_seq(input, read_vertex)?,
    })
}

fn write_mesh(output: &mut TextOutput, mesh: &Mesh) {
    output.line(&mesh.skin_name);
    output.line(&mesh.default_texture_name);

    output.value(mesh.bones.len());
    for bone in &mesh.bones {
        output.line(bone);
    }

    output.value(mesh.faces.len());
    for [a, b, c] in &mesh.faces {
        output.line(&format!("{a} {b} {c}"));
    }

    output.value(mesh.bone_bindings.len());
    for binding in &mesh.bone_bindings {
        output.line(&format!(
            "{} {} {} {} {}",
            binding.bone_index,
            binding.vertex_index,
            binding.vertex_count,
            binding.blended_vertex_index,
            binding.blended_vertex_count
        ));
    }

    output.value(mesh.uvs.len());
    for [u, v] in &mesh.uvs {
        output.line(&format!("{u:.7} {v:.7}"));
    }

    output.value(mesh.blends.len());
    for blend in &mesh.blends {
        output.line(&format!("{} {}", blend.vertex_index, blend.weight));
    }

    output.value(mesh.vertices.len());
    for vertex in &mesh.vertices {
        let [x, y, z] = vertex.position;
        let [nx, ny, nz] = vertex.normal;
        output.line(&format!(
            "{x:.7} {y:.7} {z:.7} {nx:.7} {ny:.7} {nz:.7}"
        ));
    }
}

fn read_face(input: &mut TextInput<'_>) -> Result<[u32; 3], Error> {
    let fields = split_row::<3>(input)?;
    let line = input.line_number();
    Ok([
        parse_field(fields[0], line)?,
        parse_field(fields[1], line)?,
        parse_field(fields[2], line)?,
    ])
}

fn read_bone_binding(input: &mut TextInput<'_>) -> Result<BoneBinding, Error> {
    let fields = split_row::<5>(input)?;
    let line = input.line_number();
    Ok(BoneBinding {
        bone_index: parse_field(fields[0], line)?,
        vertex_index: parse_field(fields[1], line)?,
        vertex_count: parse_field(fields[2], line)?,
        blended_vertex_index: parse_field(fields[3], line)?,
        blended_vertex_count: parse_field(fields[4], line)?,
    })
}

fn read_uv(input: &mut TextInput<'_>) -> Result<[f32; 2], Error> {
    let fields = split_row::<2>(input)?;
    let line = input.line_number();
    Ok([parse_field(fields[0], line)?, parse_field(fields[1], line)?])
}

fn read_blend(input: &mut TextInput<'_>) -> Result<Blend, Error> {
    let fields = split_row::<2>(input)?;
    let line = input.line_number();
    Ok(Blend {
        weight: parse_field(fields[1], line)?,
        vertex_index: parse_field(fields[0], line)?,
    })
}

fn read_vertex(input: &mut TextInput<'_>) -> Result<Vertex, Error> {
    let fields = split_row::<6>(input)?;
    let line = input.line_number();
    Ok(Vertex {
        position: [
            parse_field(fields[0], line)?,
            parse_field(fields[1], line)?,
            parse_field(fields[2], line)?,
        ],
        normal: [
            parse_field(fields[3], line)?,
            parse_field(fields[4], line)?,
            parse_field(fields[5], line)?,
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_mesh() -> Mesh {
        Mesh {
            skin_name: "xskin-b003-head".into(),
            default_texture_name: "small_head".into(),
            bones: vec!["HEAD".into()],
            faces: vec![[0, 1, 2]],
            bone_bindings: vec![BoneBinding {
                bone_index: 0,
                vertex_index: 0,
                vertex_count: 3,
                blended_vertex_index: -1,
                blended_vertex_count: 0,
            }],
            uvs: vec![[0.25, 0.5], [0.75, 0.5], [0.5, 1.0]],
            blends: vec![Blend {
                weight: 16384,
                vertex_index: 2,
            }],
            vertices: vec![
                Vertex {
                    position: [0.0, 0.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                },
                Vertex {
                    position: [1.0, 0.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                },
                Vertex {
                    position: [0.0, 1.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                },
            ],
        }
    }

    #[test]
    fn mesh_round_trips_through_text() {
        let mesh = small_mesh();
        assert_eq!(Mesh::from_skn_text(&mesh.to_skn_text()).unwrap(), mesh);
    }

    #[test]
    fn blend_columns_are_written_vertex_first() {
        let text = small_mesh().to_skn_text();
        assert!(text.contains("\n2 16384\n"), "unexpected output:\n{text}");
    }

    #[test]
    fn floats_carry_seven_fractional_digits() {
        let text = small_mesh().to_skn_text();
        assert!(text.contains("0.2500000 0.5000000"));
        assert!(text.contains("1.0000000 0.0000000 0.0000000"));
    }

    #[test]
    fn trailing_line_is_rejected() {
        let mut text = small_mesh().to_skn_text();
        text.push_str("leftover\n");
        assert!(matches!(
            Mesh::from_skn_text(&text),
            Err(Error::TrailingData { format: "SKN" })
        ));
    }

    #[test]
    fn short_row_is_reported_as_a_format_error() {
        let text = "name\ntexture\n0\n1\n0 1\n0\n0\n0\n0\n";
        assert!(matches!(
            Mesh::from_skn_text(text),
            Err(Error::Format { line: 5, .. })
        ));
    }

    #[test]
    fn missing_section_is_reported_as_truncation() {
        let text = "name\ntexture\n0\n0\n0\n0\n0\n";
        assert!(matches!(
            Mesh::from_skn_text(text),
            Err(Error::Truncated { .. })
        ));
    }
}
