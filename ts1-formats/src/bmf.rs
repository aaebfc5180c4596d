//! Binary `.bmf` skinned-mesh codec.

use crate::Error;
use crate::io::{BinaryInput, BinaryOutput};
use crate::model::{Blend, BoneBinding, Mesh, Vertex};
use std::path::Path;

impl Mesh {
    pub fn from_bmf_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = BinaryInput::new(bytes);
        let mesh = read_mesh(&mut input)?;
        if input.remaining() != 0 {
            return Err(Error::TrailingData { format: "BMF" });
        }
        Ok(mesh)
    }

    pub fn to_bmf_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut output = BinaryOutput::new();
        write_mesh(&mut output, self)?;
        Ok(output.into_bytes())
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Mesh, Error> {
    Mesh::from_bmf_bytes(&std::fs::read(path)?)
}

pub fn write_file(path: impl AsRef<Path>, mesh: &Mesh) -> Result<(), Error> {
    std::fs::write(path, mesh.to_bmf_bytes()?)?;
    Ok(())
}

fn read_seq<'a, T>(
    input: &mut BinaryInput<'a>,
    read: impl Fn(&mut BinaryInput<'a>) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let count = input.read_u32()? as usize;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(read(input)?);
    }
    Ok(items)
}

fn read_mesh(input: &mut BinaryInput<'_>) -> Result<Mesh, Error> {
    Ok(Mesh {
        skin_name: input.read_string()?,
        default_texture_name: input.read_string()?,
        bones: read_seq(input, BinaryInput::read_string)?,
        faces: read_seq(input, read_face)?,
        bone_bindings: read_seq(input, read_bone_binding)?,
        uvs: read_seq(input, read_uv)?,
        blends: read_seq(input, read_blend)?,
        vertices: read_seq(input, read_vertex)?,
    })
}

fn write_mesh(output: &mut BinaryOutput, mesh: &Mesh) -> Result<(), Error> {
    output.write_string(&mesh.skin_name)?;
    output.write_string(&mesh.default_texture_name)?;

    output.write_u32(mesh.bones.len() as u32);
    for bone in &mesh.bones {
        output.write_string(bone)?;
    }

    output.write_u32(mesh.faces.len() as u32);
    for face in &mesh.faces {
        for &index in face {
            output.write_u32(index);
        }
    }

    output.write_u32(mesh.bone_bindings.len() as u32);
    for binding in &mesh.bone_bindings {
        output.write_u32(binding.bone_index);
        output.write_u32(binding.vertex_index);
        output.write_u32(binding.vertex_count);
        output.write_i32(binding.blended_vertex_index);
        output.write_u32(binding.blended_vertex_count);
    }

    output.write_u32(mesh.uvs.len() as u32);
    for &[u, v] in &mesh.uvs {
        output.write_f32(u);
        output.write_f32(v);
    }

    output.write_u32(mesh.blends.len() as u32);
    for blend in &mesh.blends {
        output.write_u32(blend.weight);
        output.write_u32(blend.vertex_index);
    }

    output.write_u32(mesh.vertices.len() as u32);
    for vertex in &mesh.vertices {
        for &value in vertex.position.iter().chain(&vertex.normal) {
            output.write_f32(value);
        }
    }

    Ok(())
}

fn read_face(input: &mut BinaryInput<'_>) -> Result<[u32; 3], Error> {
    Ok([input.read_u32()?, input.read_u32()?, input.read_u32()?])
}

fn read_bone_binding(input: &mut BinaryInput<'_>) -> Result<BoneBinding, Error> {
    Ok(BoneBinding {
        bone_index: input.read_u32()?,
        vertex_index: input.read_u32()?,
        vertex_count: input.read_u32()?,
        blended_vertex_index: input.read_i32()?,
        blended_vertex_count: input.read_u32()?,
    })
}

fn read_uv(input: &mut BinaryInput<'_>) -> Result<[f32; 2], Error> {
    Ok([input.read_f32()?, input.read_f32()?])
}

fn read_blend(input: &mut BinaryInput<'_>) -> Result<Blend, Error> {
    Ok(Blend {
        weight: input.read_u32()?,
        vertex_index: input.read_u32()?,
    })
}

fn read_vertex(input: &mut BinaryInput<'_>) -> Result<Vertex, Error> {
    Ok(Vertex {
        position: [input.read_f32()?, input.read_f32()?, input.read_f32()?],
        normal: [input.read_f32()?, input.read_f32()?, input.read_f32()?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh_round_trips() {
        let mesh = Mesh::default();
        let bytes = mesh.to_bmf_bytes().unwrap();
        // Two empty strings and six zero counts.
        assert_eq!(bytes.len(), 2 + 24);
        assert_eq!(Mesh::from_bmf_bytes(&bytes).unwrap(), mesh);
    }

    #[test]
    fn blended_vertex_sentinel_survives_the_signed_field() {
        let mesh = Mesh {
            bone_bindings: vec![BoneBinding {
                bone_index: 0,
                vertex_index: 0,
                vertex_count: 4,
                blended_vertex_index: -1,
                blended_vertex_count: 0,
            }],
            ..Mesh::default()
        };
        let decoded = Mesh::from_bmf_bytes(&mesh.to_bmf_bytes().unwrap()).unwrap();
        assert_eq!(decoded.bone_bindings[0].blended_vertex_index, -1);
    }

    #[test]
    fn trailing_byte_is_rejected() {
        let mut bytes = Mesh::default().to_bmf_bytes().unwrap();
        bytes.push(0xAB);
        assert!(matches!(
            Mesh::from_bmf_bytes(&bytes),
            Err(Error::TrailingData { format: "BMF" })
        ));
    }

    #[test]
    fn truncated_mesh_is_rejected() {
        let mesh = Mesh {
            skin_name: "xskin-dummy".into(),
            default_texture_name: "x".into(),
            bones: vec!["ROOT".into()],
            ..Mesh::default()
        };
        let bytes = mesh.to_bmf_bytes().unwrap();
        for len in 0..bytes.len() {
            assert!(
                matches!(
                    Mesh::from_bmf_bytes(&bytes[..len]),
                    Err(Error::Truncated { .. })
                ),
                "prefix of {len} bytes decoded"
            );
        }
    }
}
