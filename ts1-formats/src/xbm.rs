//! Read-only decoder for `.xbm` files, the Xbox port's mesh container.
//!
//! The format is flag-driven: a per-mesh flag word selects which vertex
//! attribute sections follow, geometry arrives either as indexed triangles
//! or as triangle strips, and normals are packed as signed bytes scaled by
//! 127. Several regions have no known meaning and are skipped. There is no
//! writer; the game ships these files, tooling only reads them.

use crate::Error;
use crate::io::{BinaryInput, decode_windows_1252};
use std::path::Path;

const HAS_UVS: u32 = 0b0000_0010;
const HAS_UNKNOWN_ATTRIBUTE: u32 = 0b0000_0100;
const HAS_NORMALS: u32 = 0b0000_1000;
const HAS_FACE_INDICES: u32 = 0b0010_0000;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XbmVertex {
    pub position: [f32; 3],
    pub unknown: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XbmMesh {
    pub positions: Vec<XbmVertex>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub faces: Vec<u16>,
    /// Half-open vertex ranges of the triangle strips.
    pub strips: Vec<(u32, u32)>,
    pub texture_id: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XbmObject {
    pub meshes: Vec<XbmMesh>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XbmModel {
    pub name: String,
    pub objects: Vec<XbmObject>,
}

impl XbmModel {
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = BinaryInput::new(bytes);
        let model = read_model(&mut input)?;
        if input.remaining() != 0 {
            return Err(Error::TrailingData { format: "XBM" });
        }
        Ok(model)
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<XbmModel, Error> {
    XbmModel::parse(&std::fs::read(path)?)
}

fn read_vertices(input: &mut BinaryInput<'_>, count: usize) -> Result<Vec<XbmVertex>, Error> {
    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(XbmVertex {
            position: [input.read_f32()?, input.read_f32()?, input.read_f32()?],
            unknown: input.read_u32()?,
        });
    }
    Ok(vertices)
}

fn read_uvs(input: &mut BinaryInput<'_>, count: usize, uvs: &mut Vec<[f32; 2]>) -> Result<(), Error> {
    for _ in 0..count {
        uvs.push([input.read_f32()?, input.read_f32()?]);
    }
    Ok(())
}

fn read_normals(
    input: &mut BinaryInput<'_>,
    count: usize,
    normals: &mut Vec<[f32; 3]>,
) -> Result<(), Error> {
    for _ in 0..count {
        let x = input.read_i8()?;
        let y = input.read_i8()?;
        let z = input.read_i8()?;
        normals.push([
            f32::from(x) / 127.0,
            f32::from(y) / 127.0,
            f32::from(z) / 127.0,
        ]);
    }
    Ok(())
}

fn read_mesh(input: &mut BinaryInput<'_>) -> Result<XbmMesh, Error> {
    let flags = input.read_u32()?;
    let texture_id = input.read_u32()?;

    let strip_count = input.read_u32()? as usize;
    input.skip(strip_count, "strip table")?;

    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    let mut normals = Vec::new();
    let mut faces = Vec::new();
    let mut strips = Vec::new();

    let mut previous_strip_end = 0u32;

    for _ in 0..strip_count {
        let mesh_type = input.read_u8()?;

        if mesh_type == 4 {
            for _ in 0..strip_count {
                input.skip(1, "strip block")?;

                let vertex_count = input.read_u32()? as usize;

                positions.append(&mut read_vertices(input, vertex_count)?);
                read_uvs(input, vertex_count, &mut uvs)?;

                if flags & HAS_UNKNOWN_ATTRIBUTE != 0 {
                    input.skip(vertex_count * 4, "unknown attribute")?;
                }

                if flags & HAS_NORMALS != 0 {
                    read_normals(input, vertex_count, &mut normals)?;
                }

                input.skip(vertex_count * 4, "strip block tail")?;

                let end = previous_strip_end + vertex_count as u32;
                strips.push((previous_strip_end, end));
                previous_strip_end = end;
            }

            break;
        }

        if mesh_type == 2 {
            input.skip(1, "mesh type padding")?;
        }

        let mut has_blends = false;
        if mesh_type == 1 || mesh_type == 2 {
            loop {
                let unknowns = [
                    input.read_u8()?,
                    input.read_u8()?,
                    input.read_u8()?,
                    input.read_u8()?,
                ];
                if unknowns[3] == 0 {
                    break;
                }
                has_blends = true;
            }
        }

        let vertex_count = input.read_u32()? as usize;

        positions.append(&mut read_vertices(input, vertex_count)?);

        if flags & HAS_UVS != 0 {
            read_uvs(input, vertex_count, &mut uvs)?;
        }

        if flags & HAS_UNKNOWN_ATTRIBUTE != 0 {
            input.skip(vertex_count * 4, "unknown attribute")?;
        }

        if flags & HAS_NORMALS != 0 {
            read_normals(input, vertex_count, &mut normals)?;
        }

        if flags & HAS_FACE_INDICES != 0 {
            let index_count = input.read_u32()? as usize;
            input.skip(1, "index padding")?;
            faces = Vec::with_capacity(index_count);
            for _ in 0..index_count {
                faces.push(input.read_u16()?);
            }
        } else {
            strips.push((
                previous_strip_end,
                previous_strip_end + vertex_count as u32,
            ));
        }

        previous_strip_end += vertex_count as u32;

        if has_blends {
            input.skip(vertex_count * 4, "blend data")?;
        }
    }

    Ok(XbmMesh {
        positions,
        uvs,
        normals,
        faces,
        strips,
        texture_id,
    })
}

fn read_object(input: &mut BinaryInput<'_>) -> Result<XbmObject, Error> {
    input.skip(4, "object header")?;

    let mesh_count = input.read_u32()? as usize;

    let mut meshes = Vec::with_capacity(mesh_count);
    for _ in 0..mesh_count {
        meshes.push(read_mesh(input)?);

        let marker = input.read_u8()?;
        if marker != 6 {
            input.skip(1, "mesh separator")?;
        }
    }

    Ok(XbmObject { meshes })
}

fn read_model(input: &mut BinaryInput<'_>) -> Result<XbmModel, Error> {
    input.skip(6, "model header")?;

    let mut name_bytes = Vec::new();
    loop {
        let byte = input.read_u8()?;
        if byte == 0 {
            break;
        }
        name_bytes.push(byte);
    }
    let name = decode_windows_1252(&name_bytes);

    input.skip(1, "model header")?;
    input.skip(4, "model header")?;

    let object_count = input.read_u32()? as usize;
    let mut objects = Vec::with_capacity(object_count);
    for _ in 0..object_count {
        objects.push(read_object(input)?);
    }

    input.skip(64, "model footer")?;
    input.skip(8, "model footer")?;

    Ok(XbmModel { name, objects })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u32(bytes: &mut Vec<u8>, value: u32) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u16(bytes: &mut Vec<u8>, value: u16) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn put_f32(bytes: &mut Vec<u8>, value: f32) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn model_around_mesh(mesh: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0; 6]);
        bytes.extend_from_slice(b"sofa\0");
        bytes.extend_from_slice(&[0; 5]);
        put_u32(&mut bytes, 1); // objects
        bytes.extend_from_slice(&[0; 4]);
        put_u32(&mut bytes, 1); // meshes
        bytes.extend_from_slice(mesh);
        bytes.push(6); // separator marker
        bytes.extend_from_slice(&[0; 72]);
        bytes
    }

    fn indexed_mesh() -> Vec<u8> {
        let mut mesh = Vec::new();
        put_u32(&mut mesh, HAS_UVS | HAS_NORMALS | HAS_FACE_INDICES);
        put_u32(&mut mesh, 7); // texture id
        put_u32(&mut mesh, 1); // strip count
        mesh.push(0); // strip table
        mesh.push(0); // mesh type
        put_u32(&mut mesh, 1); // vertex count
        for value in [1.0f32, 2.0, 3.0] {
            put_f32(&mut mesh, value);
        }
        put_u32(&mut mesh, 9); // vertex unknown
        put_f32(&mut mesh, 0.5);
        put_f32(&mut mesh, 0.25);
        mesh.extend_from_slice(&[127u8, 0x81, 0]); // packed normal, 0x81 = -127
        put_u32(&mut mesh, 3); // index count
        mesh.push(0);
        for index in [0u16, 0, 0] {
            put_u16(&mut mesh, index);
        }
        mesh
    }

    #[test]
    fn indexed_mesh_decodes_attributes_and_faces() {
        let model = XbmModel::parse(&model_around_mesh(&indexed_mesh())).unwrap();
        assert_eq!(model.name, "sofa");

        let mesh = &model.objects[0].meshes[0];
        assert_eq!(mesh.texture_id, 7);
        assert_eq!(mesh.positions.len(), 1);
        assert_eq!(mesh.positions[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(mesh.positions[0].unknown, 9);
        assert_eq!(mesh.uvs, [[0.5, 0.25]]);
        assert_eq!(mesh.normals, [[1.0, -1.0, 0.0]]);
        assert_eq!(mesh.faces, [0, 0, 0]);
        assert!(mesh.strips.is_empty());
    }

    #[test]
    fn unindexed_mesh_records_a_strip_range() {
        let mut mesh = Vec::new();
        put_u32(&mut mesh, HAS_UVS);
        put_u32(&mut mesh, 0); // texture id
        put_u32(&mut mesh, 1); // strip count
        mesh.push(0); // strip table
        mesh.push(0); // mesh type
        put_u32(&mut mesh, 2); // vertex count
        for _ in 0..2 {
            for value in [0.0f32, 0.0, 0.0] {
                put_f32(&mut mesh, value);
            }
            put_u32(&mut mesh, 0);
        }
        for _ in 0..2 {
            put_f32(&mut mesh, 0.0);
            put_f32(&mut mesh, 0.0);
        }

        let model = XbmModel::parse(&model_around_mesh(&mesh)).unwrap();
        let mesh = &model.objects[0].meshes[0];
        assert_eq!(mesh.strips, [(0, 2)]);
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn trailing_byte_is_rejected() {
        let mut bytes = model_around_mesh(&indexed_mesh());
        bytes.push(0);
        assert!(matches!(
            XbmModel::parse(&bytes),
            Err(Error::TrailingData { format: "XBM" })
        ));
    }

    #[test]
    fn truncated_model_is_rejected() {
        let bytes = model_around_mesh(&indexed_mesh());
        assert!(matches!(
            XbmModel::parse(&bytes[..bytes.len() - 1]),
            Err(Error::Truncated { .. })
        ));
    }
}
