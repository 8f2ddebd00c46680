//! Static mesh data and its GPU-resident form.
//!
//! Vertex data lives in literal arrays. Each array is uploaded exactly once
//! into its own immutable buffer; there is no re-upload path.

pub mod cube;

use crate::render::Backend;
use crate::shader::names;

/// Borrowed flat `f32` vertex array with a fixed number of components per vertex.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VertexArray<'a> {
    pub data: &'a [f32],
    pub components: u32,
}

impl<'a> VertexArray<'a> {
    pub const fn new(data: &'a [f32], components: u32) -> Self {
        Self { data, components }
    }

    /// Number of whole vertices in the array.
    pub fn count(&self) -> u32 {
        if self.components == 0 {
            return 0;
        }
        (self.data.len() / self.components as usize) as u32
    }
}

/// Per-vertex attribute kinds a mesh can provide.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MeshAttribute {
    Position,
    Uv,
    Normal,
}

impl MeshAttribute {
    /// Shader attribute name this array feeds.
    pub fn name(self) -> &'static str {
        match self {
            MeshAttribute::Position => names::POSITION,
            MeshAttribute::Uv => names::UV,
            MeshAttribute::Normal => names::NORMAL,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            names::POSITION => Some(MeshAttribute::Position),
            names::UV => Some(MeshAttribute::Uv),
            names::NORMAL => Some(MeshAttribute::Normal),
            _ => None,
        }
    }

    pub fn components(self) -> u32 {
        match self {
            MeshAttribute::Position | MeshAttribute::Normal => 3,
            MeshAttribute::Uv => 2,
        }
    }
}

/// CPU-side mesh: positions plus optional UVs and normals.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshData {
    pub label: &'static str,
    pub positions: &'static [f32],
    pub uvs: Option<&'static [f32]>,
    pub normals: Option<&'static [f32]>,
}

impl MeshData {
    pub fn array(&self, attribute: MeshAttribute) -> Option<VertexArray<'static>> {
        let data = match attribute {
            MeshAttribute::Position => Some(self.positions),
            MeshAttribute::Uv => self.uvs,
            MeshAttribute::Normal => self.normals,
        }?;
        Some(VertexArray::new(data, attribute.components()))
    }
}

/// Uploaded mesh. Buffers are released when this value is dropped.
pub struct MeshBuffer<B: Backend> {
    label: &'static str,
    positions: B::Buffer,
    uvs: Option<B::Buffer>,
    normals: Option<B::Buffer>,
    vertex_count: u32,
}

impl<B: Backend> MeshBuffer<B> {
    /// Uploads every array `mesh` provides.
    ///
    /// The vertex count is taken from the positions. An optional array with a
    /// different count is still uploaded, but logged at WARN.
    pub fn upload(backend: &mut B, mesh: &MeshData) -> Self {
        let positions = VertexArray::new(mesh.positions, MeshAttribute::Position.components());
        let vertex_count = positions.count();

        let mut upload_optional = |attribute: MeshAttribute| {
            let array = mesh.array(attribute)?;
            if array.count() != vertex_count {
                log::warn!(
                    "mesh `{}`: {} array has {} vertices, positions have {}",
                    mesh.label,
                    attribute.name(),
                    array.count(),
                    vertex_count
                );
            }
            let label = format!("{} {}", mesh.label, attribute.name());
            Some(backend.upload(&label, array))
        };

        let uvs = upload_optional(MeshAttribute::Uv);
        let normals = upload_optional(MeshAttribute::Normal);

        let label = format!("{} {}", mesh.label, names::POSITION);
        let positions = backend.upload(&label, positions);

        log::debug!("mesh `{}` uploaded: {vertex_count} vertices", mesh.label);

        Self {
            label: mesh.label,
            positions,
            uvs,
            normals,
            vertex_count,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Buffer holding `attribute`, if the mesh provides it.
    pub fn buffer(&self, attribute: MeshAttribute) -> Option<&B::Buffer> {
        match attribute {
            MeshAttribute::Position => Some(&self.positions),
            MeshAttribute::Uv => self.uvs.as_ref(),
            MeshAttribute::Normal => self.normals.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::RecordingBackend;

    #[test]
    fn count_is_whole_vertices() {
        assert_eq!(VertexArray::new(&[0.0; 9], 3).count(), 3);
        assert_eq!(VertexArray::new(&[0.0; 7], 2).count(), 3);
        assert_eq!(VertexArray::new(&[0.0; 4], 0).count(), 0);
    }

    #[test]
    fn cube_arrays_agree() {
        let cube = cube::CUBE;
        let count = |a| cube.array(a).map(|v| v.count());
        assert_eq!(count(MeshAttribute::Position), Some(36));
        assert_eq!(count(MeshAttribute::Uv), Some(36));
        assert_eq!(count(MeshAttribute::Normal), Some(36));
    }

    #[test]
    fn upload_takes_vertex_count_from_positions() {
        let mut backend = RecordingBackend::default();
        let mesh = MeshBuffer::upload(&mut backend, &cube::CUBE);

        assert_eq!(mesh.vertex_count(), 36);
        assert!(mesh.buffer(MeshAttribute::Uv).is_some());
        assert!(mesh.buffer(MeshAttribute::Normal).is_some());
        assert_eq!(backend.uploads(), 3);
    }

    #[test]
    fn missing_arrays_are_not_uploaded() {
        static POSITIONS: [f32; 9] = [0.0; 9];
        let mesh = MeshData {
            label: "triangle",
            positions: &POSITIONS,
            uvs: None,
            normals: None,
        };

        let mut backend = RecordingBackend::default();
        let buffer = MeshBuffer::upload(&mut backend, &mesh);

        assert_eq!(buffer.vertex_count(), 3);
        assert!(buffer.buffer(MeshAttribute::Uv).is_none());
        assert_eq!(backend.uploads(), 1);
    }

    #[test]
    fn mismatched_counts_still_upload() {
        static POSITIONS: [f32; 9] = [0.0; 9];
        static UVS: [f32; 4] = [0.0; 4];
        let mesh = MeshData {
            label: "short uvs",
            positions: &POSITIONS,
            uvs: Some(&UVS),
            normals: None,
        };

        let mut backend = RecordingBackend::default();
        let buffer = MeshBuffer::upload(&mut backend, &mesh);
        assert_eq!(buffer.vertex_count(), 3);
        assert!(buffer.buffer(MeshAttribute::Uv).is_some());
    }
}
