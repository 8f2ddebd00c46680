use glam::{Mat3, Mat4, Vec3};

use crate::shader::UniformSlot;

/// CPU image of a program's uniform block.
///
/// Values are written at the byte offsets reflected from the shader, using the
/// WGSL uniform layout (column-major, `mat3x3` columns padded to 16 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    bytes: Vec<u8>,
}

const MAT3_COLUMN_STRIDE: usize = 16;

impl UniformBlock {
    /// Zeroed block of `size` bytes.
    pub fn new(size: u32) -> Self {
        Self {
            bytes: vec![0; size as usize],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_mat4(&mut self, slot: UniformSlot, value: &Mat4) {
        self.write_floats(slot.offset as usize, &value.to_cols_array());
    }

    pub fn write_mat3(&mut self, slot: UniformSlot, value: &Mat3) {
        let base = slot.offset as usize;
        for (i, col) in value.to_cols_array_2d().iter().enumerate() {
            self.write_floats(base + i * MAT3_COLUMN_STRIDE, col);
        }
    }

    pub fn write_vec3(&mut self, slot: UniformSlot, value: Vec3) {
        self.write_floats(slot.offset as usize, &value.to_array());
    }

    pub fn read_mat4(&self, offset: u32) -> Mat4 {
        let mut cols = [0.0f32; 16];
        self.read_floats(offset as usize, &mut cols);
        Mat4::from_cols_array(&cols)
    }

    pub fn read_mat3(&self, offset: u32) -> Mat3 {
        let mut cols = [[0.0f32; 3]; 3];
        for (i, col) in cols.iter_mut().enumerate() {
            self.read_floats(offset as usize + i * MAT3_COLUMN_STRIDE, col);
        }
        Mat3::from_cols_array_2d(&cols)
    }

    pub fn read_vec3(&self, offset: u32) -> Vec3 {
        let mut v = [0.0f32; 3];
        self.read_floats(offset as usize, &mut v);
        Vec3::from_array(v)
    }

    fn write_floats(&mut self, offset: usize, values: &[f32]) {
        let src: &[u8] = bytemuck::cast_slice(values);
        match self.bytes.get_mut(offset..offset + src.len()) {
            Some(dst) => dst.copy_from_slice(src),
            None => log::error!(
                "uniform write of {} bytes at offset {offset} overflows a {}-byte block",
                src.len(),
                self.bytes.len()
            ),
        }
    }

    fn read_floats(&self, offset: usize, out: &mut [f32]) {
        let len = std::mem::size_of_val(out);
        if let Some(src) = self.bytes.get(offset..offset + len) {
            for (dst, chunk) in out.iter_mut().zip(src.chunks_exact(4)) {
                *dst = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
        }
    }
}
