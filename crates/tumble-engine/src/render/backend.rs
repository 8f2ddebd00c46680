use crate::geometry::VertexArray;
use crate::paint::Color;
use crate::shader::{LinkError, LinkedProgram, TextureSlot};
use crate::texture::TextureImage;

use super::UniformBlock;

/// Driver identification, logged once at setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendInfo {
    pub version: String,
    pub vendor: String,
    pub renderer: String,
    pub extensions: String,
}

/// One vertex buffer bound to one shader attribute location.
pub struct AttributeBinding<'a, B: Backend + ?Sized> {
    pub location: u32,
    pub components: u32,
    pub buffer: &'a B::Buffer,
}

/// A single non-indexed triangle-list draw.
///
/// `attributes` lists exactly the arrays the program consumes, in the
/// program's location order. Nothing else is bound for the draw.
pub struct Draw<'a, B: Backend + ?Sized> {
    pub program: &'a B::Program,
    pub attributes: &'a [AttributeBinding<'a, B>],
    pub texture: Option<(TextureSlot, &'a B::Texture)>,
    pub uniforms: &'a UniformBlock,
    pub vertex_count: u32,
}

/// GPU seam used by the frame pipeline.
///
/// Handle types own their GPU object and release it on drop.
pub trait Backend {
    type Program;
    type Buffer;
    type Texture;

    fn info(&self) -> BackendInfo;

    /// Builds the GPU program for an already linked shader pair.
    fn create_program(&mut self, program: &LinkedProgram) -> Result<Self::Program, LinkError>;

    /// Write-once vertex buffer.
    fn upload(&mut self, label: &str, array: VertexArray<'_>) -> Self::Buffer;

    /// Callers check [`TextureImage::texel_count_matches`] first.
    fn create_texture(&mut self, image: &TextureImage) -> Self::Texture;

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clears color to `color` and depth to 1.0.
    fn clear(&mut self, color: Color);

    fn draw(&mut self, draw: &Draw<'_, Self>);

    /// Error raised by the GPU since the previous check, if any.
    fn check_error(&mut self, op: &str) -> Option<String> {
        let _ = op;
        None
    }
}
