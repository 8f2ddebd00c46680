//! In-memory backend that records what the frame pipeline asks of the GPU.

use std::cell::Cell;
use std::rc::Rc;

use crate::geometry::VertexArray;
use crate::paint::Color;
use crate::shader::{LinkError, LinkedProgram};
use crate::texture::TextureImage;

use super::{Backend, BackendInfo, Draw, UniformBlock};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Viewport(u32, u32),
    Clear(Color),
    Draw(DrawRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: String,
    /// `(location, buffer label)` in binding order.
    pub attributes: Vec<(u32, String)>,
    pub textured: bool,
    pub uniforms: UniformBlock,
    pub vertex_count: u32,
}

impl DrawRecord {
    pub fn attribute_names(&self) -> Vec<(u32, &str)> {
        self.attributes
            .iter()
            .map(|(loc, label)| (*loc, label.as_str()))
            .collect()
    }
}

/// Counts itself in `live` until dropped.
#[derive(Debug)]
struct LiveToken(Rc<Cell<usize>>);

impl LiveToken {
    fn new(live: &Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Self(Rc::clone(live))
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[derive(Debug)]
pub struct RecordedProgram {
    label: String,
    _live: LiveToken,
}

#[derive(Debug)]
pub struct RecordedBuffer {
    pub label: String,
    pub vertices: u32,
}

#[derive(Debug)]
pub struct RecordedTexture {
    pub label: &'static str,
    pub levels: usize,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    live_programs: Rc<Cell<usize>>,
    uploads: usize,
    reject_programs: bool,
    pending_error: Option<String>,
    checked: Vec<String>,
}

impl RecordingBackend {
    /// Backend whose `create_program` always fails.
    pub fn rejecting_programs() -> Self {
        Self {
            reject_programs: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|c| match c {
            Command::Draw(d) => Some(d),
            _ => None,
        })
    }

    pub fn live_programs(&self) -> usize {
        self.live_programs.get()
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    /// Operations passed to `check_error`, in call order.
    pub fn checked_ops(&self) -> &[String] {
        &self.checked
    }

    pub fn has_pending_error(&self) -> bool {
        self.pending_error.is_some()
    }

    /// Makes the next `check_error` report `message`.
    pub fn raise_error(&mut self, message: &str) {
        self.pending_error = Some(message.to_string());
    }
}

impl Backend for RecordingBackend {
    type Program = RecordedProgram;
    type Buffer = RecordedBuffer;
    type Texture = RecordedTexture;

    fn info(&self) -> BackendInfo {
        BackendInfo {
            version: "recording".to_string(),
            vendor: "tumble".to_string(),
            renderer: "in-memory".to_string(),
            extensions: String::new(),
        }
    }

    fn create_program(&mut self, program: &LinkedProgram) -> Result<Self::Program, LinkError> {
        if self.reject_programs {
            return Err(LinkError::Pipeline("rejected by test backend".to_string()));
        }
        Ok(RecordedProgram {
            label: program.label().to_string(),
            _live: LiveToken::new(&self.live_programs),
        })
    }

    fn upload(&mut self, label: &str, array: VertexArray<'_>) -> Self::Buffer {
        self.uploads += 1;
        RecordedBuffer {
            label: label.to_string(),
            vertices: array.count(),
        }
    }

    fn create_texture(&mut self, image: &TextureImage) -> Self::Texture {
        RecordedTexture {
            label: image.label,
            levels: image.mip_chain().len(),
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(Command::Viewport(width, height));
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(Command::Clear(color));
    }

    fn draw(&mut self, draw: &Draw<'_, Self>) {
        self.commands.push(Command::Draw(DrawRecord {
            program: draw.program.label.clone(),
            attributes: draw
                .attributes
                .iter()
                .map(|a| (a.location, a.buffer.label.clone()))
                .collect(),
            textured: draw.texture.is_some(),
            uniforms: draw.uniforms.clone(),
            vertex_count: draw.vertex_count,
        }));
    }

    fn check_error(&mut self, op: &str) -> Option<String> {
        self.checked.push(op.to_string());
        self.pending_error.take()
    }
}
