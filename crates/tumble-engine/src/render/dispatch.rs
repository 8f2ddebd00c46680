use glam::{Mat4, Vec3};

use crate::geometry::MeshBuffer;
use crate::transform::ObjectTransform;

use super::{AttributeBinding, Backend, Draw, Program, UniformBlock};

/// Values shared by every draw of a frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub light_position: Vec3,
}

/// Packs the uniform block `program` declares for one object.
pub fn pack_uniforms<B: Backend>(
    program: &Program<B>,
    transform: &ObjectTransform,
    frame: &FrameUniforms,
) -> UniformBlock {
    let locs = program.locations();
    let mut block = UniformBlock::new(locs.uniform_size);

    if let Some(slot) = locs.mvp {
        block.write_mat4(slot, &transform.mvp);
    }
    if let Some(slot) = locs.mv {
        block.write_mat4(slot, &transform.model_view);
    }
    if let Some(slot) = locs.view {
        block.write_mat4(slot, &frame.view);
    }
    if let Some(slot) = locs.normal_matrix {
        block.write_mat3(slot, &transform.normal);
    }
    if let Some(slot) = locs.light_position {
        block.write_vec3(slot, frame.light_position);
    }

    block
}

/// Issues one draw of `mesh` with `program`.
///
/// Only the arrays the program reads are bound. The texture is bound when the
/// program has a texture slot and one is supplied.
pub fn dispatch<B: Backend>(
    backend: &mut B,
    program: &Program<B>,
    mesh: &MeshBuffer<B>,
    texture: Option<&B::Texture>,
    transform: &ObjectTransform,
    frame: &FrameUniforms,
) {
    let uniforms = pack_uniforms(program, transform, frame);
    let locs = program.locations();

    let mut attributes = Vec::with_capacity(locs.attributes.len());
    for slot in &locs.attributes {
        let Some(buffer) = mesh.buffer(slot.attribute) else {
            log::error!(
                "mesh `{}` has no {} array for program `{}`",
                mesh.label(),
                slot.attribute.name(),
                program.label()
            );
            return;
        };
        attributes.push(AttributeBinding {
            location: slot.location,
            components: slot.components,
            buffer,
        });
    }

    let texture = match (locs.texture, texture) {
        (Some(slot), Some(tex)) => Some((slot, tex)),
        _ => None,
    };

    backend.draw(&Draw {
        program: program.handle(),
        attributes: &attributes,
        texture,
        uniforms: &uniforms,
        vertex_count: mesh.vertex_count(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{cube, MeshBuffer};
    use crate::texture::TextureImage;
    use crate::render::testing::{Command, RecordingBackend};
    use crate::render::ProgramRole;
    use crate::shader::sources;
    use crate::transform::{Camera, Placement};

    fn frame_inputs() -> (ObjectTransform, FrameUniforms) {
        let cam = Camera::look(Vec3::Z * 10.0, Vec3::NEG_Z, Vec3::Y, 0.8, 1.0, 0.1, 100.0);
        let placement = Placement {
            position: Vec3::new(1.0, 2.0, 3.0),
            angle: 0.4,
            axis: Vec3::X,
        };
        let frame = FrameUniforms {
            view: cam.view(),
            light_position: Vec3::new(0.0, 5.0, 0.0),
        };
        (ObjectTransform::compute(&placement, &cam), frame)
    }

    #[test]
    fn lit_uniforms_land_at_reflected_offsets() {
        let mut backend = RecordingBackend::default();
        let program = Program::build(&mut backend, ProgramRole::Lit, &sources::PHONG).unwrap();
        let (transform, frame) = frame_inputs();

        let block = pack_uniforms(&program, &transform, &frame);
        assert_eq!(block.len(), 256);
        assert_eq!(block.read_mat4(0), transform.mvp);
        assert_eq!(block.read_mat4(64), transform.model_view);
        assert_eq!(block.read_mat4(128), frame.view);
        assert_eq!(block.read_mat3(192), transform.normal);
        assert_eq!(block.read_vec3(240), frame.light_position);
    }

    #[test]
    fn unlit_draw_binds_position_and_uv_only() {
        let mut backend = RecordingBackend::default();
        let program =
            Program::build(&mut backend, ProgramRole::Textured, &sources::TEXTURED).unwrap();
        let mesh = MeshBuffer::upload(&mut backend, &cube::CUBE);
        let texture = backend.create_texture(&TextureImage::warm_quad());
        let (transform, frame) = frame_inputs();

        dispatch(&mut backend, &program, &mesh, Some(&texture), &transform, &frame);

        let [Command::Draw(draw)] = backend.commands() else {
            panic!("expected one draw, got {:?}", backend.commands());
        };
        assert_eq!(draw.program, "textured");
        assert_eq!(draw.attribute_names(), vec![(0, "cube position"), (1, "cube uv")]);
        assert!(draw.textured);
        assert_eq!(draw.vertex_count, 36);
        assert_eq!(draw.uniforms.read_mat4(0), transform.mvp);
    }

    #[test]
    fn marker_draw_has_no_texture() {
        let mut backend = RecordingBackend::default();
        let program = Program::build(&mut backend, ProgramRole::Marker, &sources::MARKER).unwrap();
        let mesh = MeshBuffer::upload(&mut backend, &cube::CUBE);
        let texture = backend.create_texture(&TextureImage::warm_quad());
        let (transform, frame) = frame_inputs();

        dispatch(&mut backend, &program, &mesh, Some(&texture), &transform, &frame);

        let [Command::Draw(draw)] = backend.commands() else {
            panic!("expected one draw");
        };
        assert_eq!(draw.attribute_names(), vec![(0, "cube position")]);
        assert!(!draw.textured);
    }
}
