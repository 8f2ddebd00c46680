//! GPU programs with their resolved locations.

use crate::geometry::MeshAttribute;
use crate::shader::sources::ProgramSource;
use crate::shader::{
    self, names, LinkError, LinkedProgram, ShaderStage, TextureSlot, UniformKind, UniformSlot,
};

use super::{Backend, SetupError};

/// What a program is used for. Decides which locations must resolve.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProgramRole {
    /// Unlit, textured.
    Textured,
    /// Textured with a point light.
    Lit,
    /// Solid light marker.
    Marker,
}

impl ProgramRole {
    fn required_attributes(self) -> &'static [&'static str] {
        match self {
            ProgramRole::Textured => &[names::POSITION, names::UV],
            ProgramRole::Lit => &[names::POSITION, names::UV, names::NORMAL],
            ProgramRole::Marker => &[names::POSITION],
        }
    }

    fn required_uniforms(self) -> &'static [&'static str] {
        match self {
            ProgramRole::Textured | ProgramRole::Marker => &[names::MVP],
            ProgramRole::Lit => &[
                names::MVP,
                names::MV,
                names::VIEW,
                names::NORMAL_MATRIX,
                names::LIGHT_POSITION,
            ],
        }
    }

    fn requires_texture(self) -> bool {
        !matches!(self, ProgramRole::Marker)
    }
}

/// A vertex attribute the program consumes, mapped to the mesh array feeding it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeSlot {
    pub attribute: MeshAttribute,
    pub location: u32,
    pub components: u32,
}

/// Every location the draw path needs. `None` means the program does not
/// declare the value; the dispatcher skips it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locations {
    /// Sorted by location.
    pub attributes: Vec<AttributeSlot>,
    pub uniform_size: u32,
    pub mvp: Option<UniformSlot>,
    pub mv: Option<UniformSlot>,
    pub view: Option<UniformSlot>,
    pub normal_matrix: Option<UniformSlot>,
    pub light_position: Option<UniformSlot>,
    pub texture: Option<TextureSlot>,
}

impl Locations {
    /// Resolves every known name on `linked`, failing on names `role` requires.
    pub fn resolve(role: ProgramRole, linked: &LinkedProgram) -> Result<Self, LinkError> {
        for &name in role.required_attributes() {
            if linked.attrib_location(name).is_none() {
                return Err(LinkError::MissingAttribute(name));
            }
        }
        for &name in role.required_uniforms() {
            if linked.uniform_location(name).is_none() {
                return Err(LinkError::MissingUniform(name));
            }
        }
        if role.requires_texture() && linked.texture_location(names::DIFFUSE_MAP).is_none() {
            return Err(LinkError::MissingTexture(names::DIFFUSE_MAP));
        }

        let attributes = linked
            .attributes()
            .iter()
            .map(|a| {
                let attribute = MeshAttribute::from_name(&a.name).ok_or_else(|| {
                    LinkError::UnsupportedAttribute {
                        name: a.name.clone(),
                    }
                })?;
                Ok(AttributeSlot {
                    attribute,
                    location: a.location,
                    components: a.components,
                })
            })
            .collect::<Result<Vec<_>, LinkError>>()?;

        let uniform = |name: &'static str, expected: UniformKind| {
            match linked.uniform_location(name) {
                Some(slot) if slot.kind != expected => Err(LinkError::UniformType {
                    name,
                    expected,
                    found: slot.kind,
                }),
                other => Ok(other),
            }
        };

        Ok(Self {
            attributes,
            uniform_size: linked.uniform_block().map_or(0, |b| b.size),
            mvp: uniform(names::MVP, UniformKind::Mat4)?,
            mv: uniform(names::MV, UniformKind::Mat4)?,
            view: uniform(names::VIEW, UniformKind::Mat4)?,
            normal_matrix: uniform(names::NORMAL_MATRIX, UniformKind::Mat3)?,
            light_position: uniform(names::LIGHT_POSITION, UniformKind::Vec3)?,
            texture: linked.texture_location(names::DIFFUSE_MAP),
        })
    }

    /// `true` if the program reads `attribute`.
    pub fn uses(&self, attribute: MeshAttribute) -> bool {
        self.attributes.iter().any(|a| a.attribute == attribute)
    }

    fn log(&self, label: &str) {
        for a in &self.attributes {
            log::info!(
                "program `{label}`: attribute {} at location {}",
                a.attribute.name(),
                a.location
            );
        }
        let uniforms = [
            (names::MVP, self.mvp),
            (names::MV, self.mv),
            (names::VIEW, self.view),
            (names::NORMAL_MATRIX, self.normal_matrix),
            (names::LIGHT_POSITION, self.light_position),
        ];
        for (name, slot) in uniforms {
            match slot {
                Some(s) => log::info!("program `{label}`: uniform {name} at offset {}", s.offset),
                None => log::info!("program `{label}`: uniform {name} not declared"),
            }
        }
        match self.texture {
            Some(t) => log::info!(
                "program `{label}`: texture at group {} binding {}",
                t.group,
                t.texture_binding
            ),
            None => log::info!("program `{label}`: no texture"),
        }
    }
}

/// Linked GPU program. Dropping it releases the GPU object.
pub struct Program<B: Backend> {
    label: String,
    role: ProgramRole,
    locations: Locations,
    handle: B::Program,
}

impl<B: Backend> Program<B> {
    /// Resolves locations for `role`, logs them, then builds the GPU program.
    pub fn create(
        backend: &mut B,
        role: ProgramRole,
        linked: &LinkedProgram,
    ) -> Result<Self, LinkError> {
        let locations = Locations::resolve(role, linked).inspect_err(|err| {
            log::error!("could not link program `{}`: {err}", linked.label());
        })?;
        locations.log(linked.label());

        let handle = backend.create_program(linked).inspect_err(|err| {
            log::error!("could not link program `{}`: {err}", linked.label());
        })?;

        Ok(Self {
            label: linked.label().to_string(),
            role,
            locations,
            handle,
        })
    }

    /// Compiles, links and builds `source` in one go.
    pub fn build(
        backend: &mut B,
        role: ProgramRole,
        source: &ProgramSource,
    ) -> Result<Self, SetupError> {
        let program = source.label.to_string();

        let vertex = shader::compile(ShaderStage::Vertex, source.vertex.clone()).map_err(|source| {
            SetupError::Compile {
                program: program.clone(),
                source,
            }
        })?;
        let fragment =
            shader::compile(ShaderStage::Fragment, source.fragment.clone()).map_err(|source| {
                SetupError::Compile {
                    program: program.clone(),
                    source,
                }
            })?;

        let link = |source| SetupError::Link {
            program: program.clone(),
            source,
        };
        let linked = shader::link(source.label, vertex, fragment).map_err(link)?;
        Self::create(backend, role, &linked).map_err(link)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> ProgramRole {
        self.role
    }

    pub fn locations(&self) -> &Locations {
        &self.locations
    }

    pub fn handle(&self) -> &B::Program {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::RecordingBackend;
    use crate::shader::sources;

    fn linked(src: &ProgramSource) -> LinkedProgram {
        let vs = shader::compile(ShaderStage::Vertex, src.vertex.clone()).unwrap();
        let fs = shader::compile(ShaderStage::Fragment, src.fragment.clone()).unwrap();
        shader::link(src.label, vs, fs).unwrap()
    }

    #[test]
    fn lit_program_resolves_everything() {
        let locs = Locations::resolve(ProgramRole::Lit, &linked(&sources::PHONG)).unwrap();

        let attrs: Vec<_> = locs.attributes.iter().map(|a| (a.attribute, a.location)).collect();
        assert_eq!(
            attrs,
            vec![
                (MeshAttribute::Position, 0),
                (MeshAttribute::Uv, 1),
                (MeshAttribute::Normal, 2)
            ]
        );
        assert_eq!(locs.normal_matrix.map(|s| s.offset), Some(192));
        assert_eq!(locs.light_position.map(|s| s.offset), Some(240));
        assert_eq!(locs.uniform_size, 256);
        assert!(locs.texture.is_some());
    }

    #[test]
    fn unlit_program_leaves_lighting_unresolved() {
        let locs = Locations::resolve(ProgramRole::Textured, &linked(&sources::TEXTURED)).unwrap();
        assert!(locs.uses(MeshAttribute::Uv));
        assert!(!locs.uses(MeshAttribute::Normal));
        assert_eq!(locs.mv, None);
        assert_eq!(locs.light_position, None);
    }

    #[test]
    fn role_requirements_are_enforced() {
        let err = Locations::resolve(ProgramRole::Lit, &linked(&sources::TEXTURED)).unwrap_err();
        assert_eq!(err, LinkError::MissingAttribute(names::NORMAL));

        let err = Locations::resolve(ProgramRole::Textured, &linked(&sources::MARKER)).unwrap_err();
        assert_eq!(err, LinkError::MissingAttribute(names::UV));
    }

    #[test]
    fn lit_role_requires_light_position() {
        let src = ProgramSource::new(
            "unlit normals",
            r#"
struct Uniforms {
    mvp: mat4x4<f32>,
    mv: mat4x4<f32>,
    view: mat4x4<f32>,
    normal_matrix: mat3x3<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
) -> VertexOut {
    var out: VertexOut;
    let p = vec4<f32>(position + u.normal_matrix * normal, 1.0);
    out.clip = u.mvp * u.mv * u.view * p;
    out.uv = uv;
    return out;
}
"#,
            sources::TEXTURED.fragment,
        );
        let err = Locations::resolve(ProgramRole::Lit, &linked(&src)).unwrap_err();
        assert_eq!(err, LinkError::MissingUniform(names::LIGHT_POSITION));
    }

    #[test]
    fn textured_role_requires_diffuse_map() {
        let src = ProgramSource::new(
            "uv colours",
            sources::TEXTURED.vertex,
            r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#,
        );
        let err = Locations::resolve(ProgramRole::Textured, &linked(&src)).unwrap_err();
        assert_eq!(err, LinkError::MissingTexture(names::DIFFUSE_MAP));

        let mut backend = RecordingBackend::default();
        let err = Program::build(&mut backend, ProgramRole::Textured, &src).err();
        assert!(matches!(
            err,
            Some(SetupError::Link { source: LinkError::MissingTexture(_), .. })
        ));
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn marker_does_not_need_a_texture() {
        let locs = Locations::resolve(ProgramRole::Marker, &linked(&sources::MARKER)).unwrap();
        assert_eq!(locs.texture, None);
        assert_eq!(locs.uniform_size, 64);
    }

    #[test]
    fn wrongly_typed_uniform_is_rejected() {
        let src = ProgramSource::new(
            "vec4 mvp",
            r#"
@group(0) @binding(0) var<uniform> mvp: vec4<f32>;
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return mvp + vec4<f32>(position, 1.0);
}
"#,
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        );
        let err = Locations::resolve(ProgramRole::Marker, &linked(&src)).unwrap_err();
        assert_eq!(
            err,
            LinkError::UniformType {
                name: names::MVP,
                expected: UniformKind::Mat4,
                found: UniformKind::Vec4
            }
        );
    }

    #[test]
    fn build_reports_compile_failure_with_label() {
        let mut backend = RecordingBackend::default();
        let src = ProgramSource::new("broken", "@vertex fn vs_main( {", sources::MARKER.fragment);
        let err = Program::build(&mut backend, ProgramRole::Marker, &src).err().unwrap();

        assert!(matches!(
            err,
            SetupError::Compile { ref program, source: shader::CompileError::Parse { .. } }
                if program == "broken"
        ));
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn dropping_a_program_releases_it() {
        let mut backend = RecordingBackend::default();
        let program = Program::build(&mut backend, ProgramRole::Textured, &sources::TEXTURED).unwrap();
        assert_eq!(backend.live_programs(), 1);
        assert_eq!(program.label(), "textured");

        drop(program);
        assert_eq!(backend.live_programs(), 0);
    }
}
