use naga::{AddressSpace, Binding, Handle, Type, TypeInner, VectorSize};

use super::{CompiledShader, LinkError, ShaderStage};

pub const UNIFORM_GROUP: u32 = 0;
pub const UNIFORM_BINDING: u32 = 0;
pub const TEXTURE_GROUP: u32 = 1;
pub const TEXTURE_BINDING: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;

/// Value type of a uniform block member.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Other,
}

/// Resolved uniform location: byte offset inside the program's uniform block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformMember {
    pub name: String,
    pub slot: UniformSlot,
}

/// Layout of the program's uniform block (`@group(0) @binding(0)`).
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlockInfo {
    /// Size in bytes, including trailing padding.
    pub size: u32,
    pub members: Vec<UniformMember>,
}

/// Resolved texture unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureSlot {
    pub group: u32,
    pub texture_binding: u32,
    pub sampler_binding: u32,
}

/// One vertex attribute consumed by the vertex stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    pub location: u32,
    /// Number of `f32` components (1..=4).
    pub components: u32,
}

/// A vertex/fragment pair whose interface has been checked.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    label: String,
    vertex: CompiledShader,
    fragment: CompiledShader,
    attributes: Vec<AttributeInfo>,
    uniforms: Option<UniformBlockInfo>,
    texture: Option<(String, TextureSlot)>,
}

impl LinkedProgram {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex(&self) -> &CompiledShader {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledShader {
        &self.fragment
    }

    /// Vertex attributes, sorted by location.
    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn uniform_block(&self) -> Option<&UniformBlockInfo> {
        self.uniforms.as_ref()
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    pub fn attrib_location(&self, name: &str) -> Option<u32> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.location)
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms
            .as_ref()?
            .members
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.slot)
    }

    pub fn texture_location(&self, name: &str) -> Option<TextureSlot> {
        match &self.texture {
            Some((n, slot)) if n == name => Some(*slot),
            _ => None,
        }
    }
}

/// Links a vertex and a fragment shader into one program.
///
/// Failures are logged at ERROR before being returned.
pub fn link(
    label: &str,
    vertex: CompiledShader,
    fragment: CompiledShader,
) -> Result<LinkedProgram, LinkError> {
    link_inner(label, vertex, fragment).inspect_err(|err| {
        log::error!("could not link program `{label}`: {err}");
    })
}

fn link_inner(
    label: &str,
    vertex: CompiledShader,
    fragment: CompiledShader,
) -> Result<LinkedProgram, LinkError> {
    expect_stage(&vertex, ShaderStage::Vertex)?;
    expect_stage(&fragment, ShaderStage::Fragment)?;

    check_interface(&vertex, &fragment)?;

    let mut attributes = Vec::new();
    for input in inputs(&vertex) {
        let components = attribute_components(&input.inner).ok_or_else(|| {
            LinkError::UnsupportedAttribute {
                name: input.name.clone(),
            }
        })?;
        attributes.push(AttributeInfo {
            name: input.name,
            location: input.location,
            components,
        });
    }
    attributes.sort_by_key(|a| a.location);

    let vs = reflect_resources(vertex.module())?;
    let fs = reflect_resources(fragment.module())?;

    let uniforms = match (vs.uniforms, fs.uniforms) {
        (Some(a), Some(b)) if a != b => return Err(LinkError::UniformBlockMismatch),
        (a, b) => a.or(b),
    };

    let texture = vs.texture.or(fs.texture).map(|name| {
        (
            name,
            TextureSlot {
                group: TEXTURE_GROUP,
                texture_binding: TEXTURE_BINDING,
                sampler_binding: SAMPLER_BINDING,
            },
        )
    });

    Ok(LinkedProgram {
        label: label.to_string(),
        vertex,
        fragment,
        attributes,
        uniforms,
        texture,
    })
}

fn expect_stage(shader: &CompiledShader, expected: ShaderStage) -> Result<(), LinkError> {
    if shader.stage() == expected {
        Ok(())
    } else {
        Err(LinkError::StageMismatch {
            expected,
            found: shader.stage(),
        })
    }
}

/// Every fragment input must be written by the vertex stage with the same type.
fn check_interface(vertex: &CompiledShader, fragment: &CompiledShader) -> Result<(), LinkError> {
    let outputs = outputs(vertex);

    for input in inputs(fragment) {
        match outputs.iter().find(|o| o.location == input.location) {
            None => {
                return Err(LinkError::Interface {
                    location: input.location,
                    detail: format!("`{}` is not written by the vertex stage", input.name),
                });
            }
            Some(out) if out.inner != input.inner => {
                return Err(LinkError::Interface {
                    location: input.location,
                    detail: format!(
                        "`{}` does not match the type of vertex output `{}`",
                        input.name, out.name
                    ),
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

// ── stage interface ───────────────────────────────────────────────────────

struct Varying {
    name: String,
    location: u32,
    inner: TypeInner,
}

fn inputs(shader: &CompiledShader) -> Vec<Varying> {
    let mut out = Vec::new();
    for arg in &shader.entry().function.arguments {
        collect_varyings(
            shader.module(),
            arg.name.as_deref(),
            arg.ty,
            arg.binding.as_ref(),
            &mut out,
        );
    }
    out
}

fn outputs(shader: &CompiledShader) -> Vec<Varying> {
    let mut out = Vec::new();
    if let Some(result) = &shader.entry().function.result {
        collect_varyings(
            shader.module(),
            None,
            result.ty,
            result.binding.as_ref(),
            &mut out,
        );
    }
    out
}

fn collect_varyings(
    module: &naga::Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<Varying>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(Varying {
            name: name.unwrap_or_default().to_string(),
            location: *location,
            inner: module.types[ty].inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_varyings(module, m.name.as_deref(), m.ty, m.binding.as_ref(), out);
                }
            }
        }
    }
}

fn attribute_components(inner: &TypeInner) -> Option<u32> {
    match *inner {
        TypeInner::Scalar(s) if s == naga::Scalar::F32 => Some(1),
        TypeInner::Vector { size, scalar } if scalar == naga::Scalar::F32 => {
            Some(vector_len(size))
        }
        _ => None,
    }
}

fn vector_len(size: VectorSize) -> u32 {
    match size {
        VectorSize::Bi => 2,
        VectorSize::Tri => 3,
        VectorSize::Quad => 4,
    }
}

// ── resources ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Resources {
    uniforms: Option<UniformBlockInfo>,
    texture: Option<String>,
}

fn reflect_resources(module: &naga::Module) -> Result<Resources, LinkError> {
    let mut res = Resources::default();

    for (_, var) in module.global_variables.iter() {
        let name = var.name.clone().unwrap_or_default();
        let Some(rb) = var.binding.as_ref() else { continue };
        let inner = &module.types[var.ty].inner;

        let expected = match (var.space, inner) {
            (AddressSpace::Uniform, _) => (UNIFORM_GROUP, UNIFORM_BINDING),
            (AddressSpace::Handle, TypeInner::Image { .. }) => (TEXTURE_GROUP, TEXTURE_BINDING),
            (AddressSpace::Handle, TypeInner::Sampler { .. }) => (TEXTURE_GROUP, SAMPLER_BINDING),
            _ => {
                return Err(LinkError::UnsupportedBinding {
                    name,
                    group: rb.group,
                    binding: rb.binding,
                });
            }
        };

        if (rb.group, rb.binding) != expected {
            return Err(LinkError::UnsupportedBinding {
                name,
                group: rb.group,
                binding: rb.binding,
            });
        }

        match (var.space, inner) {
            (AddressSpace::Uniform, _) => {
                res.uniforms = Some(uniform_block(module, &name, var.ty));
            }
            (_, TypeInner::Image { .. }) => res.texture = Some(name),
            _ => {}
        }
    }

    Ok(res)
}

fn uniform_block(module: &naga::Module, name: &str, ty: Handle<Type>) -> UniformBlockInfo {
    let inner = &module.types[ty].inner;
    let size = inner.size(module.to_ctx());

    let members = match inner {
        TypeInner::Struct { members, .. } => members
            .iter()
            .map(|m| UniformMember {
                name: m.name.clone().unwrap_or_default(),
                slot: UniformSlot {
                    offset: m.offset,
                    kind: uniform_kind(&module.types[m.ty].inner),
                },
            })
            .collect(),
        // A bare `var<uniform> mvp: mat4x4<f32>` is addressed by the variable name.
        other => vec![UniformMember {
            name: name.to_string(),
            slot: UniformSlot {
                offset: 0,
                kind: uniform_kind(other),
            },
        }],
    };

    UniformBlockInfo { size, members }
}

fn uniform_kind(inner: &TypeInner) -> UniformKind {
    let f32 = naga::Scalar::F32;
    match *inner {
        TypeInner::Scalar(s) if s == f32 => UniformKind::Float,
        TypeInner::Vector { size, scalar } if scalar == f32 => match size {
            VectorSize::Bi => UniformKind::Vec2,
            VectorSize::Tri => UniformKind::Vec3,
            VectorSize::Quad => UniformKind::Vec4,
        },
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            scalar,
        } if scalar == f32 => UniformKind::Mat3,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar == f32 => UniformKind::Mat4,
        _ => UniformKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{compile, names, sources};

    fn build(vs: &'static str, fs: &'static str) -> Result<LinkedProgram, LinkError> {
        let vs = compile(ShaderStage::Vertex, vs).unwrap();
        let fs = compile(ShaderStage::Fragment, fs).unwrap();
        link("test", vs, fs)
    }

    fn builtin(src: &sources::ProgramSource) -> LinkedProgram {
        let vs = compile(ShaderStage::Vertex, src.vertex.clone()).unwrap();
        let fs = compile(ShaderStage::Fragment, src.fragment.clone()).unwrap();
        link(src.label, vs, fs).unwrap()
    }

    const PLAIN_VS: &str = r#"
struct Out {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> Out {
    var out: Out;
    out.clip = vec4<f32>(position, 1.0);
    out.uv = position.xy;
    return out;
}
"#;

    #[test]
    fn builtin_programs_link() {
        for src in sources::ALL {
            builtin(&src);
        }
    }

    #[test]
    fn lit_uniform_offsets_follow_wgsl_layout() {
        let p = builtin(&sources::PHONG);
        let slot = |n| p.uniform_location(n).unwrap();

        assert_eq!(slot(names::MVP), UniformSlot { offset: 0, kind: UniformKind::Mat4 });
        assert_eq!(slot(names::MV), UniformSlot { offset: 64, kind: UniformKind::Mat4 });
        assert_eq!(slot(names::VIEW), UniformSlot { offset: 128, kind: UniformKind::Mat4 });
        assert_eq!(
            slot(names::NORMAL_MATRIX),
            UniformSlot { offset: 192, kind: UniformKind::Mat3 }
        );
        assert_eq!(
            slot(names::LIGHT_POSITION),
            UniformSlot { offset: 240, kind: UniformKind::Vec3 }
        );
        assert_eq!(p.uniform_block().unwrap().size, 256);
    }

    #[test]
    fn textured_program_locations() {
        let p = builtin(&sources::TEXTURED);
        assert_eq!(p.attrib_location(names::POSITION), Some(0));
        assert_eq!(p.attrib_location(names::UV), Some(1));
        assert_eq!(p.attrib_location(names::NORMAL), None);
        assert_eq!(p.uniform_location(names::MV), None);
        assert!(p.texture_location(names::DIFFUSE_MAP).is_some());
        assert!(p.texture_location("other_map").is_none());

        let components: Vec<u32> = p.attributes().iter().map(|a| a.components).collect();
        assert_eq!(components, vec![3, 2]);
    }

    #[test]
    fn marker_program_has_no_texture() {
        let p = builtin(&sources::MARKER);
        assert!(!p.has_texture());
        assert_eq!(p.attributes().len(), 1);
    }

    #[test]
    fn swapped_stages_are_rejected() {
        let vs = compile(ShaderStage::Vertex, sources::TEXTURED.vertex).unwrap();
        let fs = compile(ShaderStage::Fragment, sources::TEXTURED.fragment).unwrap();
        let err = link("swapped", fs, vs).unwrap_err();
        assert_eq!(
            err,
            LinkError::StageMismatch {
                expected: ShaderStage::Vertex,
                found: ShaderStage::Fragment
            }
        );
    }

    #[test]
    fn unwritten_fragment_input_is_rejected() {
        let fs = r#"
@fragment
fn fs_main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> {
    return tint;
}
"#;
        let err = build(PLAIN_VS, fs).unwrap_err();
        assert!(matches!(err, LinkError::Interface { location: 3, .. }));
    }

    #[test]
    fn mismatched_varying_type_is_rejected() {
        let fs = r#"
@fragment
fn fs_main(@location(0) uv: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 1.0);
}
"#;
        let err = build(PLAIN_VS, fs).unwrap_err();
        assert!(matches!(err, LinkError::Interface { location: 0, .. }));
    }

    #[test]
    fn uniform_outside_group_zero_is_rejected() {
        let vs = r#"
@group(2) @binding(0) var<uniform> mvp: mat4x4<f32>;
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return mvp * vec4<f32>(position, 1.0);
}
"#;
        let fs = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = build(vs, fs).unwrap_err();
        assert_eq!(
            err,
            LinkError::UnsupportedBinding {
                name: "mvp".to_string(),
                group: 2,
                binding: 0
            }
        );
    }

    #[test]
    fn bare_uniform_is_addressed_by_variable_name() {
        let vs = r#"
@group(0) @binding(0) var<uniform> mvp: mat4x4<f32>;
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return mvp * vec4<f32>(position, 1.0);
}
"#;
        let fs = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let p = build(vs, fs).unwrap();
        assert_eq!(
            p.uniform_location("mvp"),
            Some(UniformSlot { offset: 0, kind: UniformKind::Mat4 })
        );
        assert_eq!(p.uniform_block().unwrap().size, 64);
    }

    #[test]
    fn disagreeing_uniform_blocks_are_rejected() {
        let vs = r#"
@group(0) @binding(0) var<uniform> mvp: mat4x4<f32>;
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return mvp * vec4<f32>(position, 1.0);
}
"#;
        let fs = r#"
@group(0) @binding(0) var<uniform> tint: vec4<f32>;
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return tint;
}
"#;
        assert_eq!(build(vs, fs).unwrap_err(), LinkError::UniformBlockMismatch);
    }
}
