//! Built-in WGSL programs.

use std::borrow::Cow;

/// Vertex + fragment source pair for one program.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ProgramSource {
    pub fn new(
        label: &'static str,
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            label,
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

const TEXTURED_VS: &str = r#"
struct Uniforms {
    mvp: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOut {
    var out: VertexOut;
    out.clip = u.mvp * vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}
"#;

const TEXTURED_FS: &str = r#"
@group(1) @binding(0) var diffuse_map: texture_2d<f32>;
@group(1) @binding(1) var diffuse_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(diffuse_map, diffuse_sampler, uv);
}
"#;

// Lighting happens in eye space. Normals go to world space through the
// normal matrix, then to eye space through the (rigid) view matrix.
const LIT_VS: &str = r#"
struct Uniforms {
    mvp: mat4x4<f32>,
    mv: mat4x4<f32>,
    view: mat4x4<f32>,
    normal_matrix: mat3x3<f32>,
    light_position: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) normal_eye: vec3<f32>,
    @location(2) eye_dir: vec3<f32>,
    @location(3) light_dir: vec3<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
) -> VertexOut {
    var out: VertexOut;
    let p = vec4<f32>(position, 1.0);
    out.clip = u.mvp * p;
    out.uv = uv;

    let p_eye = (u.mv * p).xyz;
    let light_eye = (u.view * vec4<f32>(u.light_position, 1.0)).xyz;
    out.eye_dir = -p_eye;
    out.light_dir = light_eye - p_eye;
    out.normal_eye = (u.view * vec4<f32>(u.normal_matrix * normal, 0.0)).xyz;
    return out;
}
"#;

const PHONG_FS: &str = r#"
@group(1) @binding(0) var diffuse_map: texture_2d<f32>;
@group(1) @binding(1) var diffuse_sampler: sampler;

const AMBIENT: f32 = 0.15;
const SHININESS: f32 = 16.0;
const SPECULAR: f32 = 0.3;

@fragment
fn fs_main(
    @location(0) uv: vec2<f32>,
    @location(1) normal_eye: vec3<f32>,
    @location(2) eye_dir: vec3<f32>,
    @location(3) light_dir: vec3<f32>,
) -> @location(0) vec4<f32> {
    let base = textureSample(diffuse_map, diffuse_sampler, uv).rgb;
    let n = normalize(normal_eye);
    let l = normalize(light_dir);
    let e = normalize(eye_dir);

    let diffuse = max(dot(n, l), 0.0);
    let specular = pow(max(dot(e, reflect(-l, n)), 0.0), SHININESS);
    return vec4<f32>(base * (AMBIENT + diffuse) + vec3<f32>(specular * SPECULAR), 1.0);
}
"#;

const ATTENUATED_FS: &str = r#"
@group(1) @binding(0) var diffuse_map: texture_2d<f32>;
@group(1) @binding(1) var diffuse_sampler: sampler;

const AMBIENT: f32 = 0.08;
const SHININESS: f32 = 32.0;
const SPECULAR: f32 = 0.5;
const LIGHT_POWER: f32 = 24.0;

@fragment
fn fs_main(
    @location(0) uv: vec2<f32>,
    @location(1) normal_eye: vec3<f32>,
    @location(2) eye_dir: vec3<f32>,
    @location(3) light_dir: vec3<f32>,
) -> @location(0) vec4<f32> {
    let base = textureSample(diffuse_map, diffuse_sampler, uv).rgb;
    let n = normalize(normal_eye);
    let l = normalize(light_dir);
    let e = normalize(eye_dir);

    let distance = length(light_dir);
    let falloff = LIGHT_POWER / (1.0 + distance * distance);
    let diffuse = max(dot(n, l), 0.0) * falloff;
    let specular = pow(max(dot(e, reflect(-l, n)), 0.0), SHININESS) * falloff;
    return vec4<f32>(base * (AMBIENT + diffuse) + vec3<f32>(specular * SPECULAR), 1.0);
}
"#;

const MARKER_VS: &str = r#"
struct Uniforms {
    mvp: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u.mvp * vec4<f32>(position * 0.2, 1.0);
}
"#;

const MARKER_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.95, 0.7, 1.0);
}
"#;

/// Unlit, textured.
pub const TEXTURED: ProgramSource = ProgramSource {
    label: "textured",
    vertex: Cow::Borrowed(TEXTURED_VS),
    fragment: Cow::Borrowed(TEXTURED_FS),
};

/// Textured, single point light, Phong.
pub const PHONG: ProgramSource = ProgramSource {
    label: "phong",
    vertex: Cow::Borrowed(LIT_VS),
    fragment: Cow::Borrowed(PHONG_FS),
};

/// Textured, single point light with distance falloff.
pub const ATTENUATED: ProgramSource = ProgramSource {
    label: "attenuated phong",
    vertex: Cow::Borrowed(LIT_VS),
    fragment: Cow::Borrowed(ATTENUATED_FS),
};

/// Solid-colour light marker.
pub const MARKER: ProgramSource = ProgramSource {
    label: "light marker",
    vertex: Cow::Borrowed(MARKER_VS),
    fragment: Cow::Borrowed(MARKER_FS),
};

pub const ALL: [ProgramSource; 4] = [TEXTURED, PHONG, ATTENUATED, MARKER];
