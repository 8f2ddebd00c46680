use glam::Vec3;

use crate::geometry::MeshBuffer;
use crate::paint::Color;
use crate::render::{dispatch, Backend, FrameUniforms, Program, ProgramRole, SetupError};
use crate::transform::{ObjectTransform, Placement};

use super::animation::AnimationState;
use super::config::SceneConfig;

/// GPU resources for one scene. Everything is released when this is dropped.
pub struct Renderer<B: Backend> {
    object_program: Program<B>,
    marker_program: Option<Program<B>>,
    mesh: MeshBuffer<B>,
    texture: B::Texture,
}

impl<B: Backend> Renderer<B> {
    /// Builds every program and uploads the mesh and texture.
    ///
    /// On error nothing built so far survives.
    pub fn new(backend: &mut B, config: &SceneConfig) -> Result<Self, SetupError> {
        config.validate()?;

        let image = &config.texture;
        if !image.texel_count_matches() {
            return Err(SetupError::Texture {
                label: image.label,
                expected: image.expected_len(),
                found: image.texel_len(),
            });
        }

        let (role, source) = config.object_program();
        let object_program = Program::build(backend, role, &source)?;
        check_gpu(backend, "create object program");

        let marker_program = match config.marker_program() {
            Some(source) => {
                let marker = Program::build(backend, ProgramRole::Marker, &source)?;
                check_gpu(backend, "create marker program");
                Some(marker)
            }
            None => None,
        };

        let programs = std::iter::once(&object_program).chain(marker_program.as_ref());
        for program in programs {
            for slot in &program.locations().attributes {
                if config.mesh.array(slot.attribute).is_none() {
                    return Err(SetupError::Config(format!(
                        "program `{}` reads {}, which mesh `{}` does not provide",
                        program.label(),
                        slot.attribute.name(),
                        config.mesh.label
                    )));
                }
            }
        }

        let mesh = MeshBuffer::upload(backend, &config.mesh);
        check_gpu(backend, "upload mesh");
        let texture = backend.create_texture(image);
        check_gpu(backend, "create texture");

        Ok(Self {
            object_program,
            marker_program,
            mesh,
            texture,
        })
    }
}

/// Drives one scene: one-time setup, then one full render per `step`.
pub struct FrameLoop<B: Backend> {
    backend: B,
    config: SceneConfig,
    renderer: Option<Renderer<B>>,
    animation: AnimationState,
    width: u32,
    height: u32,
    warned_uninit: bool,
}

impl<B: Backend> FrameLoop<B> {
    pub fn new(backend: B, config: SceneConfig) -> Self {
        let animation = AnimationState::new(config.alpha_start, config.alpha_step, config.pulse);
        Self {
            backend,
            config,
            renderer: None,
            animation,
            width: 1,
            height: 1,
            warned_uninit: false,
        }
    }

    /// One-time setup. Returns `false` if any program, texture or
    /// configuration check fails; the cause is logged.
    pub fn init(&mut self, width: u32, height: u32) -> bool {
        let info = self.backend.info();
        log::info!("Version = {}", info.version);
        log::info!("Vendor = {}", info.vendor);
        log::info!("Renderer = {}", info.renderer);
        log::info!("Extensions = {}", info.extensions);
        log::info!("setup scene `{}` at {width}x{height}", self.config.name);

        self.renderer = None;
        match Renderer::new(&mut self.backend, &self.config) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                self.resize(width, height);
                true
            }
            Err(err) => {
                log::error!("scene `{}` setup failed: {err}", self.config.name);
                false
            }
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        if self.renderer.is_some() {
            self.backend.set_viewport(self.width, self.height);
            check_gpu(&mut self.backend, "set viewport");
        }
    }

    /// Advances one frame and issues one complete render.
    pub fn step(&mut self) {
        let Some(renderer) = self.renderer.as_ref() else {
            if !self.warned_uninit {
                log::warn!("step called before a successful init; nothing drawn");
                self.warned_uninit = true;
            }
            return;
        };
        let backend = &mut self.backend;
        let config = &self.config;

        self.animation.advance_pulse();
        backend.clear(Color::grey(self.animation.grey()));
        check_gpu(backend, "clear");

        let alpha = self.animation.alpha();
        let aspect = self.width as f32 / self.height as f32;
        let camera = config.camera.camera(alpha, aspect);
        let light_position = config.light.position(alpha);
        let frame = FrameUniforms {
            view: camera.view(),
            light_position,
        };

        for index in 0..config.object_count {
            let placement = config.layout.placement(index, alpha);
            let transform = ObjectTransform::compute(&placement, &camera);
            dispatch(
                backend,
                &renderer.object_program,
                &renderer.mesh,
                Some(&renderer.texture),
                &transform,
                &frame,
            );
            check_gpu(backend, "draw object");
        }

        if let Some(marker) = &renderer.marker_program {
            let placement = Placement {
                position: light_position,
                angle: alpha,
                axis: Vec3::Y,
            };
            let transform = ObjectTransform::compute(&placement, &camera);
            dispatch(backend, marker, &renderer.mesh, None, &transform, &frame);
            check_gpu(backend, "draw marker");
        }

        self.animation.advance_alpha();
    }

    pub fn is_initialized(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Logs a GPU error raised by `op`. Debug builds only.
fn check_gpu<B: Backend>(backend: &mut B, op: &str) {
    if !cfg!(debug_assertions) {
        return;
    }
    if let Some(err) = backend.check_error(op) {
        log::info!("after {op}() glError ({err})");
    }
}
