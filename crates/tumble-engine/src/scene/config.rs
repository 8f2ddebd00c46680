use std::f32::consts::TAU;

use glam::Vec3;

use crate::geometry::{cube, MeshData};
use crate::render::{ProgramRole, SetupError};
use crate::shader::sources::{self, ProgramSource};
use crate::texture::TextureImage;
use crate::transform::Camera;

use super::animation::Pulse;
use super::layout::Layout;

/// Upper bound on objects drawn per frame.
pub const MAX_OBJECTS: u32 = 1000;

/// Lighting model for the objects.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShadingMode {
    Unlit,
    Phong,
    Attenuated,
}

impl ShadingMode {
    fn source(self) -> ProgramSource {
        match self {
            ShadingMode::Unlit => sources::TEXTURED,
            ShadingMode::Phong => sources::PHONG,
            ShadingMode::Attenuated => sources::ATTENUATED,
        }
    }

    fn role(self) -> ProgramRole {
        match self {
            ShadingMode::Unlit => ProgramRole::Textured,
            ShadingMode::Phong | ShadingMode::Attenuated => ProgramRole::Lit,
        }
    }

    pub fn is_lit(self) -> bool {
        !matches!(self, ShadingMode::Unlit)
    }
}

/// Camera that dollies along its view axis with `alpha`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraRig {
    pub eye: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    /// Eye moves by `dolly · cos(alpha)` along Z.
    pub dolly: f32,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraRig {
    pub fn camera(&self, alpha: f32, aspect: f32) -> Camera {
        let eye = self.eye + Vec3::Z * (self.dolly * alpha.cos());
        Camera::look(eye, self.front, self.up, self.fov_y, aspect, self.near, self.far)
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            dolly: 4.0,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Point light orbiting `center` in the XZ plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightRig {
    pub center: Vec3,
    pub radius: f32,
    pub height: f32,
    /// Orbit angle per unit of `alpha`.
    pub speed: f32,
}

impl LightRig {
    pub fn position(&self, alpha: f32) -> Vec3 {
        let theta = alpha * self.speed;
        self.center + Vec3::new(self.radius * theta.cos(), self.height, self.radius * theta.sin())
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 8.0,
            height: 4.0,
            speed: 1.0,
        }
    }
}

/// Everything one animated scene needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub name: &'static str,
    pub object_count: u32,
    pub layout: Layout,

    pub alpha_start: f32,
    pub alpha_step: f32,
    pub pulse: Pulse,

    pub camera: CameraRig,
    pub light: LightRig,
    pub shading: ShadingMode,
    pub light_marker: bool,

    pub mesh: MeshData,
    pub texture: TextureImage,

    /// Replaces the built-in program for `shading`.
    pub object_source: Option<ProgramSource>,
    /// Replaces the built-in marker program.
    pub marker_source: Option<ProgramSource>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::single_cube()
    }
}

impl SceneConfig {
    /// One unlit cube, slow pulse.
    pub fn single_cube() -> Self {
        Self {
            name: "single cube",
            object_count: 1,
            layout: Layout::Single {
                axis: Vec3::new(1.0, 1.0, 1.0),
            },
            alpha_start: 0.0,
            alpha_step: 0.01,
            pulse: Pulse {
                step: 0.0008,
                cap: 0.4,
            },
            camera: CameraRig::default(),
            light: LightRig::default(),
            shading: ShadingMode::Unlit,
            light_marker: false,
            mesh: cube::CUBE,
            texture: TextureImage::warm_quad(),
            object_source: None,
            marker_source: None,
        }
    }

    /// A thousand Phong-lit cubes on a spiral.
    pub fn swarm() -> Self {
        Self {
            name: "swarm",
            object_count: MAX_OBJECTS,
            layout: Layout::Spiral {
                radius: 1.5,
                growth: 0.03,
                twist: 0.35,
                depth: 0.08,
            },
            alpha_step: 0.005,
            pulse: Pulse {
                step: 0.0006,
                cap: 0.3,
            },
            camera: CameraRig {
                eye: Vec3::new(0.0, 0.0, 40.0),
                dolly: 8.0,
                ..CameraRig::default()
            },
            light: LightRig {
                radius: 14.0,
                height: 6.0,
                ..LightRig::default()
            },
            shading: ShadingMode::Phong,
            texture: TextureImage::tiles(),
            ..Self::single_cube()
        }
    }

    /// Forty cubes on a wavy ring, attenuated light with a visible marker.
    pub fn lit_ring() -> Self {
        Self {
            name: "lit ring",
            object_count: 40,
            layout: Layout::Ring {
                radius: 6.0,
                spacing: TAU / 40.0,
                height: 1.0,
            },
            alpha_step: 0.005,
            pulse: Pulse {
                step: 0.0007,
                cap: 0.35,
            },
            camera: CameraRig {
                eye: Vec3::new(0.0, 7.0, 18.0),
                front: Vec3::new(0.0, -7.0, -18.0),
                dolly: 3.0,
                ..CameraRig::default()
            },
            light: LightRig {
                radius: 3.0,
                height: 1.5,
                speed: 2.0,
                ..LightRig::default()
            },
            shading: ShadingMode::Attenuated,
            light_marker: true,
            texture: TextureImage::tiles(),
            ..Self::single_cube()
        }
    }

    /// Object program and the role its locations are resolved for.
    pub fn object_program(&self) -> (ProgramRole, ProgramSource) {
        let source = self
            .object_source
            .clone()
            .unwrap_or_else(|| self.shading.source());
        (self.shading.role(), source)
    }

    /// Marker program, when the scene shows one.
    pub fn marker_program(&self) -> Option<ProgramSource> {
        if !self.light_marker {
            return None;
        }
        Some(self.marker_source.clone().unwrap_or(sources::MARKER))
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        let fail = |msg: String| Err(SetupError::Config(msg));

        if self.object_count > MAX_OBJECTS {
            return fail(format!(
                "{} objects requested, at most {MAX_OBJECTS} are supported",
                self.object_count
            ));
        }
        if !self.alpha_start.is_finite() || !self.alpha_step.is_finite() {
            return fail("alpha start and step must be finite".to_string());
        }
        let Pulse { step, cap } = self.pulse;
        if step.is_nan() || step <= 0.0 || !(0.0..=1.0).contains(&cap) || step > cap {
            return fail(format!(
                "pulse step must be positive and at most the cap, cap within [0, 1], \
                 got step {step} cap {cap}"
            ));
        }
        let ramp = cap / step;
        if (ramp - ramp.round()).abs() > 1e-3 {
            return fail(format!(
                "pulse cap {cap} is not a whole number of {step} steps; the rise would be uneven"
            ));
        }

        let cam = &self.camera;
        if !(cam.fov_y > 0.0 && cam.fov_y < std::f32::consts::PI) {
            return fail(format!("field of view {} rad is out of range", cam.fov_y));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return fail(format!("clip range {}..{} is invalid", cam.near, cam.far));
        }
        if cam.front.length_squared() == 0.0 || cam.up.length_squared() == 0.0 {
            return fail("camera front and up must be non-zero".to_string());
        }

        if self.light_marker && !self.shading.is_lit() {
            return fail("a light marker needs a lit shading mode".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for config in [
            SceneConfig::single_cube(),
            SceneConfig::swarm(),
            SceneConfig::lit_ring(),
        ] {
            config.validate().unwrap();
        }
    }

    #[test]
    fn presets_match_their_shape() {
        let single = SceneConfig::single_cube();
        assert_eq!(single.object_count, 1);
        assert_eq!(single.shading, ShadingMode::Unlit);
        assert_eq!(single.alpha_step, 0.01);
        assert_eq!(single.pulse.cap, 0.4);

        let swarm = SceneConfig::swarm();
        assert_eq!(swarm.object_count, 1000);
        assert_eq!(swarm.shading, ShadingMode::Phong);
        assert!(!swarm.light_marker);

        let ring = SceneConfig::lit_ring();
        assert_eq!(ring.object_count, 40);
        assert_eq!(ring.shading, ShadingMode::Attenuated);
        assert!(ring.marker_program().is_some());
    }

    #[test]
    fn too_many_objects_is_rejected() {
        let config = SceneConfig {
            object_count: MAX_OBJECTS + 1,
            ..SceneConfig::swarm()
        };
        assert!(matches!(config.validate(), Err(SetupError::Config(_))));
    }

    #[test]
    fn marker_on_unlit_scene_is_rejected() {
        let config = SceneConfig {
            light_marker: true,
            ..SceneConfig::single_cube()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn pulse_step_above_cap_is_rejected() {
        let config = SceneConfig {
            pulse: Pulse {
                step: 0.25,
                cap: 0.1,
            },
            ..SceneConfig::single_cube()
        };
        assert!(matches!(config.validate(), Err(SetupError::Config(_))));
    }

    #[test]
    fn uneven_pulse_ramp_is_rejected() {
        let config = SceneConfig {
            pulse: Pulse {
                step: 0.25,
                cap: 0.4,
            },
            ..SceneConfig::single_cube()
        };
        assert!(config.validate().is_err());

        let even = SceneConfig {
            pulse: Pulse {
                step: 0.1,
                cap: 0.4,
            },
            ..SceneConfig::single_cube()
        };
        assert!(even.validate().is_ok());
    }

    #[test]
    fn nan_pulse_step_is_rejected() {
        let mut config = SceneConfig::single_cube();
        config.pulse.step = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_clip_range_is_rejected() {
        let mut config = SceneConfig::single_cube();
        config.camera.near = 10.0;
        config.camera.far = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn source_override_wins() {
        let custom = ProgramSource::new("custom", "a", "b");
        let config = SceneConfig {
            object_source: Some(custom.clone()),
            ..SceneConfig::swarm()
        };
        assert_eq!(config.object_program(), (ProgramRole::Lit, custom));
    }

    #[test]
    fn camera_dollies_with_alpha() {
        let rig = CameraRig::default();
        assert_eq!(rig.camera(0.0, 1.0).eye(), Vec3::new(0.0, 0.0, 14.0));
        let half_turn = rig.camera(std::f32::consts::PI, 1.0).eye();
        assert!((half_turn.z - 6.0).abs() < 1e-5);
    }

    #[test]
    fn light_orbits_center() {
        let light = LightRig {
            center: Vec3::new(1.0, 0.0, 0.0),
            radius: 2.0,
            height: 3.0,
            speed: 1.0,
        };
        let p = light.position(0.0);
        assert_eq!(p, Vec3::new(3.0, 3.0, 0.0));
    }
}
