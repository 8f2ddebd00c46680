//! Animated scenes.
//!
//! A [`SceneConfig`] describes what is drawn; a [`FrameLoop`] owns the
//! backend and the GPU resources and renders one frame per `step`.

mod animation;
mod config;
mod frame_loop;
mod layout;

pub use animation::{alpha_at, pulse_level_at, AnimationState, Pulse};
pub use config::{CameraRig, LightRig, SceneConfig, ShadingMode, MAX_OBJECTS};
pub use frame_loop::{FrameLoop, Renderer};
pub use layout::Layout;
