//! Tumble engine crate.
//!
//! Animated, textured and lit cubes on top of wgpu. The scene layer
//! ([`scene::FrameLoop`]) is written against [`render::Backend`], so everything
//! above the GPU can be exercised without a device.

pub mod core;
pub mod device;
pub mod geometry;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod shader;
pub mod texture;
pub mod transform;
pub mod window;
