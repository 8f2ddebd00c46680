//! Colors shared by the scene and the backends.

pub mod color;

pub use color::Color;
