//! Per-object transform math.
//!
//! Matrices are column-major `glam` types. Everything is recomputed from
//! scratch each frame; nothing here carries state between frames.

use glam::{Mat3, Mat4, Vec3};

/// Where an object sits this frame and how far it has turned.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    /// Radians.
    pub angle: f32,
    /// Rotation axis; normalized before use. A zero axis means no rotation.
    pub axis: Vec3,
}

impl Placement {
    /// `Translate(position) · Rotate(angle, axis)`.
    pub fn model(&self) -> Mat4 {
        let rotation = match self.axis.try_normalize() {
            Some(axis) => Mat4::from_axis_angle(axis, self.angle),
            None => Mat4::IDENTITY,
        };
        Mat4::from_translation(self.position) * rotation
    }
}

/// View and projection for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    eye: Vec3,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
}

impl Camera {
    /// Right-handed look-along camera; depth maps to `[0, 1]`.
    pub fn look(
        eye: Vec3,
        front: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let view = Mat4::look_to_rh(eye, front, up);
        let projection = Mat4::perspective_rh(fov_y, aspect, near, far);
        Self {
            eye,
            view,
            projection,
            view_projection: projection * view,
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// `P · V`.
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }
}

/// Matrices uploaded for one object draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ObjectTransform {
    pub model: Mat4,
    pub model_view: Mat4,
    pub mvp: Mat4,
    pub normal: Mat3,
}

impl ObjectTransform {
    pub fn compute(placement: &Placement, camera: &Camera) -> Self {
        let model = placement.model();
        Self {
            model,
            model_view: camera.view() * model,
            mvp: camera.view_projection() * model,
            normal: normal_matrix(&model),
        }
    }
}

/// `inverse(transpose(mat3(model)))`, or identity when the 3×3 block is singular.
///
/// Only an exactly zero (or non-finite) determinant counts as singular; small
/// scales are still invertible.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*model);
    let det = linear.determinant();
    if det == 0.0 || !det.is_finite() {
        return Mat3::IDENTITY;
    }
    let normal = linear.transpose().inverse();
    if !normal.is_finite() {
        return Mat3::IDENTITY;
    }
    normal
}
