use glam::Vec3;

use crate::transform::Placement;

/// Rotation axes handed out in turn by the multi-object layouts.
const AXES: [Vec3; 5] = [
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(0.0, 1.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
];

/// How objects are arranged. Every object `i` turns by `(i + 1) · alpha`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Layout {
    /// One object at the origin.
    Single { axis: Vec3 },
    /// Object `i` at `i · spacing`.
    Line { spacing: Vec3, axis: Vec3 },
    /// Widening spiral receding into the screen.
    Spiral {
        radius: f32,
        growth: f32,
        twist: f32,
        depth: f32,
    },
    /// Wavy ring around the Y axis.
    Ring {
        radius: f32,
        spacing: f32,
        height: f32,
    },
}

impl Layout {
    pub fn placement(&self, index: u32, alpha: f32) -> Placement {
        let i = index as f32;
        let angle = (i + 1.0) * alpha;
        let cycled = AXES[index as usize % AXES.len()];

        match *self {
            Layout::Single { axis } => Placement {
                position: Vec3::ZERO,
                angle,
                axis,
            },
            Layout::Line { spacing, axis } => Placement {
                position: spacing * i,
                angle,
                axis,
            },
            Layout::Spiral {
                radius,
                growth,
                twist,
                depth,
            } => {
                let theta = i * twist + alpha;
                let r = radius + i * growth;
                Placement {
                    position: Vec3::new(r * theta.cos(), r * theta.sin(), -i * depth),
                    angle,
                    axis: cycled,
                }
            }
            Layout::Ring {
                radius,
                spacing,
                height,
            } => {
                let theta = i * spacing + alpha;
                Placement {
                    position: Vec3::new(
                        radius * theta.cos(),
                        height * (theta * 3.0).sin(),
                        radius * theta.sin(),
                    ),
                    angle,
                    axis: cycled,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_scales_with_index() {
        let layout = Layout::Single { axis: Vec3::X };
        assert_eq!(layout.placement(0, 0.1).angle, 0.1);
        assert!((layout.placement(4, 0.1).angle - 0.5).abs() < 1e-6);
    }

    #[test]
    fn line_spaces_objects_evenly() {
        let layout = Layout::Line {
            spacing: Vec3::new(1.0, 0.0, -3.0),
            axis: Vec3::Y,
        };
        let p = layout.placement(2, 0.3);
        assert_eq!(p.position, Vec3::new(2.0, 0.0, -6.0));
        assert_eq!(p.axis, Vec3::Y);
    }

    #[test]
    fn ring_stays_on_its_radius() {
        let layout = Layout::Ring {
            radius: 6.0,
            spacing: 0.2,
            height: 1.0,
        };
        for i in 0..40 {
            let p = layout.placement(i, 0.7).position;
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert!((r - 6.0).abs() < 1e-4);
            assert!(p.y.abs() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn spiral_recedes_and_cycles_axes() {
        let layout = Layout::Spiral {
            radius: 1.0,
            growth: 0.1,
            twist: 0.5,
            depth: 0.2,
        };
        let p0 = layout.placement(0, 0.0);
        let p5 = layout.placement(5, 0.0);
        assert_eq!(p0.position, Vec3::new(1.0, 0.0, 0.0));
        assert!((p5.position.z + 1.0).abs() < 1e-6);
        assert_eq!(p0.axis, p5.axis);
        assert_ne!(p0.axis, layout.placement(1, 0.0).axis);
    }

    #[test]
    fn placement_is_pure() {
        let layout = Layout::Ring {
            radius: 2.0,
            spacing: 0.4,
            height: 0.5,
        };
        assert_eq!(layout.placement(7, 1.25), layout.placement(7, 1.25));
    }
}
