use glam::Vec2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Add,
    Multiply,
    Lerp,
    Override,
}

/// Visual offset produced by an effect for one frame.
///
/// Deltas never touch the layout state of a node; they are folded together
/// per node and applied on top of the laid-out transform when rendering (and
/// when measuring, for nodes that opt into effects affecting layout).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformDelta {
    pub position_offset: Vec2,
    pub scale: f32,
    pub rotation: f32,
    pub alpha: f32,
}

impl Default for TransformDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformDelta {
    pub const IDENTITY: Self = Self {
        position_offset: Vec2::ZERO,
        scale: 1.0,
        rotation: 0.0,
        alpha: 1.0,
    };

    pub const fn new(position_offset: Vec2, scale: f32, rotation: f32, alpha: f32) -> Self {
        Self {
            position_offset,
            scale,
            rotation,
            alpha,
        }
    }

    pub const fn offset(offset: Vec2) -> Self {
        Self {
            position_offset: offset,
            ..Self::IDENTITY
        }
    }

    pub const fn scaled(scale: f32) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    pub const fn rotated(degrees: f32) -> Self {
        Self {
            rotation: degrees,
            ..Self::IDENTITY
        }
    }

    pub const fn faded(alpha: f32) -> Self {
        Self {
            alpha,
            ..Self::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            position_offset: self.position_offset.lerp(other.position_offset, t),
            scale: lerp(self.scale, other.scale, t),
            rotation: lerp(self.rotation, other.rotation, t),
            alpha: lerp(self.alpha, other.alpha, t),
        }
    }

    /// Folds `other` into `self`.
    ///
    /// `weight` is the interpolation factor for [`BlendMode::Lerp`]. For
    /// `Add` and `Multiply` it scales how far `other` deviates from identity
    /// before it is folded in, so a weight of `1.0` applies it in full.
    /// `Override` ignores the weight.
    pub fn combine(self, other: Self, mode: BlendMode, weight: f32) -> Self {
        let weight = weight.clamp(0.0, 1.0);
        match mode {
            BlendMode::Add => {
                let other = Self::IDENTITY.lerp(other, weight);
                Self {
                    position_offset: self.position_offset + other.position_offset,
                    scale: self.scale + other.scale - 1.0,
                    rotation: self.rotation + other.rotation,
                    alpha: self.alpha * other.alpha,
                }
            }
            BlendMode::Multiply => {
                let other = Self::IDENTITY.lerp(other, weight);
                Self {
                    position_offset: self.position_offset + other.position_offset,
                    scale: self.scale * other.scale,
                    rotation: self.rotation + other.rotation,
                    alpha: self.alpha * other.alpha,
                }
            }
            BlendMode::Lerp => self.lerp(other, weight),
            BlendMode::Override => other,
        }
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-5
    }

    #[test]
    fn add_sums_scale_deviation_from_baseline() {
        let a = TransformDelta::scaled(1.2);
        let b = TransformDelta::scaled(0.9);
        let combined = a.combine(b, BlendMode::Add, 1.0);
        assert!(approx_eq(combined.scale, 1.1));

        let neutral = TransformDelta::IDENTITY.combine(TransformDelta::IDENTITY, BlendMode::Add, 1.0);
        assert_eq!(neutral, TransformDelta::IDENTITY);
    }

    #[test]
    fn add_multiplies_alpha_and_adds_rotation_and_offset() {
        let a = TransformDelta::new(Vec2::new(2.0, 3.0), 1.0, 10.0, 0.5);
        let b = TransformDelta::new(Vec2::new(-1.0, 1.0), 1.0, 5.0, 0.5);
        let combined = a.combine(b, BlendMode::Add, 1.0);
        assert_eq!(combined.position_offset, Vec2::new(1.0, 4.0));
        assert!(approx_eq(combined.rotation, 15.0));
        assert!(approx_eq(combined.alpha, 0.25));
    }

    #[test]
    fn multiply_multiplies_scale_and_alpha() {
        let a = TransformDelta::new(Vec2::X, 1.5, 30.0, 0.8);
        let b = TransformDelta::new(Vec2::Y, 2.0, -10.0, 0.5);
        let combined = a.combine(b, BlendMode::Multiply, 1.0);
        assert_eq!(combined.position_offset, Vec2::new(1.0, 1.0));
        assert!(approx_eq(combined.scale, 3.0));
        assert!(approx_eq(combined.rotation, 20.0));
        assert!(approx_eq(combined.alpha, 0.4));
    }

    #[test]
    fn lerp_moves_every_component_by_weight() {
        let a = TransformDelta::new(Vec2::ZERO, 1.0, 0.0, 1.0);
        let b = TransformDelta::new(Vec2::new(10.0, 20.0), 2.0, 90.0, 0.0);
        let combined = a.combine(b, BlendMode::Lerp, 0.25);
        assert_eq!(combined.position_offset, Vec2::new(2.5, 5.0));
        assert!(approx_eq(combined.scale, 1.25));
        assert!(approx_eq(combined.rotation, 22.5));
        assert!(approx_eq(combined.alpha, 0.75));
    }

    #[test]
    fn override_discards_previous_total() {
        let a = TransformDelta::new(Vec2::new(5.0, 5.0), 3.0, 45.0, 0.1);
        let b = TransformDelta::scaled(0.5);
        assert_eq!(a.combine(b, BlendMode::Override, 0.2), b);
    }

    #[test]
    fn weight_scales_deviation_for_add_and_multiply() {
        let b = TransformDelta::scaled(2.0);
        let added = TransformDelta::IDENTITY.combine(b, BlendMode::Add, 0.5);
        let multiplied = TransformDelta::IDENTITY.combine(b, BlendMode::Multiply, 0.5);
        assert!(approx_eq(added.scale, 1.5));
        assert!(approx_eq(multiplied.scale, 1.5));

        let muted = TransformDelta::IDENTITY.combine(b, BlendMode::Multiply, 0.0);
        assert_eq!(muted, TransformDelta::IDENTITY);
    }
}
