// Core ECS components for the scene
// Fish are the only entities; particles live in their own pool (see particles.rs)

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

/// Position and facing of an entity in 3D space.
/// Rotation is kept separate from velocity so a near-stationary fish
/// holds its last heading instead of flickering.
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Velocity of an entity in world units per tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct Velocity {
    pub linear: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3) -> Self {
        Self { linear }
    }
}

/// RGB body color, assigned once at spawn and constant thereafter.
#[derive(Component, Debug, Clone, Copy)]
pub struct BodyColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl BodyColor {
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// HSL → RGB. The scene assigns each fish HSL(random, 0.7, 0.6).
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = h * 6.0;
        let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        Self {
            r: r1 + m,
            g: g1 + m,
            b: b1 + m,
        }
    }
}

/// Stable fish identity, assigned once at batch creation, never reused.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FishId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primaries_convert_exactly() {
        let red = BodyColor::from_hsl(0.0, 1.0, 0.5);
        assert!((red.r - 1.0).abs() < 1e-6);
        assert!(red.g.abs() < 1e-6);
        assert!(red.b.abs() < 1e-6);

        let green = BodyColor::from_hsl(1.0 / 3.0, 1.0, 0.5);
        assert!(green.r.abs() < 1e-5);
        assert!((green.g - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hsl_fish_palette_stays_in_unit_range() {
        for i in 0..32 {
            let c = BodyColor::from_hsl(i as f32 / 32.0, 0.7, 0.6);
            for v in [c.r, c.g, c.b] {
                assert!((0.0..=1.0).contains(&v), "channel out of range: {v}");
            }
        }
    }
}
