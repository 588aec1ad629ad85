// Scene tuning constants gathered in one struct.
// Defaults reproduce the reference scene; a handful of knobs can be
// overridden from the environment (FISHPOND_* variables) without recompiling.

use std::path::PathBuf;

pub struct SceneConfig {
    /// Number of fish spawned in one batch at startup.
    pub fish_count: usize,
    /// Uniform scale applied to the fish model.
    pub fish_scale: f32,
    /// Optional OBJ model for the fish body. `None` = procedural mesh.
    /// If set but unloadable, the scene runs with no fish at all.
    pub fish_model: Option<PathBuf>,

    // Flocking radii (world units). Squared comparisons on the filter path.
    pub separation_radius: f32,
    pub alignment_radius: f32,
    pub cohesion_radius: f32,
    pub pointer_radius: f32,

    // Steering gains. Separation dominates to keep the flock loose.
    pub separation_gain: f32,
    pub alignment_gain: f32,
    pub cohesion_gain: f32,
    pub pointer_gain: f32,

    /// Per-axis jitter half-range: velocity gets ±(x, y, z) uniform noise per tick.
    pub jitter: (f32, f32, f32),
    pub max_speed: f32,
    pub min_speed: f32,
    /// Velocity decay per tick, slightly below 1 to bound jitter accumulation.
    pub damping: f32,
    /// Inelastic wall bounce: velocity component scale on boundary crossing.
    pub bounce: f32,
    /// Depth range: fish z stays within ±depth_half.
    pub depth_half: f32,
    /// Fish faster than this may shed particles...
    pub trail_speed_threshold: f32,
    /// ...with this probability per fish per tick.
    pub trail_probability: f64,

    pub particle_capacity: usize,
    pub star_count: usize,

    /// Background clear color (premultiplied RGBA).
    pub clear_color: wgpu::Color,

    pub window_width: u32,
    pub window_height: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fish_count: 16,
            fish_scale: 100.0,
            fish_model: None,

            separation_radius: 30.0,
            alignment_radius: 60.0,
            cohesion_radius: 80.0,
            pointer_radius: 150.0,

            separation_gain: 1.2,
            alignment_gain: 0.15,
            cohesion_gain: 0.03,
            pointer_gain: 0.3,

            jitter: (0.0075, 0.0075, 0.004),
            max_speed: 5.0,
            min_speed: 0.8,
            damping: 0.999,
            bounce: -0.8,
            depth_half: 100.0,
            trail_speed_threshold: 1.0,
            trail_probability: 0.4,

            particle_capacity: 500,
            star_count: 80,

            clear_color: wgpu::Color {
                r: 0.01,
                g: 0.01,
                b: 0.03,
                a: 1.0,
            },

            window_width: 1280,
            window_height: 720,
        }
    }
}

impl SceneConfig {
    /// Defaults with environment overrides applied.
    /// Unparseable values are ignored rather than fatal.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(n) = env_usize("FISHPOND_FISH_COUNT") {
            cfg.fish_count = n;
        }
        if let Some(n) = env_usize("FISHPOND_STAR_COUNT") {
            cfg.star_count = n;
        }
        if let Ok(path) = std::env::var("FISHPOND_FISH_OBJ") {
            if !path.is_empty() {
                cfg.fish_model = Some(PathBuf::from(path));
            }
        }

        cfg
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_scene() {
        let cfg = SceneConfig::default();
        assert_eq!(cfg.fish_count, 16);
        assert_eq!(cfg.particle_capacity, 500);
        assert_eq!(cfg.star_count, 80);
        assert!(cfg.separation_radius < cfg.alignment_radius);
        assert!(cfg.alignment_radius < cfg.cohesion_radius);
        assert!(cfg.cohesion_radius < cfg.pointer_radius);
        assert!(cfg.separation_gain > cfg.alignment_gain);
        assert!(cfg.alignment_gain > cfg.cohesion_gain);
        assert!(cfg.damping < 1.0 && cfg.damping > 0.99);
        assert!(cfg.bounce > -1.0 && cfg.bounce < 0.0);
    }
}
