// Flocking step for the fish.
//
// Each tick reads a read-only snapshot of every fish from the ECS, computes
// the four steering contributions (separation, alignment, cohesion, pointer
// attraction) pairwise against the snapshot, then writes velocity, position
// and facing back through the entities. Snapshot-then-writeback keeps the
// step order-independent and deterministic for a fixed RNG stream.
//
// n = 16 fish, so the O(n²) pairwise pass costs nothing; no spatial index.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use rand::Rng;

use super::components::{BodyColor, FishId, Transform, Velocity};
use super::config::SceneConfig;
use super::mesh::SceneInstance;
use super::particles::ParticlePool;

/// Below this speed the facing is left alone — re-aiming a near-stationary
/// fish every tick just makes it flicker.
const ORIENT_SPEED_EPSILON: f32 = 0.01;

/// Spawn clusters: three loose groups so flocking starts from an already
/// social arrangement instead of a uniform cloud.
const CLUSTER_CENTERS: [Vec3; 3] = [
    Vec3::new(-150.0, -100.0, 0.0),
    Vec3::new(100.0, 50.0, 20.0),
    Vec3::new(0.0, -150.0, -30.0),
];

// ============================================================================
// WORLD BOUNDS
// ============================================================================

/// Axis-aligned reflecting walls: ±half_width, ±half_height, ±depth_half.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub half_width: f32,
    pub half_height: f32,
    pub depth_half: f32,
}

impl Bounds {
    pub fn from_viewport(width: u32, height: u32, depth_half: f32) -> Self {
        Self {
            half_width: width as f32 / 2.0,
            half_height: height as f32 / 2.0,
            depth_half,
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x.abs() <= self.half_width
            && p.y.abs() <= self.half_height
            && p.z.abs() <= self.depth_half
    }
}

// ============================================================================
// SPAWN
// ============================================================================

/// Create the fixed fish batch: ids 0..n, distributed over the three
/// clusters (six per cluster) with jittered positions and cluster-biased
/// starting velocities. Runs once at mount; fish persist for the scene.
pub fn spawn_fish<R: Rng>(world: &mut World, cfg: &SceneConfig, rng: &mut R) {
    for i in 0..cfg.fish_count {
        let cluster = (i / 6).min(CLUSTER_CENTERS.len() - 1);
        let center = CLUSTER_CENTERS[cluster];

        let position = center
            + Vec3::new(
                (rng.r#gen::<f32>() - 0.5) * 120.0,
                (rng.r#gen::<f32>() - 0.5) * 120.0,
                (rng.r#gen::<f32>() - 0.5) * 40.0,
            );
        let velocity = Vec3::new(
            (rng.r#gen::<f32>() - 0.5) * 2.0 + (cluster as f32 * 0.5 - 0.5),
            (rng.r#gen::<f32>() - 0.5) * 2.0 + (cluster as f32).sin() * 0.5,
            (rng.r#gen::<f32>() - 0.5) * 0.5,
        );
        let color = BodyColor::from_hsl(rng.r#gen::<f32>(), 0.7, 0.6);

        world.spawn((
            FishId(i as u32),
            Transform::from_position(position),
            Velocity::new(velocity),
            color,
        ));
    }
}

// ============================================================================
// STEERING
// ============================================================================

/// Read-only per-fish data collected from the ECS before the pass.
struct FishSnapshot {
    entity: Entity,
    id: u32,
    position: Vec3,
    velocity: Vec3,
    color: Vec3,
}

/// Sum of the four steering contributions for fish `i` against the whole
/// snapshot. Squared-distance compares keep sqrt off the filter path; the
/// separation weight still needs the true distance once a neighbor passes.
fn flock_steering(i: usize, flock: &[FishSnapshot], pointer: Vec3, cfg: &SceneConfig) -> Vec3 {
    let me = &flock[i];

    let sep_radius_sq = cfg.separation_radius * cfg.separation_radius;
    let align_radius_sq = cfg.alignment_radius * cfg.alignment_radius;
    let coh_radius_sq = cfg.cohesion_radius * cfg.cohesion_radius;

    let mut separation = Vec3::ZERO;
    let mut alignment = Vec3::ZERO;
    let mut cohesion = Vec3::ZERO;
    let mut sep_count = 0u32;
    let mut align_count = 0u32;
    let mut coh_count = 0u32;

    for other in flock {
        if other.id == me.id {
            continue;
        }
        let diff = me.position - other.position;
        let dist_sq = diff.length_squared();

        if dist_sq < sep_radius_sq && dist_sq > 0.0 {
            let dist = dist_sq.sqrt();
            // Away from the neighbor, weighted by inverse distance.
            separation += diff / dist / dist;
            sep_count += 1;
        }
        if dist_sq < align_radius_sq {
            alignment += other.velocity;
            align_count += 1;
        }
        if dist_sq < coh_radius_sq {
            cohesion += other.position;
            coh_count += 1;
        }
    }

    let mut force = Vec3::ZERO;
    if sep_count > 0 {
        force += (separation / sep_count as f32).normalize_or_zero() * cfg.separation_gain;
    }
    if align_count > 0 {
        force += (alignment / align_count as f32).normalize_or_zero() * cfg.alignment_gain;
    }
    if coh_count > 0 {
        let centroid = cohesion / coh_count as f32;
        force += (centroid - me.position).normalize_or_zero() * cfg.cohesion_gain;
    }

    let to_pointer = pointer - me.position;
    let pointer_dist = to_pointer.length();
    if pointer_dist < cfg.pointer_radius && pointer_dist > 0.0 {
        force += to_pointer / pointer_dist * cfg.pointer_gain;
    }

    force
}

// ============================================================================
// STEP
// ============================================================================

/// Advance every fish one tick: steering + jitter, speed clamp, damping,
/// Euler integration, trail-particle side effect, wall reflection, facing.
/// `pointer` is the cached pointer position already translated into world
/// space (viewport-centered coordinates).
pub fn step<R: Rng>(
    world: &mut World,
    pointer: Vec3,
    bounds: Bounds,
    cfg: &SceneConfig,
    pool: &mut ParticlePool,
    rng: &mut R,
) {
    let mut flock: Vec<FishSnapshot> = world
        .query::<(Entity, &FishId, &Transform, &Velocity, &BodyColor)>()
        .iter(world)
        .map(|(entity, id, transform, velocity, color)| FishSnapshot {
            entity,
            id: id.0,
            position: transform.position,
            velocity: velocity.linear,
            color: color.to_vec3(),
        })
        .collect();
    // Stable pass order regardless of archetype layout.
    flock.sort_by_key(|f| f.id);

    for i in 0..flock.len() {
        let force = flock_steering(i, &flock, pointer, cfg);
        let me = &flock[i];

        let mut velocity = me.velocity + force;
        velocity += Vec3::new(
            (rng.r#gen::<f32>() - 0.5) * cfg.jitter.0 * 2.0,
            (rng.r#gen::<f32>() - 0.5) * cfg.jitter.1 * 2.0,
            (rng.r#gen::<f32>() - 0.5) * cfg.jitter.2 * 2.0,
        );

        // Clamp into [min_speed, max_speed]; a fish never fully stops.
        let speed = velocity.length();
        if speed > cfg.max_speed {
            velocity = velocity / speed * cfg.max_speed;
        } else if speed < cfg.min_speed && speed > f32::EPSILON {
            velocity = velocity / speed * cfg.min_speed;
        }
        velocity *= cfg.damping;

        let old_position = me.position;
        let mut position = old_position + velocity;

        // Trail side effect: probabilistic, and only when actually swimming.
        if rng.r#gen::<f64>() < cfg.trail_probability
            && velocity.length() > cfg.trail_speed_threshold
        {
            pool.spawn_from_fish(old_position, velocity, me.color, rng);
        }

        // Inelastic wall reflection, position clamped — no tunneling.
        if position.x.abs() > bounds.half_width {
            velocity.x *= cfg.bounce;
            position.x = position.x.clamp(-bounds.half_width, bounds.half_width);
        }
        if position.y.abs() > bounds.half_height {
            velocity.y *= cfg.bounce;
            position.y = position.y.clamp(-bounds.half_height, bounds.half_height);
        }
        if position.z.abs() > bounds.depth_half {
            velocity.z *= cfg.bounce;
            position.z = position.z.clamp(-bounds.depth_half, bounds.depth_half);
        }

        let entity = me.entity;
        let mut entry = world.entity_mut(entity);
        if let Some(mut t) = entry.get_mut::<Transform>() {
            t.position = position;
            let speed = velocity.length();
            if speed > ORIENT_SPEED_EPSILON {
                t.rotation = facing(velocity / speed);
            }
        }
        if let Some(mut v) = entry.get_mut::<Velocity>() {
            v.linear = velocity;
        }
    }
}

/// Rotation taking the model's +X forward axis onto `dir` (unit length),
/// keeping the fish upright: yaw about Y, then pitch about the local Z.
fn facing(dir: Vec3) -> Quat {
    let yaw = (-dir.z).atan2(dir.x);
    let pitch = dir.y.clamp(-1.0, 1.0).asin();
    Quat::from_rotation_y(yaw) * Quat::from_rotation_z(pitch)
}

// ============================================================================
// RENDER COLLECTION
// ============================================================================

/// Gather one instance per fish for the batched draw, in snapshot order.
pub fn fish_instances(world: &mut World, scale: f32) -> Vec<SceneInstance> {
    let mut out: Vec<(u32, SceneInstance)> = world
        .query::<(&FishId, &Transform, &BodyColor)>()
        .iter(world)
        .map(|(id, transform, color)| {
            let model = glam::Mat4::from_scale_rotation_translation(
                Vec3::splat(scale),
                transform.rotation,
                transform.position,
            );
            (id.0, SceneInstance::new(model, color.to_vec3(), 1.0))
        })
        .collect();
    out.sort_by_key(|(id, _)| *id);
    out.into_iter().map(|(_, inst)| inst).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_cfg() -> SceneConfig {
        SceneConfig::default()
    }

    fn test_bounds() -> Bounds {
        Bounds::from_viewport(1280, 720, 100.0)
    }

    /// Pointer far outside the attraction radius of everything.
    fn far_pointer() -> Vec3 {
        Vec3::new(1.0e6, 1.0e6, 0.0)
    }

    fn spawn_world(seed: u64) -> (World, ParticlePool, StdRng) {
        let cfg = test_cfg();
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(seed);
        spawn_fish(&mut world, &cfg, &mut rng);
        (world, ParticlePool::new(cfg.particle_capacity), rng)
    }

    fn collect_state(world: &mut World) -> Vec<(u32, Vec3, Vec3)> {
        let mut v: Vec<(u32, Vec3, Vec3)> = world
            .query::<(&FishId, &Transform, &Velocity)>()
            .iter(world)
            .map(|(id, t, vel)| (id.0, t.position, vel.linear))
            .collect();
        v.sort_by_key(|(id, _, _)| *id);
        v
    }

    #[test]
    fn batch_spawn_assigns_unique_stable_ids() {
        let (mut world, _, _) = spawn_world(1);
        let state = collect_state(&mut world);
        assert_eq!(state.len(), 16);
        for (i, (id, _, _)) in state.iter().enumerate() {
            assert_eq!(*id, i as u32);
        }
    }

    #[test]
    fn speed_stays_clamped_over_many_ticks() {
        let cfg = test_cfg();
        let (mut world, mut pool, mut rng) = spawn_world(2);
        for _ in 0..200 {
            step(&mut world, far_pointer(), test_bounds(), &cfg, &mut pool, &mut rng);
            pool.step();
        }
        for (_, _, vel) in collect_state(&mut world) {
            let speed = vel.length();
            assert!(
                speed <= cfg.max_speed * cfg.damping + 1e-4,
                "speed above max: {speed}"
            );
            // A wall bounce after the clamp may scale components by |bounce|
            // once; the floor holds up to that factor.
            assert!(
                speed >= cfg.min_speed * cfg.damping * cfg.bounce.abs() - 1e-4,
                "speed below min: {speed}"
            );
        }
    }

    #[test]
    fn positions_stay_inside_the_walls() {
        let cfg = test_cfg();
        let bounds = test_bounds();
        let (mut world, mut pool, mut rng) = spawn_world(3);
        for _ in 0..300 {
            step(&mut world, far_pointer(), bounds, &cfg, &mut pool, &mut rng);
            for (_, pos, _) in collect_state(&mut world) {
                assert!(bounds.contains(pos), "fish escaped to {pos}");
            }
        }
    }

    #[test]
    fn fixed_rng_stream_makes_the_step_deterministic() {
        let cfg = test_cfg();
        let (mut world_a, mut pool_a, mut rng_a) = spawn_world(4);
        let (mut world_b, mut pool_b, mut rng_b) = spawn_world(4);
        for _ in 0..50 {
            step(&mut world_a, far_pointer(), test_bounds(), &cfg, &mut pool_a, &mut rng_a);
            step(&mut world_b, far_pointer(), test_bounds(), &cfg, &mut pool_b, &mut rng_b);
        }
        assert_eq!(collect_state(&mut world_a), collect_state(&mut world_b));
        assert_eq!(pool_a.active(), pool_b.active());
    }

    #[test]
    fn pointer_inside_radius_attracts() {
        let cfg = test_cfg();
        let mut world = World::new();
        world.spawn((
            FishId(0),
            Transform::from_position(Vec3::ZERO),
            Velocity::new(Vec3::new(1.0, 0.0, 0.0)),
            BodyColor::from_hsl(0.5, 0.7, 0.6),
        ));
        let mut pool = ParticlePool::new(16);
        let mut rng = StdRng::seed_from_u64(5);

        step(
            &mut world,
            Vec3::new(100.0, 0.0, 0.0),
            test_bounds(),
            &cfg,
            &mut pool,
            &mut rng,
        );

        let (_, _, vel) = collect_state(&mut world)[0];
        assert!(vel.x > 1.2, "pointer pull missing: {vel}");
    }

    #[test]
    fn close_neighbors_separate() {
        let cfg = test_cfg();
        let mut world = World::new();
        for (i, x) in [(0u32, 0.0f32), (1, 5.0)] {
            world.spawn((
                FishId(i),
                Transform::from_position(Vec3::new(x, 0.0, 0.0)),
                Velocity::new(Vec3::ZERO),
                BodyColor::from_hsl(0.1, 0.7, 0.6),
            ));
        }
        let mut pool = ParticlePool::new(16);
        let mut rng = StdRng::seed_from_u64(6);

        step(&mut world, far_pointer(), test_bounds(), &cfg, &mut pool, &mut rng);

        let state = collect_state(&mut world);
        assert!(state[0].2.x < -0.5, "left fish should flee left: {}", state[0].2);
        assert!(state[1].2.x > 0.5, "right fish should flee right: {}", state[1].2);
    }

    #[test]
    fn wall_crossing_reflects_and_clamps() {
        let cfg = test_cfg();
        let bounds = test_bounds();
        let mut world = World::new();
        world.spawn((
            FishId(0),
            Transform::from_position(Vec3::new(bounds.half_width - 0.5, 0.0, 0.0)),
            Velocity::new(Vec3::new(4.0, 0.0, 0.0)),
            BodyColor::from_hsl(0.3, 0.7, 0.6),
        ));
        let mut pool = ParticlePool::new(16);
        let mut rng = StdRng::seed_from_u64(7);

        step(&mut world, far_pointer(), bounds, &cfg, &mut pool, &mut rng);

        let (_, pos, vel) = collect_state(&mut world)[0];
        assert!(pos.x <= bounds.half_width);
        assert!(vel.x < 0.0, "velocity should reflect inward: {vel}");
        // Inelastic: the bounce loses energy.
        assert!(vel.x.abs() < 4.0);
    }

    #[test]
    fn facing_points_the_nose_along_travel() {
        for dir in [
            Vec3::X,
            Vec3::Y,
            Vec3::new(1.0, 1.0, 0.0).normalize(),
            Vec3::new(-1.0, 0.2, 0.7).normalize(),
        ] {
            let rot = facing(dir);
            let nose = rot * Vec3::X;
            assert!(
                nose.dot(dir) > 0.999,
                "nose {nose} should align with {dir}"
            );
        }
    }

    #[test]
    fn fast_fish_feed_the_particle_pool() {
        let cfg = test_cfg();
        let (mut world, mut pool, mut rng) = spawn_world(8);
        for _ in 0..30 {
            step(&mut world, far_pointer(), test_bounds(), &cfg, &mut pool, &mut rng);
        }
        assert!(pool.spawned_total() > 0, "no trail particles after 30 ticks");
    }
}
