// Gold-dust particle pool.
//
// Fixed-capacity parallel-array storage: indices [0, active) always hold
// live particles contiguously. Expiry is handled by forward compaction every
// step — live entries are copied down over expired ones, and instance slots
// past the new active count are zero-scaled so they stay invisible without
// ever being deallocated. Spawning into a full pool is a silent no-op.
//
// All slots (live or not) are drawn as one instanced call each frame; the
// renderer uploads `instance_bytes()` wholesale and draws `capacity`
// instances of a shared low-poly sphere.

use glam::{Mat4, Vec3};
use rand::Rng;

use super::mesh::SceneInstance;

/// Life lost per tick; a particle lives 40 ticks.
const LIFE_DECREMENT: f32 = 0.025;
/// Per-tick velocity decay.
const VELOCITY_DAMPING: f32 = 0.98;
/// Constant downward velocity bias — the dust sinks.
const GRAVITY: f32 = 0.04;
/// Below this speed a fish is drifting, not swimming: no trail.
const SPAWN_SPEED_THRESHOLD: f32 = 0.8;
/// Trail particles appear this far behind the fish, along -velocity.
const BACK_OFFSET: f32 = 15.0;
/// Peak opacity at full life; fades linearly with the life ratio.
const BASE_OPACITY: f32 = 0.9;

/// Gold-dust palette; each particle picks one entry at spawn.
const GOLD_PALETTE: [Vec3; 6] = [
    Vec3::new(1.0, 0.8, 0.2),
    Vec3::new(1.0, 0.6, 0.1),
    Vec3::new(0.9, 0.7, 0.3),
    Vec3::new(1.0, 0.9, 0.4),
    Vec3::new(0.8, 0.5, 0.2),
    Vec3::new(1.0, 0.7, 0.5),
];

// ============================================================================
// PARTICLE POOL
// ============================================================================

pub struct ParticlePool {
    capacity: usize,
    active: usize,
    /// Monotonic particle id counter; ids are never reused.
    next_id: u64,

    id: Vec<u64>,
    position: Vec<Vec3>,
    velocity: Vec<Vec3>,
    life: Vec<f32>,
    max_life: Vec<f32>,
    size: Vec<f32>,
    color: Vec<Vec3>,

    /// One rendering-visible slot per pool index, dead slots zero-scaled.
    instances: Vec<SceneInstance>,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            active: 0,
            next_id: 0,
            id: vec![0; capacity],
            position: vec![Vec3::ZERO; capacity],
            velocity: vec![Vec3::ZERO; capacity],
            life: vec![0.0; capacity],
            max_life: vec![1.0; capacity],
            size: vec![0.0; capacity],
            color: vec![Vec3::ONE; capacity],
            instances: vec![SceneInstance::hidden(); capacity],
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total particles ever spawned.
    pub fn spawned_total(&self) -> u64 {
        self.next_id
    }

    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Shed a burst of trail particles behind a moving fish.
    ///
    /// No-op when the fish is below the swim threshold or the pool is
    /// saturated (saturation drops the excess silently — backpressure, not
    /// an error). `_fish_color` is accepted for contract parity; the gold
    /// palette is fixed.
    pub fn spawn_from_fish<R: Rng>(
        &mut self,
        fish_position: Vec3,
        fish_velocity: Vec3,
        _fish_color: Vec3,
        rng: &mut R,
    ) {
        let speed = fish_velocity.length();
        if speed < SPAWN_SPEED_THRESHOLD {
            return;
        }

        let burst = rng.gen_range(2..=5);
        for _ in 0..burst {
            let backward = fish_velocity / speed * -BACK_OFFSET;
            let scatter = Vec3::new(
                (rng.r#gen::<f32>() - 0.5) * 10.0,
                (rng.r#gen::<f32>() - 0.5) * 10.0,
                (rng.r#gen::<f32>() - 0.5) * 5.0,
            );
            let velocity = fish_velocity * -0.2
                + Vec3::new(
                    (rng.r#gen::<f32>() - 0.5) * 0.3,
                    (rng.r#gen::<f32>() - 0.5) * 0.3,
                    (rng.r#gen::<f32>() - 0.5) * 0.1,
                );
            let color = GOLD_PALETTE[rng.gen_range(0..GOLD_PALETTE.len())];
            let size = 0.8 + rng.r#gen::<f32>() * 1.2;
            self.spawn(fish_position + backward + scatter, velocity, color, size);
        }
    }

    /// Claim the next free slot, if any.
    fn spawn(&mut self, position: Vec3, velocity: Vec3, color: Vec3, size: f32) {
        if self.active >= self.capacity {
            return;
        }
        let i = self.active;
        self.id[i] = self.next_id;
        self.next_id += 1;
        self.position[i] = position;
        self.velocity[i] = velocity;
        self.life[i] = 1.0;
        self.max_life[i] = 1.0;
        self.size[i] = size;
        self.color[i] = color;
        self.active += 1;
    }

    /// Advance every live particle one tick and compact out the expired ones.
    ///
    /// Invariants on exit: active never grows, [0, active) all have life > 0,
    /// and every slot >= active is zero-scaled in the instance buffer.
    pub fn step(&mut self) {
        let before = self.active;
        let mut write = 0;

        for read in 0..before {
            self.life[read] -= LIFE_DECREMENT;
            if self.life[read] <= 0.0 {
                continue;
            }

            self.position[read] += self.velocity[read];
            self.velocity[read] *= VELOCITY_DAMPING;
            self.velocity[read].y -= GRAVITY;

            if write != read {
                self.copy_slot(read, write);
            }

            let ratio = self.life[write] / self.max_life[write];
            let scale = self.size[write] * ratio;
            let model = Mat4::from_translation(self.position[write])
                * Mat4::from_scale(Vec3::splat(scale));
            self.instances[write] = SceneInstance::new(model, self.color[write], BASE_OPACITY * ratio);

            write += 1;
        }

        // Slots vacated this tick become invisible but keep their buffers.
        for i in write..before {
            self.instances[i] = SceneInstance::hidden();
        }

        self.active = write;
    }

    fn copy_slot(&mut self, from: usize, to: usize) {
        self.id[to] = self.id[from];
        self.position[to] = self.position[from];
        self.velocity[to] = self.velocity[from];
        self.life[to] = self.life[from];
        self.max_life[to] = self.max_life[from];
        self.size[to] = self.size[from];
        self.color[to] = self.color[from];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn swimming() -> Vec3 {
        Vec3::new(3.0, 0.5, 0.0)
    }

    #[test]
    fn drifting_fish_sheds_nothing() {
        let mut pool = ParticlePool::new(64);
        pool.spawn_from_fish(Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0), Vec3::ONE, &mut rng());
        assert_eq!(pool.active(), 0);
        assert_eq!(pool.spawned_total(), 0);
    }

    #[test]
    fn swimming_fish_sheds_a_small_burst() {
        let mut pool = ParticlePool::new(64);
        pool.spawn_from_fish(Vec3::ZERO, swimming(), Vec3::ONE, &mut rng());
        assert!((2..=5).contains(&pool.active()));
        for i in 0..pool.active() {
            assert!(pool.life[i] > 0.0);
            assert!((0.8..=2.0).contains(&pool.size[i]));
        }
    }

    #[test]
    fn saturated_pool_drops_spawns_silently() {
        let mut pool = ParticlePool::new(4);
        let mut r = rng();
        for _ in 0..10 {
            pool.spawn_from_fish(Vec3::ZERO, swimming(), Vec3::ONE, &mut r);
        }
        assert_eq!(pool.active(), 4);

        pool.spawn_from_fish(Vec3::ZERO, swimming(), Vec3::ONE, &mut r);
        assert_eq!(pool.active(), 4);
    }

    #[test]
    fn particle_ids_are_monotonic_and_unique() {
        let mut pool = ParticlePool::new(64);
        let mut r = rng();
        pool.spawn_from_fish(Vec3::ZERO, swimming(), Vec3::ONE, &mut r);
        pool.spawn_from_fish(Vec3::ZERO, swimming(), Vec3::ONE, &mut r);
        let mut ids: Vec<u64> = pool.id[..pool.active()].to_vec();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), pool.active());
        assert_eq!(pool.spawned_total(), pool.active() as u64);
    }

    #[test]
    fn step_never_grows_the_live_range_and_keeps_it_contiguous() {
        let mut pool = ParticlePool::new(128);
        let mut r = rng();
        for _ in 0..6 {
            pool.spawn_from_fish(Vec3::ZERO, swimming(), Vec3::ONE, &mut r);
        }

        let mut previous = pool.active();
        for _ in 0..60 {
            pool.step();
            assert!(pool.active() <= previous);
            for i in 0..pool.active() {
                assert!(pool.life[i] > 0.0, "dead particle inside live range");
            }
            previous = pool.active();
        }
        // 1.0 / 0.025 = 40 ticks: everything has expired by now.
        assert_eq!(pool.active(), 0);
    }

    #[test]
    fn life_is_monotone_non_increasing_while_live() {
        let mut pool = ParticlePool::new(8);
        pool.spawn(Vec3::ZERO, Vec3::ZERO, Vec3::ONE, 1.0);
        let mut last = pool.life[0];
        for _ in 0..39 {
            pool.step();
            if pool.active() == 0 {
                break;
            }
            assert!(pool.life[0] < last);
            last = pool.life[0];
        }
    }

    #[test]
    fn expired_slots_are_zero_scaled_not_destroyed() {
        let mut pool = ParticlePool::new(8);
        pool.spawn(Vec3::new(5.0, 5.0, 5.0), Vec3::ZERO, Vec3::ONE, 1.5);
        for _ in 0..41 {
            pool.step();
        }
        assert_eq!(pool.active(), 0);
        // The instance buffer still covers every slot; slot 0 is collapsed.
        assert_eq!(pool.instances.len(), pool.capacity());
        let m = pool.instances[0].model;
        assert_eq!(m[0][0], 0.0);
        assert_eq!(m[1][1], 0.0);
        assert_eq!(m[2][2], 0.0);
        assert_eq!(pool.instances[0].color[3], 0.0);
    }

    #[test]
    fn gravity_and_damping_shape_the_fall() {
        let mut pool = ParticlePool::new(8);
        pool.spawn(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::ONE, 1.0);
        pool.step();
        // x velocity damped, y velocity pulled downward.
        assert!((pool.velocity[0].x - 0.98).abs() < 1e-5);
        assert!((pool.velocity[0].y + 0.04).abs() < 1e-5);
        assert!(pool.position[0].x > 0.0);
    }

    #[test]
    fn fade_follows_the_life_ratio() {
        let mut pool = ParticlePool::new(8);
        pool.spawn(Vec3::ZERO, Vec3::ZERO, Vec3::ONE, 2.0);
        pool.step();
        let ratio: f32 = 1.0 - 0.025;
        assert!((pool.instances[0].color[3] - 0.9 * ratio).abs() < 1e-5);
        assert!((pool.instances[0].model[0][0] - 2.0 * ratio).abs() < 1e-5);
    }
}
