//! Particle types and their colour-bucketed pools

use glam::Vec2;
use rand::Rng;

use super::pool::{Pool, PoolHandle};
use crate::color::Color;
use crate::heading;
use crate::settings::Quality;
use crate::shells::ShellSpec;

/// What happens when a star burns out
#[derive(Debug, Clone)]
pub enum DeathEffect {
    /// Comet reached its apex: burst the shell it carries
    Detonate(Box<ShellSpec>),
    /// Split into four sub-stars
    Crossette { shell_id: u32 },
    /// Pop into a ring of short gold sparks
    Crackle { shell_id: u32 },
    /// Mini burst of coloured stars
    Floral,
    /// Mini burst of slow, invisible, gold-sparking stars
    FallingLeaves,
}

/// A burning star (or a rising comet, which is a heavy star)
#[derive(Debug, Clone)]
pub struct Star {
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub full_life: f32,
    pub color: Color,
    /// Colour to switch to once life drops below `transition_time`
    pub second_color: Option<Color>,
    pub color_changed: bool,
    pub transition_time: f32,
    /// Heavy stars (comets) lose less speed to drag
    pub heavy: bool,
    pub visible: bool,
    pub spin_angle: f32,
    pub spin_speed: f32,
    pub spin_radius: f32,
    /// Spark emission interval in ms; 0 disables emission
    pub spark_freq: f32,
    pub spark_speed: f32,
    pub spark_timer: f32,
    pub spark_color: Color,
    pub spark_life: f32,
    pub spark_life_variation: f32,
    pub strobe: bool,
    pub strobe_freq: f32,
    /// Frame number of the last update
    pub update_frame: u64,
    pub on_death: Option<DeathEffect>,
}

impl Star {
    /// A star heading along `angle` at `speed`, with no sparks or transitions
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        pos: Vec2,
        color: Color,
        angle: f32,
        speed: f32,
        life: f32,
    ) -> Self {
        Self {
            pos,
            prev_pos: pos,
            vel: heading(angle, speed),
            life,
            full_life: life,
            color,
            second_color: None,
            color_changed: false,
            transition_time: 0.0,
            heavy: false,
            visible: true,
            spin_angle: rng.random::<f32>() * std::f32::consts::TAU,
            spin_speed: 0.8,
            spin_radius: 0.0,
            spark_freq: 0.0,
            spark_speed: 1.0,
            spark_timer: 0.0,
            spark_color: color,
            spark_life: 750.0,
            spark_life_variation: 0.25,
            strobe: false,
            strobe_freq: 0.0,
            update_frame: 0,
            on_death: None,
        }
    }

    /// Add a constant velocity offset (inherited shell motion)
    pub fn with_velocity_offset(mut self, offset: Vec2) -> Self {
        self.vel += offset;
        self
    }

    pub fn with_death(mut self, effect: DeathEffect) -> Self {
        self.on_death = Some(effect);
        self
    }
}

/// Short-lived trail particle
#[derive(Debug, Clone, Copy)]
pub struct Spark {
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub color: Color,
}

impl Spark {
    pub fn new(pos: Vec2, color: Color, angle: f32, speed: f32, life: f32) -> Self {
        Self {
            pos,
            prev_pos: pos,
            vel: heading(angle, speed),
            life,
            color,
        }
    }
}

/// Radial light flash drawn once at a detonation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstFlash {
    pub pos: Vec2,
    pub radius: f32,
}

/// Anything stored in a colour-bucketed pool
pub trait Bucketed {
    fn bucket(&self) -> Color;
}

impl Bucketed for Star {
    fn bucket(&self) -> Color {
        self.color
    }
}

impl Bucketed for Spark {
    fn bucket(&self) -> Color {
        self.color
    }
}

/// Pool plus one ordered active list per colour.
///
/// Spawn order within a bucket is draw order. The step iterates each bucket
/// in reverse so it can `remove` while walking.
#[derive(Debug, Clone)]
pub struct BucketedPool<T> {
    pub(crate) pool: Pool<T>,
    pub(crate) active: [Vec<PoolHandle>; Color::COUNT],
}

impl<T: Bucketed> BucketedPool<T> {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            pool: Pool::with_max_capacity(max_capacity),
            active: Default::default(),
        }
    }

    /// Spawn into the bucket of the value's colour. `None` if the pool is full.
    pub fn add(&mut self, value: T) -> Option<PoolHandle> {
        let color = value.bucket();
        let handle = self.pool.acquire(value)?;
        self.active[color.index()].push(handle);
        Some(handle)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.pool.get(handle)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.pool.get_mut(handle)
    }

    /// Active handles of one colour, in draw order
    pub fn handles(&self, color: Color) -> &[PoolHandle] {
        &self.active[color.index()]
    }

    /// Active values of one colour, in draw order
    pub fn iter_color(&self, color: Color) -> impl Iterator<Item = &T> {
        self.active[color.index()].iter().map(|&h| &self.pool[h])
    }

    pub fn count(&self, color: Color) -> usize {
        self.active[color.index()].len()
    }

    pub fn len(&self) -> usize {
        self.active.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.active.iter().all(Vec::is_empty)
    }

    pub fn pool(&self) -> &Pool<T> {
        &self.pool
    }

    pub fn set_max_capacity(&mut self, max_capacity: usize) {
        self.pool.set_max_capacity(max_capacity);
    }

    /// Retire every active value
    pub fn clear(&mut self) {
        for bucket in &mut self.active {
            bucket.clear();
        }
        self.pool.clear();
    }
}

/// Flashes queued during update, drawn and returned by the next render
#[derive(Debug, Clone)]
pub struct FlashQueue {
    pool: Pool<BurstFlash>,
    active: Vec<PoolHandle>,
}

impl FlashQueue {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            pool: Pool::with_max_capacity(max_capacity),
            active: Vec::new(),
        }
    }

    pub fn add(&mut self, pos: Vec2, radius: f32) {
        if let Some(handle) = self.pool.acquire(BurstFlash { pos, radius }) {
            self.active.push(handle);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BurstFlash> {
        self.active.iter().map(|&h| &self.pool[h])
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Return every queued flash to the pool
    pub fn drain(&mut self) {
        for handle in self.active.drain(..) {
            self.pool.release(handle);
        }
    }
}

/// All particle pools of a running show
#[derive(Debug, Clone)]
pub struct Particles {
    pub stars: BucketedPool<Star>,
    pub sparks: BucketedPool<Spark>,
    pub flashes: FlashQueue,
}

impl Particles {
    pub fn new(quality: Quality) -> Self {
        Self {
            stars: BucketedPool::new(quality.max_stars()),
            sparks: BucketedPool::new(quality.max_sparks()),
            flashes: FlashQueue::new(256),
        }
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.stars.set_max_capacity(quality.max_stars());
        self.sparks.set_max_capacity(quality.max_sparks());
    }

    pub fn clear(&mut self) {
        self.stars.clear();
        self.sparks.clear();
        self.flashes.drain();
    }

    /// Spawn requests dropped because a pool was full
    pub fn dropped(&self) -> u64 {
        self.stars.pool().dropped() + self.sparks.pool().dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_star_defaults() {
        let mut rng = Pcg32::seed_from_u64(3);
        let star = Star::new(&mut rng, Vec2::new(10.0, 20.0), Color::Red, 0.0, 2.0, 500.0)
            .with_velocity_offset(Vec2::new(1.0, 0.0));
        assert_eq!(star.prev_pos, star.pos);
        assert!((star.vel - Vec2::new(1.0, 2.0)).length() < 1e-5);
        assert_eq!(star.full_life, 500.0);
        assert_eq!(star.spark_color, Color::Red);
        assert_eq!(star.spark_freq, 0.0);
        assert!(star.visible);
        assert!(star.on_death.is_none());
        assert!((0.0..std::f32::consts::TAU).contains(&star.spin_angle));
    }

    #[test]
    fn test_add_goes_to_colour_bucket() {
        let mut sparks = BucketedPool::new(16);
        sparks.add(Spark::new(Vec2::ZERO, Color::Gold, 0.0, 1.0, 100.0));
        sparks.add(Spark::new(Vec2::ZERO, Color::Gold, 0.0, 1.0, 100.0));
        sparks.add(Spark::new(Vec2::ZERO, Color::Blue, 0.0, 1.0, 100.0));
        assert_eq!(sparks.count(Color::Gold), 2);
        assert_eq!(sparks.count(Color::Blue), 1);
        assert_eq!(sparks.len(), 3);
        sparks.clear();
        assert!(sparks.is_empty());
        assert_eq!(sparks.pool().free_count(), 3);
    }

    #[test]
    fn test_full_pool_drops_spawn() {
        let mut sparks = BucketedPool::new(1);
        assert!(sparks.add(Spark::new(Vec2::ZERO, Color::Red, 0.0, 1.0, 10.0)).is_some());
        assert!(sparks.add(Spark::new(Vec2::ZERO, Color::Red, 0.0, 1.0, 10.0)).is_none());
        assert_eq!(sparks.count(Color::Red), 1);
        assert_eq!(sparks.pool().dropped(), 1);
    }

    #[test]
    fn test_flash_queue_drain() {
        let mut flashes = FlashQueue::new(4);
        flashes.add(Vec2::ZERO, 10.0);
        flashes.add(Vec2::ONE, 46.0);
        assert_eq!(flashes.iter().map(|f| f.radius).sum::<f32>(), 56.0);
        flashes.drain();
        assert!(flashes.is_empty());
        flashes.add(Vec2::ZERO, 5.0);
        assert_eq!(flashes.len(), 1);
    }
}
