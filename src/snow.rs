//! Background snowfall.
//!
//! A fixed pool of flakes drifting down through a 50-unit cube. Flakes that
//! fall below the floor are respawned at the top with a new horizontal
//! position. Unlike tree particles, flakes integrate per frame rather than
//! being a function of time.

use glam::Vec3;

use crate::spawn::SpawnContext;

/// Flakes in the default snowfall.
pub const SNOW_COUNT: usize = 1000;
/// Edge length of the volume flakes live in.
const SNOW_EXTENT: f32 = 50.0;
const SNOW_FLOOR: f32 = -20.0;
const SNOW_CEILING: f32 = 20.0;
/// Flake radius (a tiny octahedron).
pub const FLAKE_RADIUS: f32 = 0.02;

/// A single snowflake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flake {
    pub position: Vec3,
    /// Fall distance per frame.
    pub speed: f32,
    /// Sideways drift per frame.
    pub drift: f32,
}

/// The snowfall layer.
#[derive(Debug, Clone)]
pub struct Snowfall {
    flakes: Vec<Flake>,
    /// Shared spin, advanced a little every frame.
    rotation: Vec3,
    spawner: SpawnContext,
}

impl Snowfall {
    pub fn new(count: usize, mut spawner: SpawnContext) -> Self {
        let flakes = (0..count)
            .map(|_| Flake {
                position: spawner.random_in_box(Vec3::splat(SNOW_EXTENT / 2.0)),
                speed: spawner.random_range(0.02, 0.07),
                drift: (spawner.random() - 0.5) * 0.01,
            })
            .collect();

        Self {
            flakes,
            rotation: Vec3::ZERO,
            spawner,
        }
    }

    /// Advance one frame.
    pub fn tick(&mut self) {
        let half = SNOW_EXTENT / 2.0;
        for flake in &mut self.flakes {
            flake.position.y -= flake.speed;
            flake.position.x += flake.drift;

            if flake.position.y < SNOW_FLOOR {
                flake.position.y = SNOW_CEILING;
                flake.position.x = self.spawner.random_range(-half, half);
                flake.position.z = self.spawner.random_range(-half, half);
            }
        }
        self.rotation += Vec3::new(0.001, 0.002, 0.0);
    }

    pub fn flakes(&self) -> &[Flake] {
        &self.flakes
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flakes_fall() {
        let mut snow = Snowfall::new(100, SpawnContext::from_seed(1));
        let before: Vec<f32> = snow.flakes().iter().map(|f| f.position.y).collect();
        snow.tick();
        for (flake, y) in snow.flakes().iter().zip(before) {
            if y - flake.speed >= SNOW_FLOOR {
                assert!((flake.position.y - (y - flake.speed)).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_flakes_respawn_at_top() {
        let mut snow = Snowfall::new(50, SpawnContext::from_seed(2));
        for _ in 0..2000 {
            snow.tick();
            for flake in snow.flakes() {
                assert!(flake.position.y >= SNOW_FLOOR - 0.07);
                assert!(flake.position.y <= SNOW_EXTENT / 2.0);
            }
        }
    }
}
