//! Random sampling for particle construction.
//!
//! Every random draw made while building a field goes through a
//! [`SpawnContext`], so a seeded context reproduces the same tree exactly.
//!
//! ```ignore
//! let mut ctx = SpawnContext::from_seed(7);
//! let target = ctx.random_in_tree_cone(14.0, 5.0);
//! let chaos = ctx.random_in_box(Vec3::new(15.0, 15.0, 10.0));
//! ```

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Source of randomness with helpers for the spawn patterns the tree uses.
#[derive(Debug, Clone)]
pub struct SpawnContext {
    rng: SmallRng,
}

impl SpawnContext {
    /// A reproducible context.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// A context seeded from the wall clock, different on every run.
    pub fn from_clock() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::from_seed(seed)
    }

    /// Derive an independent child context, e.g. one per field.
    pub fn fork(&mut self) -> Self {
        Self::from_seed(self.rng.gen())
    }

    // ========== Random primitives ==========

    /// Random f32 in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in `[min, max)`.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Random angle in `[0, 2π)`.
    #[inline]
    pub fn random_angle(&mut self) -> f32 {
        self.random() * TAU
    }

    /// Random index in `[0, len)`; `0` when `len` is zero.
    #[inline]
    pub fn random_index(&mut self, len: usize) -> usize {
        ((self.random() * len as f32) as usize).min(len.saturating_sub(1))
    }

    // ========== Position helpers ==========

    /// Random point inside an axis-aligned box centred at the origin.
    pub fn random_in_box(&mut self, half_extents: Vec3) -> Vec3 {
        Vec3::new(
            (self.random() - 0.5) * 2.0 * half_extents.x,
            (self.random() - 0.5) * 2.0 * half_extents.y,
            (self.random() - 0.5) * 2.0 * half_extents.z,
        )
    }

    /// Random point inside an upright cone centred on the Y axis.
    ///
    /// `y` is uniform over `[-height/2, height/2]`; the disc radius shrinks
    /// linearly from `base_radius` at the bottom to zero at the top, and the
    /// point is area-uniform within that disc.
    pub fn random_in_tree_cone(&mut self, height: f32, base_radius: f32) -> Vec3 {
        let y = self.random() * height - height / 2.0;
        let normalized_y = (y + height / 2.0) / height;
        let max_radius = (1.0 - normalized_y) * base_radius;

        // sqrt for uniform disk
        let r = self.random().sqrt() * max_radius;
        let theta = self.random_angle();

        Vec3::new(r * theta.cos(), y, r * theta.sin())
    }

    /// Random multiplier around 1.0 with total spread `variance`.
    ///
    /// Variance 0 always gives 1.0; variance 1 gives a value in `[0.5, 1.5)`.
    pub fn random_jitter(&mut self, variance: f32) -> f32 {
        1.0 + (self.random() - 0.5) * variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_contexts_agree() {
        let mut a = SpawnContext::from_seed(11);
        let mut b = SpawnContext::from_seed(11);
        for _ in 0..32 {
            assert_eq!(a.random(), b.random());
        }
    }

    #[test]
    fn test_random_in_box_bounds() {
        let mut ctx = SpawnContext::from_seed(1);
        let half = Vec3::new(15.0, 15.0, 10.0);
        for _ in 0..1000 {
            let p = ctx.random_in_box(half);
            assert!(p.abs().cmple(half).all());
        }
    }

    #[test]
    fn test_tree_cone_narrows_to_top() {
        let mut ctx = SpawnContext::from_seed(2);
        for _ in 0..1000 {
            let p = ctx.random_in_tree_cone(14.0, 5.0);
            assert!(p.y >= -7.0 && p.y <= 7.0);
            let allowed = (1.0 - (p.y + 7.0) / 14.0) * 5.0;
            let radial = (p.x * p.x + p.z * p.z).sqrt();
            assert!(radial <= allowed + 1e-4);
        }
    }

    #[test]
    fn test_jitter_range() {
        let mut ctx = SpawnContext::from_seed(3);
        for _ in 0..1000 {
            assert_eq!(ctx.random_jitter(0.0), 1.0);
            let j = ctx.random_jitter(1.0);
            assert!((0.5..1.5).contains(&j));
        }
    }

    #[test]
    fn test_random_index_in_range() {
        let mut ctx = SpawnContext::from_seed(4);
        for len in 1..8 {
            for _ in 0..100 {
                assert!(ctx.random_index(len) < len);
            }
        }
        assert_eq!(ctx.random_index(0), 0);
    }
}
