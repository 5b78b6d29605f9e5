/*
 * Boid Module
 *
 * This module defines the per-fish state and the store that owns it.
 * A fish is just a position and a heading; its identity is its index in the
 * store, and that index is only stable until the store is reallocated.
 *
 * The store is double buffered: the steering pass reads every fish from the
 * front buffer and writes the new state into the back buffer, then the two are
 * swapped. No fish ever sees a neighbor's state from the same step.
 */

use std::f32::consts::TAU;

use nannou::prelude::{vec3, Vec3};
use rand::Rng;

use crate::error::{FlockError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FishInstance {
    pub position: Vec3,
    // Unit length intended, not enforced
    pub direction: Vec3,
}

impl FishInstance {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self { position, direction }
    }

    // Random point on the ellipsoid spanned by half the bounds, random heading
    pub fn random<R: Rng + ?Sized>(rng: &mut R, bounds: Vec3) -> Self {
        Self {
            position: random_on_unit_sphere(rng) * bounds * 0.5,
            direction: random_on_unit_sphere(rng),
        }
    }
}

/// Uniformly distributed point on the unit sphere surface.
pub fn random_on_unit_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    vec3(ring * theta.cos(), ring * theta.sin(), z)
}

#[derive(Clone, Debug, Default)]
pub struct FishStore {
    front: Vec<FishInstance>,
    back: Vec<FishInstance>,
}

impl FishStore {
    /// Allocate both buffers for `count` fish and seed them.
    ///
    /// Allocation goes through `try_reserve_exact`, so a count that cannot be
    /// satisfied comes back as an error instead of aborting the process.
    pub fn seeded<R: Rng + ?Sized>(
        flock: &str,
        count: usize,
        bounds: Vec3,
        rng: &mut R,
    ) -> Result<Self> {
        let mut front = Vec::new();
        front
            .try_reserve_exact(count)
            .map_err(|e| FlockError::allocation(flock, "fish", count, Some(e)))?;
        let mut back = Vec::new();
        back.try_reserve_exact(count)
            .map_err(|e| FlockError::allocation(flock, "fish", count, Some(e)))?;

        front.extend((0..count).map(|_| FishInstance::random(&mut *rng, bounds)));
        back.extend_from_slice(&front);

        Ok(Self { front, back })
    }

    pub fn from_fish(fish: Vec<FishInstance>) -> Self {
        let back = fish.clone();
        Self { front: fish, back }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.front.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.front.is_empty()
    }

    // State as of the last completed step
    #[inline]
    pub fn current(&self) -> &[FishInstance] {
        &self.front
    }

    // Read the current state and write the next one in the same pass
    #[inline]
    pub fn split(&mut self) -> (&[FishInstance], &mut [FishInstance]) {
        (&self.front, &mut self.back)
    }

    // Publish the back buffer as the new current state
    #[inline]
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn unit_sphere_samples_are_unit_length() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        for _ in 0..1000 {
            let v = random_on_unit_sphere(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4, "{v:?}");
        }
    }

    #[test]
    fn seeded_fish_stay_inside_bounds() {
        let bounds = vec3(50.0, 25.0, 50.0);
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let store = FishStore::seeded("test", 500, bounds, &mut rng).unwrap();

        assert_eq!(store.len(), 500);
        let half = bounds * 0.5 + Vec3::splat(1e-4);
        for fish in store.current() {
            assert!(fish.position.abs().cmple(half).all(), "{:?}", fish.position);
            assert!((fish.direction.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn same_seed_same_flock() {
        let bounds = vec3(10.0, 10.0, 10.0);
        let a = FishStore::seeded("a", 20, bounds, &mut ChaCha12Rng::seed_from_u64(9)).unwrap();
        let b = FishStore::seeded("b", 20, bounds, &mut ChaCha12Rng::seed_from_u64(9)).unwrap();
        assert_eq!(a.current(), b.current());
    }

    #[test]
    fn oversized_store_fails_to_allocate() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let result = FishStore::seeded("huge", usize::MAX / 4, Vec3::ONE, &mut rng);
        assert!(matches!(result, Err(FlockError::AllocationFailure { .. })));
    }

    #[test]
    fn swap_publishes_back_buffer() {
        let mut store = FishStore::from_fish(vec![FishInstance::new(Vec3::ZERO, Vec3::X); 2]);
        {
            let (current, next) = store.split();
            for (out, fish) in next.iter_mut().zip(current) {
                *out = FishInstance::new(fish.position + fish.direction, fish.direction);
            }
        }
        assert_eq!(store.current()[0].position, Vec3::ZERO);
        store.swap();
        assert_eq!(store.current()[0].position, Vec3::X);
    }
}
