//! Seeded sampling helpers for the randomized geometry tests.

use glam::Vec3;
use rand::prelude::*;

pub(crate) fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub(crate) fn vec3_in(rng: &mut StdRng, min: f32, max: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(min..max),
        rng.gen_range(min..max),
        rng.gen_range(min..max),
    )
}

/// Uniform direction by rejection sampling the unit ball.
pub(crate) fn unit_vec3(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = vec3_in(rng, -1.0, 1.0);
        let len_sq = v.length_squared();
        if len_sq > 1e-4 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}
