// initializers.rs
// Weight initialization schemes as closure factories. Each returns an
// `impl Fn() -> f64` sampler that layers call once per weight.

use rand::rng;
use rand_distr::{Distribution, Normal, Uniform};

/// Xavier/Glorot uniform initialization.
/// Samples from U(-a, a) where a = gain * sqrt(6 / (fan_in + fan_out)).
pub fn xavier_uniform(fan_in: usize, fan_out: usize, gain: f64) -> impl Fn() -> f64 {
    let a = gain * (6.0 / (fan_in + fan_out) as f64).sqrt();
    let uniform = Uniform::new(-a, a).unwrap();

    move || {
        let mut rng = rng();
        uniform.sample(&mut rng)
    }
}

/// Xavier/Glorot normal initialization.
/// Samples from N(0, std) where std = gain * sqrt(2 / (fan_in + fan_out)).
pub fn xavier_normal(fan_in: usize, fan_out: usize, gain: f64) -> impl Fn() -> f64 {
    let std = gain * (2.0 / (fan_in + fan_out) as f64).sqrt();
    let normal = Normal::new(0.0, std).unwrap();

    move || {
        let mut rng = rng();
        normal.sample(&mut rng)
    }
}

/// Kaiming/He uniform initialization, tuned for ReLU layers.
/// Samples from U(-bound, bound) where bound = sqrt(6 / fan_in).
pub fn kaiming_uniform(fan_in: usize) -> impl Fn() -> f64 {
    let bound = (6.0 / fan_in as f64).sqrt();
    let uniform = Uniform::new(-bound, bound).unwrap();

    move || {
        let mut rng = rng();
        uniform.sample(&mut rng)
    }
}

/// Kaiming/He normal initialization, tuned for ReLU layers.
/// Samples from N(0, std) where std = sqrt(2 / fan_in).
pub fn kaiming_normal(fan_in: usize) -> impl Fn() -> f64 {
    let std = (2.0 / fan_in as f64).sqrt();
    let normal = Normal::new(0.0, std).unwrap();

    move || {
        let mut rng = rng();
        normal.sample(&mut rng)
    }
}

/// Draws `n` samples from an initializer into a flat vector.
pub fn sample_vec<F: Fn() -> f64>(init: F, n: usize) -> Vec<f64> {
    (0..n).map(|_| init()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xavier_uniform_respects_its_bound() {
        let init = xavier_uniform(4, 2, 1.0);
        let a = (6.0 / 6.0f64).sqrt();
        for _ in 0..1000 {
            let v = init();
            assert!(v >= -a && v < a, "{v} outside [{}, {})", -a, a);
        }
    }

    #[test]
    fn kaiming_uniform_respects_its_bound() {
        let init = kaiming_uniform(6);
        let bound = 1.0f64;
        for _ in 0..1000 {
            let v = init();
            assert!(v >= -bound && v < bound);
        }
    }

    #[test]
    fn normal_samplers_center_near_zero() {
        let samples = sample_vec(xavier_normal(50, 50, 1.0), 5000);
        let mean: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "sample mean {mean} too far from zero");

        let samples = sample_vec(kaiming_normal(50), 5000);
        let mean: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05);
    }

    #[test]
    fn sample_vec_has_requested_length() {
        assert_eq!(sample_vec(xavier_uniform(3, 3, 1.0), 9).len(), 9);
    }
}
