//! Parameter initialisation.

use ndarray::Array2;
use rand::Rng;

/// Recommended gain for tanh activations.
pub const TANH_GAIN: f64 = 5.0 / 3.0;

/// Xavier (Glorot) uniform weights of shape `(fan_in, fan_out)`.
///
/// Entries are drawn from `U(-a, a)` with `a = gain * sqrt(6 / (fan_in + fan_out))`.
pub fn xavier_uniform<R: Rng + ?Sized>(
    fan_in: usize,
    fan_out: usize,
    gain: f64,
    rng: &mut R,
) -> Array2<f64> {
    let bound = gain * (6.0 / (fan_in + fan_out) as f64).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..=bound))
}

/// Uniform `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`, the usual default for dense layers.
pub fn fan_in_uniform<R: Rng + ?Sized>(
    fan_in: usize,
    fan_out: usize,
    rng: &mut R,
) -> Array2<f64> {
    let bound = 1.0 / (fan_in as f64).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..=bound))
}
