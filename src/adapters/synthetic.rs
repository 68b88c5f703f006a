//! Synthetic Cointegrated Pairs
//!
//! Seeded generator for a pair with a known hedge ratio: leg A follows a
//! Gaussian random walk, leg B = ratio·A + offset + white noise. Used by
//! the `synth` command and by tests that need a ground truth.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticPairConfig {
    pub bars: usize,
    /// Leg A's first close
    pub start_price: f64,
    /// Std dev of leg A's per-bar step
    pub walk_volatility: f64,
    /// True units of B per unit of A
    pub ratio: f64,
    pub offset: f64,
    /// Std dev of the stationary noise on leg B
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticPairConfig {
    fn default() -> Self {
        Self {
            bars: 1_000,
            start_price: 1_000.0,
            walk_volatility: 1.0,
            ratio: 2.0,
            offset: 0.0,
            noise: 0.5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPair {
    pub leg_a: Vec<f64>,
    pub leg_b: Vec<f64>,
}

/// Generate a pair of aligned close series
pub fn generate_pair(config: &SyntheticPairConfig) -> SyntheticPair {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut leg_a = Vec::with_capacity(config.bars);
    let mut leg_b = Vec::with_capacity(config.bars);

    let mut price = config.start_price;
    for _ in 0..config.bars {
        price += config.walk_volatility * standard_normal(&mut rng);
        leg_a.push(price);
        leg_b.push(config.ratio * price + config.offset + config.noise * standard_normal(&mut rng));
    }

    SyntheticPair { leg_a, leg_b }
}

/// Box-Muller draw from N(0, 1)
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // gen() is in [0, 1); flip so ln never sees zero
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
