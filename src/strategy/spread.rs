//! Spread Tracker
//!
//! Turns leg closes and the current betas into a scalar spread, keeps the
//! last W spreads, and standardizes the newest one:
//!
//! z = (spread_latest - rolling_mean) / rolling_std  (Bessel-corrected, n-1)
//!
//! No z-score is produced until W spreads exist, or when the window is flat.

use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::HashMap;

use crate::domain::{BetaVector, InstrumentId, SpreadSeries};

/// Standard deviation (relative to the mean's magnitude) treated as zero
const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Rolling statistics over a full spread window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Result of one spread update
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadSample {
    pub spread: f64,
    /// Present once the window is full
    pub stats: Option<SpreadStats>,
    /// Present once the window is full and not degenerate
    pub z_score: Option<f64>,
}

impl SpreadSample {
    /// Full window with zero dispersion
    pub fn is_degenerate(&self) -> bool {
        self.stats.is_some() && self.z_score.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct SpreadTracker {
    series: SpreadSeries,
}

impl SpreadTracker {
    pub fn new(formation_window: usize) -> Self {
        Self {
            series: SpreadSeries::new(formation_window),
        }
    }

    /// Append Σ beta·close and recompute the z-score.
    ///
    /// Returns None, without touching the series, when a leg in `betas` has
    /// no close in `closes`.
    pub fn update(
        &mut self,
        closes: &HashMap<InstrumentId, f64>,
        betas: &BetaVector,
    ) -> Option<SpreadSample> {
        let mut spread = 0.0;
        for (instrument, beta) in betas.iter() {
            let close = closes.get(instrument)?;
            spread += beta * close;
        }
        Some(self.push(spread))
    }

    /// Append a precomputed spread value
    pub fn push(&mut self, spread: f64) -> SpreadSample {
        self.series.push(spread);

        if !self.series.is_full() {
            return SpreadSample {
                spread,
                stats: None,
                z_score: None,
            };
        }

        let stats = self.stats();
        let z_score = stats.and_then(|s| {
            if !s.std_dev.is_finite() || s.std_dev <= DEGENERATE_TOLERANCE * s.mean.abs().max(1.0) {
                tracing::debug!(spread, mean = s.mean, "Degenerate spread window, no z-score");
                return None;
            }
            let z = (spread - s.mean) / s.std_dev;
            z.is_finite().then_some(z)
        });

        SpreadSample {
            spread,
            stats,
            z_score,
        }
    }

    fn stats(&self) -> Option<SpreadStats> {
        if self.series.len() < 2 {
            return None;
        }
        let values = self.series.snapshot();
        let mean = values.iter().mean();
        let std_dev = values.iter().std_dev();
        mean.is_finite().then_some(SpreadStats { mean, std_dev })
    }

    pub fn latest(&self) -> Option<f64> {
        self.series.latest()
    }

    pub fn series(&self) -> &SpreadSeries {
        &self.series
    }

    pub fn reset(&mut self) {
        self.series.clear();
    }
}
