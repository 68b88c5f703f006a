//! Hedge Ratio Estimation (Johansen)
//!
//! Fits the leading cointegrating vector of two aligned close series with
//! the Johansen procedure (constant term, one lagged difference):
//!
//! 1. Regress Δx_t and x_t on Δx_{t-1}, keep residuals R0, Rk
//! 2. Build S00, Sk0, Skk moment matrices from the residuals
//! 3. Solve Skk⁻¹·Sk0·S00⁻¹·S0k for its largest eigenvalue
//! 4. The matching eigenvector v is the hedge vector
//!
//! Normalization: betas = -v / v_B, so leg B's coefficient is always -1 and
//! leg A carries the hedge ratio. The spread is then β_A·P_A - P_B.
//!
//! With two legs every matrix is 2x2, so each fit is a fixed, small amount
//! of work regardless of how often it runs.

use serde::Serialize;

use crate::domain::{BetaVector, Leg};

/// Fewest aligned closes for which the procedure is defined
pub const MIN_OBSERVATIONS: usize = 3;
/// Relative determinant below which a matrix is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;
/// Relative magnitude below which a vector component counts as zero
const ZERO_TOLERANCE: f64 = 1e-12;

/// Why an estimation attempt produced no new betas
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    #[error("Insufficient data: requires {required} aligned closes, got {got}")]
    InsufficientData { required: usize, got: usize },
    #[error("Leg lengths differ: {0} vs {1}")]
    LengthMismatch(usize, usize),
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("Singular {0} matrix")]
    SingularMatrix(&'static str),
    #[error("Degenerate eigenvector: {0}")]
    DegenerateEigenvector(&'static str),
}

/// Result of one Johansen fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JohansenFit {
    /// Eigenvalues, largest first
    pub eigenvalues: [f64; 2],
    /// Unit-length eigenvector of the largest eigenvalue, [leg A, leg B]
    pub eigenvector: [f64; 2],
    /// Residual rows used in the moment matrices
    pub observations: usize,
}

impl JohansenFit {
    /// Betas normalized so leg B's coefficient is -1
    pub fn normalized_betas(&self) -> Result<[f64; 2], EstimationError> {
        let [va, vb] = self.eigenvector;
        if vb.abs() <= ZERO_TOLERANCE * va.abs().max(1.0) {
            return Err(EstimationError::DegenerateEigenvector("leg B weight is zero"));
        }
        let betas = [-va / vb, -1.0];
        if !betas.iter().all(|b| b.is_finite()) {
            return Err(EstimationError::NonFinite("normalized betas"));
        }
        Ok(betas)
    }
}

/// Johansen fit over two aligned close series (det_order 0, one lagged difference)
pub fn johansen(a: &[f64], b: &[f64]) -> Result<JohansenFit, EstimationError> {
    if a.len() != b.len() {
        return Err(EstimationError::LengthMismatch(a.len(), b.len()));
    }
    let t = a.len();
    if t < MIN_OBSERVATIONS {
        return Err(EstimationError::InsufficientData {
            required: MIN_OBSERVATIONS,
            got: t,
        });
    }
    if !a.iter().chain(b.iter()).all(|p| p.is_finite()) {
        return Err(EstimationError::NonFinite("prices"));
    }

    // Rows s = 1..t-2: Δx_s, Δx_{s-1}, x_s
    let rows = t - 2;
    let mut diff = Vec::with_capacity(rows);
    let mut lagged = Vec::with_capacity(rows);
    let mut level = Vec::with_capacity(rows);
    for s in 1..t - 1 {
        diff.push([a[s + 1] - a[s], b[s + 1] - b[s]]);
        lagged.push([a[s] - a[s - 1], b[s] - b[s - 1]]);
        level.push([a[s], b[s]]);
    }
    demean(&mut diff);
    demean(&mut lagged);
    demean(&mut level);

    let r0 = residuals(&diff, &lagged)?;
    let rk = residuals(&level, &lagged)?;

    let n = rows as f64;
    let s00 = cross(&r0, &r0).scale(1.0 / n);
    let sk0 = cross(&rk, &r0).scale(1.0 / n);
    let skk = cross(&rk, &rk).scale(1.0 / n);

    let m = skk
        .inverse("S_kk")?
        .mul(&sk0)
        .mul(&s00.inverse("S_00")?)
        .mul(&sk0.transpose());
    if !m.is_finite() {
        return Err(EstimationError::NonFinite("eigen problem"));
    }

    let (eigenvalues, eigenvector) = leading_eigenpair(&m)?;
    Ok(JohansenFit {
        eigenvalues,
        eigenvector,
        observations: rows,
    })
}

/// Outcome of a refresh attempt
#[derive(Debug, Clone, PartialEq)]
pub enum BetaRefresh {
    /// New snapshot to swap in
    Updated(BetaVector),
    /// Previous snapshot stays in force
    Kept(EstimationError),
}

/// Rolling hedge-ratio estimator with success/failure bookkeeping
#[derive(Debug, Clone)]
pub struct HedgeRatioEstimator {
    formation_window: usize,
    successes: u64,
    failures: u64,
    last_fit: Option<JohansenFit>,
}

impl HedgeRatioEstimator {
    pub fn new(formation_window: usize) -> Self {
        Self {
            formation_window,
            successes: 0,
            failures: 0,
            last_fit: None,
        }
    }

    /// Re-fit betas from the two windows.
    ///
    /// Never fails hard: any numerical problem is logged and reported as
    /// `Kept`, leaving `current` as the snapshot in force.
    pub fn refresh(&mut self, a: &[f64], b: &[f64], current: &BetaVector) -> BetaRefresh {
        match self.estimate(a, b, current) {
            Ok((fit, betas)) => {
                self.successes += 1;
                self.last_fit = Some(fit);
                tracing::debug!(
                    beta_a = betas.for_leg(Leg::A),
                    beta_b = betas.for_leg(Leg::B),
                    eigenvalue = fit.eigenvalues[0],
                    "Hedge ratio re-estimated"
                );
                BetaRefresh::Updated(betas)
            }
            Err(e) => {
                self.failures += 1;
                tracing::warn!(error = %e, "Failed to update betas, keeping previous estimate");
                BetaRefresh::Kept(e)
            }
        }
    }

    fn estimate(
        &self,
        a: &[f64],
        b: &[f64],
        current: &BetaVector,
    ) -> Result<(JohansenFit, BetaVector), EstimationError> {
        let required = self.formation_window.max(MIN_OBSERVATIONS);
        let got = a.len().min(b.len());
        if got < required {
            return Err(EstimationError::InsufficientData { required, got });
        }
        let fit = johansen(a, b)?;
        let [beta_a, beta_b] = fit.normalized_betas()?;
        let betas = BetaVector::new(
            current.instrument(Leg::A).clone(),
            beta_a,
            current.instrument(Leg::B).clone(),
            beta_b,
        );
        Ok((fit, betas))
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn last_fit(&self) -> Option<&JohansenFit> {
        self.last_fit.as_ref()
    }

    pub fn reset(&mut self) {
        self.successes = 0;
        self.failures = 0;
        self.last_fit = None;
    }
}

fn demean(rows: &mut [[f64; 2]]) {
    if rows.is_empty() {
        return;
    }
    let n = rows.len() as f64;
    for col in 0..2 {
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        for row in rows.iter_mut() {
            row[col] -= mean;
        }
    }
}

/// Σ u_iᵀ v_i
fn cross(u: &[[f64; 2]], v: &[[f64; 2]]) -> Mat2 {
    let mut m = [[0.0; 2]; 2];
    for (ui, vi) in u.iter().zip(v) {
        for p in 0..2 {
            for q in 0..2 {
                m[p][q] += ui[p] * vi[q];
            }
        }
    }
    Mat2(m)
}

/// y - x·(xᵀx)⁻¹xᵀy, column by column
fn residuals(y: &[[f64; 2]], x: &[[f64; 2]]) -> Result<Vec<[f64; 2]>, EstimationError> {
    let coef = cross(x, x).inverse("lagged difference")?.mul(&cross(x, y));
    Ok(y
        .iter()
        .zip(x)
        .map(|(yi, xi)| {
            let mut r = *yi;
            for (j, rj) in r.iter_mut().enumerate() {
                *rj -= xi[0] * coef.0[0][j] + xi[1] * coef.0[1][j];
            }
            r
        })
        .collect())
}

fn leading_eigenpair(m: &Mat2) -> Result<([f64; 2], [f64; 2]), EstimationError> {
    let [[a, b], [c, d]] = m.0;
    let half_trace = (a + d) / 2.0;
    let mut disc = half_trace * half_trace - m.det();
    // Similar to a symmetric PSD matrix, so roots are real up to rounding
    if disc < 0.0 {
        if disc < -SINGULAR_TOLERANCE * (half_trace * half_trace).max(1.0) {
            return Err(EstimationError::DegenerateEigenvector("complex eigenvalues"));
        }
        disc = 0.0;
    }
    let root = disc.sqrt();
    let lambda = half_trace + root;

    let from_row0 = [b, lambda - a];
    let from_row1 = [lambda - d, c];
    let norm0 = from_row0[0].hypot(from_row0[1]);
    let norm1 = from_row1[0].hypot(from_row1[1]);
    let (v, norm) = if norm0 >= norm1 {
        (from_row0, norm0)
    } else {
        (from_row1, norm1)
    };
    if !norm.is_finite() || norm <= ZERO_TOLERANCE * m.max_abs().max(f64::MIN_POSITIVE) {
        return Err(EstimationError::DegenerateEigenvector("repeated eigenvalue"));
    }
    Ok(([lambda, half_trace - root], [v[0] / norm, v[1] / norm]))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Mat2([[f64; 2]; 2]);

impl Mat2 {
    fn det(&self) -> f64 {
        self.0[0][0] * self.0[1][1] - self.0[0][1] * self.0[1][0]
    }

    fn max_abs(&self) -> f64 {
        self.0.iter().flatten().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    fn is_finite(&self) -> bool {
        self.0.iter().flatten().all(|v| v.is_finite())
    }

    fn scale(&self, k: f64) -> Mat2 {
        let [[a, b], [c, d]] = self.0;
        Mat2([[a * k, b * k], [c * k, d * k]])
    }

    fn transpose(&self) -> Mat2 {
        let [[a, b], [c, d]] = self.0;
        Mat2([[a, c], [b, d]])
    }

    fn mul(&self, other: &Mat2) -> Mat2 {
        let mut out = [[0.0; 2]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.0[i][0] * other.0[0][j] + self.0[i][1] * other.0[1][j];
            }
        }
        Mat2(out)
    }

    fn inverse(&self, name: &'static str) -> Result<Mat2, EstimationError> {
        let det = self.det();
        let scale = self.max_abs();
        if !det.is_finite() || det.abs() <= SINGULAR_TOLERANCE * scale * scale {
            return Err(EstimationError::SingularMatrix(name));
        }
        let [[a, b], [c, d]] = self.0;
        Ok(Mat2([[d / det, -b / det], [-c / det, a / det]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::synthetic::{generate_pair, SyntheticPairConfig};
    use approx::assert_relative_eq;

    fn current() -> BetaVector {
        BetaVector::new("A".into(), 1.0, "B".into(), -1.0)
    }

    fn synthetic(bars: usize, ratio: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let pair = generate_pair(&SyntheticPairConfig {
            bars,
            ratio,
            noise: 0.5,
            seed,
            ..Default::default()
        });
        (pair.leg_a, pair.leg_b)
    }

    #[test]
    fn test_mat2_inverse() {
        let m = Mat2([[4.0, 7.0], [2.0, 6.0]]);
        let inv = m.inverse("test").unwrap();
        let identity = m.mul(&inv);
        assert_relative_eq!(identity.0[0][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(identity.0[0][1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(identity.0[1][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_inverse_rejected() {
        let m = Mat2([[1.0, 2.0], [2.0, 4.0]]);
        assert_eq!(m.inverse("test"), Err(EstimationError::SingularMatrix("test")));
        assert!(Mat2([[0.0; 2]; 2]).inverse("zero").is_err());
    }

    #[test]
    fn test_leading_eigenpair_diagonal() {
        let (values, vector) = leading_eigenpair(&Mat2([[0.2, 0.0], [0.0, 0.7]])).unwrap();
        assert_relative_eq!(values[0], 0.7, epsilon = 1e-12);
        assert_relative_eq!(values[1], 0.2, epsilon = 1e-12);
        assert_relative_eq!(vector[0].abs(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(vector[1].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_leading_eigenpair_general() {
        // Eigenvalues 5 and 2; (1, 1) belongs to 5
        let (values, vector) = leading_eigenpair(&Mat2([[4.0, 1.0], [2.0, 3.0]])).unwrap();
        assert_relative_eq!(values[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(values[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(vector[0] / vector[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_repeated_eigenvalue_is_degenerate() {
        let result = leading_eigenpair(&Mat2([[0.3, 0.0], [0.0, 0.3]]));
        assert!(matches!(result, Err(EstimationError::DegenerateEigenvector(_))));
    }

    #[test]
    fn test_recovers_known_ratio() {
        let (a, b) = synthetic(500, 2.0, 7);
        let fit = johansen(&a, &b).unwrap();
        let betas = fit.normalized_betas().unwrap();
        assert_eq!(betas[1], -1.0);
        assert!((betas[0] - 2.0).abs() < 0.05, "beta_a = {}", betas[0]);
        assert!(fit.eigenvalues[0] >= fit.eigenvalues[1]);
    }

    #[test]
    fn test_ratio_converges_with_window() {
        for (bars, tolerance) in [(100, 0.25), (1000, 0.05)] {
            let (a, b) = synthetic(bars, 0.5, 11);
            let betas = johansen(&a, &b).unwrap().normalized_betas().unwrap();
            let ratio = -betas[0] / betas[1];
            assert!(
                (ratio - 0.5).abs() < tolerance,
                "bars={} ratio={} tolerance={}",
                bars,
                ratio,
                tolerance
            );
        }
    }

    #[test]
    fn test_constant_prices_fail() {
        let a = vec![100.0; 20];
        let b = vec![50.0; 20];
        assert!(matches!(johansen(&a, &b), Err(EstimationError::SingularMatrix(_))));
    }

    #[test]
    fn test_linear_prices_fail() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert!(johansen(&a, &b).is_err());
    }

    #[test]
    fn test_length_checks() {
        assert_eq!(
            johansen(&[1.0, 2.0], &[1.0, 2.0]),
            Err(EstimationError::InsufficientData { required: 3, got: 2 })
        );
        assert_eq!(
            johansen(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(EstimationError::LengthMismatch(3, 2))
        );
    }

    #[test]
    fn test_non_finite_prices_fail() {
        let mut a = vec![1.0, 2.5, 2.0, 3.5, 3.0];
        let b = vec![2.0, 4.0, 4.5, 6.0, 6.2];
        a[2] = f64::NAN;
        assert_eq!(johansen(&a, &b), Err(EstimationError::NonFinite("prices")));
    }

    #[test]
    fn test_refresh_updates_on_success() {
        let (a, b) = synthetic(300, 2.0, 3);
        let mut estimator = HedgeRatioEstimator::new(300);
        match estimator.refresh(&a, &b, &current()) {
            BetaRefresh::Updated(betas) => {
                assert_eq!(betas.instrument(Leg::A).as_str(), "A");
                assert_eq!(betas.for_leg(Leg::B), -1.0);
                assert!((betas.hedge_ratio().unwrap() - 2.0).abs() < 0.1);
            }
            BetaRefresh::Kept(e) => panic!("estimation failed: {}", e),
        }
        assert_eq!(estimator.successes(), 1);
        assert!(estimator.last_fit().is_some());
    }

    #[test]
    fn test_refresh_keeps_previous_on_failure() {
        let mut estimator = HedgeRatioEstimator::new(10);
        let a = vec![100.0; 10];
        let b = vec![100.0; 10];
        let refresh = estimator.refresh(&a, &b, &current());
        assert!(matches!(refresh, BetaRefresh::Kept(EstimationError::SingularMatrix(_))));
        assert_eq!(estimator.failures(), 1);
        assert_eq!(estimator.successes(), 0);
    }

    #[test]
    fn test_refresh_requires_full_window() {
        let (a, b) = synthetic(50, 2.0, 5);
        let mut estimator = HedgeRatioEstimator::new(100);
        let refresh = estimator.refresh(&a, &b, &current());
        assert_eq!(
            refresh,
            BetaRefresh::Kept(EstimationError::InsufficientData { required: 100, got: 50 })
        );
    }
}
