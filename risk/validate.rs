//! Diagnostic validation of a score against a reference population.
//!
//! For a chosen instrument this computes the 2x2 confusion table at the
//! clinical cut-point, the derived sensitivity/specificity/PPV/NPV, an
//! optional percentile rank for one new patient, and the odds ratio from a
//! single-predictor logistic regression of outcome on the raw score. The
//! regression is fitted by iteratively reweighted least squares with the
//! usual logit clamping; a fit that diverges or separates is a typed error,
//! never a defaulted value.
//!
//! Everything here is a pure function of its inputs. Results are recomputed
//! on every request and never cached or persisted.

use crate::scores::{ScoreName, ScoredAdmission};
use ndarray::{Array1, ArrayView1};
use serde::Serialize;
use thiserror::Error;

const MAX_IRLS_ITERATIONS: usize = 50;
const CONVERGENCE_TOLERANCE: f64 = 1e-8;
/// A slope magnitude beyond this is a diverging fit: the odds ratio would
/// exceed e^12 per point, which only (quasi-)separated data produces.
const SEPARATION_BOUND: f64 = 12.0;
const MIN_WEIGHT: f64 = 1e-6;
const PROB_EPS: f64 = 1e-8;

/// Errors from the logistic regression fit.
#[derive(Error, Debug, PartialEq)]
pub enum RegressionError {
    #[error("logistic regression did not converge after {0} iterations")]
    DidNotConverge(usize),
    #[error("complete or quasi-complete separation detected; the odds ratio is not estimable")]
    Separation,
    #[error("the score column is constant; the odds ratio is not estimable")]
    ConstantScore,
    #[error("the outcome column is constant; the odds ratio is not estimable")]
    ConstantOutcome,
    #[error("too few usable rows for regression: found {found}, need at least {required}")]
    TooFewRows { found: usize, required: usize },
}

/// Minimum usable rows before a regression is attempted.
const MINIMUM_ROWS: usize = 10;

/// The 2x2 cross-tabulation of classification against outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_negative: u64,
}

impl ConfusionMatrix {
    /// Tabulate (score, outcome) pairs at a cut-point: scores at or above
    /// the cut-point are classified positive.
    #[must_use]
    pub fn tabulate(pairs: &[(u32, bool)], cut_point: u32) -> Self {
        let mut counts = Self::default();
        for &(score, outcome) in pairs {
            let predicted = score >= cut_point;
            match (outcome, predicted) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (true, false) => counts.false_negative += 1,
                (false, false) => counts.true_negative += 1,
            }
        }
        counts
    }

    /// TP / (TP + FN), as a rounded integer percent.
    #[must_use]
    pub fn sensitivity(&self) -> Option<i64> {
        percent(self.true_positive, self.true_positive + self.false_negative)
    }

    /// TN / (TN + FP), as a rounded integer percent.
    #[must_use]
    pub fn specificity(&self) -> Option<i64> {
        percent(self.true_negative, self.true_negative + self.false_positive)
    }

    /// TP / (TP + FP), as a rounded integer percent.
    #[must_use]
    pub fn positive_predictive_value(&self) -> Option<i64> {
        percent(self.true_positive, self.true_positive + self.false_positive)
    }

    /// TN / (TN + FN), as a rounded integer percent.
    #[must_use]
    pub fn negative_predictive_value(&self) -> Option<i64> {
        percent(self.true_negative, self.true_negative + self.false_negative)
    }
}

/// A metric with a zero denominator is not computable, not zero.
fn percent(numerator: u64, denominator: u64) -> Option<i64> {
    if denominator == 0 {
        return None;
    }
    Some((100.0 * numerator as f64 / denominator as f64).round() as i64)
}

/// Proportion of the reference scores strictly below the patient's score,
/// rounded to the nearest integer percent. `None` for an empty reference.
#[must_use]
pub fn percentile(reference: &[u32], patient: u32) -> Option<u32> {
    if reference.is_empty() {
        return None;
    }
    let below = reference.iter().filter(|&&s| s < patient).count();
    Some((100.0 * below as f64 / reference.len() as f64).round() as u32)
}

/// Odds ratio per score point with its 95% Wald interval, all on the odds
/// ratio scale and rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsRatio {
    pub estimate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Fit `outcome ~ intercept + score` by IRLS and return the exponentiated
/// slope with its Wald interval.
pub fn fit_logistic(
    scores: ArrayView1<f64>,
    outcomes: ArrayView1<f64>,
) -> Result<OddsRatio, RegressionError> {
    let n = scores.len();
    if n < MINIMUM_ROWS {
        return Err(RegressionError::TooFewRows {
            found: n,
            required: MINIMUM_ROWS,
        });
    }
    if scores.iter().all(|&s| s == scores[0]) {
        return Err(RegressionError::ConstantScore);
    }
    if outcomes.iter().all(|&y| y == outcomes[0]) {
        return Err(RegressionError::ConstantOutcome);
    }

    let mut beta0 = 0.0_f64;
    let mut beta1 = 0.0_f64;

    for _ in 0..MAX_IRLS_ITERATIONS {
        let eta: Array1<f64> = scores.mapv(|x| (beta0 + beta1 * x).clamp(-700.0, 700.0));
        let mu: Array1<f64> =
            eta.mapv(|e| (1.0 / (1.0 + (-e).exp())).clamp(PROB_EPS, 1.0 - PROB_EPS));
        let weights: Array1<f64> = mu.mapv(|m| (m * (1.0 - m)).max(MIN_WEIGHT));
        // Working response for the weighted least-squares step.
        let z: Array1<f64> = &eta + &((&outcomes.to_owned() - &mu) / &weights);

        // Normal equations of the 2-column design [1, x], solved in closed
        // form.
        let mut s00 = 0.0;
        let mut s01 = 0.0;
        let mut s11 = 0.0;
        let mut t0 = 0.0;
        let mut t1 = 0.0;
        for i in 0..n {
            let (w, x, zi) = (weights[i], scores[i], z[i]);
            s00 += w;
            s01 += w * x;
            s11 += w * x * x;
            t0 += w * zi;
            t1 += w * x * zi;
        }
        let det = s00 * s11 - s01 * s01;
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return Err(RegressionError::Separation);
        }

        let next0 = (s11 * t0 - s01 * t1) / det;
        let next1 = (s00 * t1 - s01 * t0) / det;
        if !next0.is_finite() || !next1.is_finite() {
            return Err(RegressionError::Separation);
        }
        if next1.abs() > SEPARATION_BOUND {
            return Err(RegressionError::Separation);
        }

        let delta = (next0 - beta0).abs().max((next1 - beta1).abs());
        beta0 = next0;
        beta1 = next1;

        if delta < CONVERGENCE_TOLERANCE {
            // Var(beta1) is the lower-right entry of the inverse information
            // matrix.
            let variance = s00 / det;
            if !variance.is_finite() || variance <= 0.0 {
                return Err(RegressionError::Separation);
            }
            let se = variance.sqrt();
            return Ok(OddsRatio {
                estimate: round2(beta1.exp()),
                ci_lower: round2((beta1 - 1.96 * se).exp()),
                ci_upper: round2((beta1 + 1.96 * se).exp()),
            });
        }
    }
    Err(RegressionError::DidNotConverge(MAX_IRLS_ITERATIONS))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The full diagnostic bundle for one instrument against the reference
/// population.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub score: ScoreName,
    pub cut_point: u32,
    /// Percentile rank of the supplied patient score, when one was given.
    pub percentile: Option<u32>,
    pub counts: ConfusionMatrix,
    pub sensitivity: Option<i64>,
    pub specificity: Option<i64>,
    pub positive_predictive_value: Option<i64>,
    pub negative_predictive_value: Option<i64>,
    /// `None` when the regression was not computable; the reason is logged.
    pub odds_ratio: Option<OddsRatio>,
}

/// Validate one instrument against the reference population, optionally
/// ranking a new patient's score within it.
///
/// Records whose score or outcome is undefined are excluded row-locally;
/// they never abort the computation.
#[must_use]
pub fn validate_score(
    population: &[ScoredAdmission],
    name: ScoreName,
    patient_score: Option<u32>,
) -> ValidationResult {
    let def = name.definition();

    let pairs: Vec<(u32, bool)> = population
        .iter()
        .filter_map(|row| Some((row.scores.get(name)?, row.record.af?)))
        .collect();

    let reference: Vec<u32> = population
        .iter()
        .filter_map(|row| row.scores.get(name))
        .collect();

    let counts = ConfusionMatrix::tabulate(&pairs, def.cut_point);

    let score_column: Array1<f64> = pairs.iter().map(|&(s, _)| f64::from(s)).collect();
    let outcome_column: Array1<f64> =
        pairs.iter().map(|&(_, y)| if y { 1.0 } else { 0.0 }).collect();
    let odds_ratio = match fit_logistic(score_column.view(), outcome_column.view()) {
        Ok(estimate) => Some(estimate),
        Err(e) => {
            log::warn!("{name}: odds ratio not computable: {e}");
            None
        }
    };

    ValidationResult {
        score: name,
        cut_point: def.cut_point,
        percentile: patient_score.and_then(|s| percentile(&reference, s)),
        counts,
        sensitivity: counts.sensitivity(),
        specificity: counts.specificity(),
        positive_predictive_value: counts.positive_predictive_value(),
        negative_predictive_value: counts.negative_predictive_value(),
        odds_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn perfectly_separated_population_has_perfect_diagnostics_at_cut_five() {
        // 100 records, scores uniform 0..=10, outcome exactly score >= 5.
        let pairs: Vec<(u32, bool)> = (0..100u32).map(|i| (i % 11, i % 11 >= 5)).collect();
        let counts = ConfusionMatrix::tabulate(&pairs, 5);
        assert_eq!(counts.sensitivity(), Some(100));
        assert_eq!(counts.specificity(), Some(100));
        assert_eq!(counts.false_positive, 0);
        assert_eq!(counts.false_negative, 0);
    }

    #[test]
    fn metrics_with_zero_denominator_are_not_computable() {
        // All outcomes negative: sensitivity has an empty denominator.
        let pairs: Vec<(u32, bool)> = (0..20).map(|i| (i % 5, false)).collect();
        let counts = ConfusionMatrix::tabulate(&pairs, 3);
        assert_eq!(counts.sensitivity(), None);
        assert!(counts.specificity().is_some());
    }

    #[test]
    fn percentile_is_bounded_and_zero_at_the_minimum() {
        let reference: Vec<u32> = (0..=10).collect();
        assert_eq!(percentile(&reference, 0), Some(0));
        assert_eq!(percentile(&reference, 11), Some(100));
        for s in 0..=11 {
            let p = percentile(&reference, s).unwrap();
            assert!(p <= 100);
        }
        assert_eq!(percentile(&[], 3), None);
    }

    #[test]
    fn percentile_counts_strictly_below() {
        let reference = [2, 2, 2, 5];
        assert_eq!(percentile(&reference, 2), Some(0));
        assert_eq!(percentile(&reference, 3), Some(75));
    }

    #[test]
    fn logistic_fit_recovers_a_positive_association() {
        // Noisy synthetic population: P(outcome) rises with the score.
        let mut rng = StdRng::seed_from_u64(17);
        let mut scores = Vec::new();
        let mut outcomes = Vec::new();
        for _ in 0..400 {
            let s = rng.gen_range(0..=10) as f64;
            let p = 1.0 / (1.0 + (-(-2.0 + 0.5 * s)).exp());
            scores.push(s);
            outcomes.push(if rng.gen_bool(p) { 1.0 } else { 0.0 });
        }
        let or = fit_logistic(
            Array1::from(scores).view(),
            Array1::from(outcomes).view(),
        )
        .unwrap();
        // True slope 0.5 means a true odds ratio around 1.65.
        assert!(or.estimate > 1.2 && or.estimate < 2.2, "estimate {}", or.estimate);
        assert!(or.ci_lower < or.estimate && or.estimate < or.ci_upper);
    }

    #[test]
    fn separation_is_a_typed_error() {
        let scores: Array1<f64> = (0..40).map(|i| f64::from(i % 11)).collect();
        let outcomes: Array1<f64> = (0..40)
            .map(|i| if i % 11 >= 5 { 1.0 } else { 0.0 })
            .collect();
        let err = fit_logistic(scores.view(), outcomes.view()).unwrap_err();
        assert!(
            matches!(err, RegressionError::Separation | RegressionError::DidNotConverge(_)),
            "unexpected error {err}"
        );
    }

    #[test]
    fn degenerate_columns_are_rejected() {
        let constant: Array1<f64> = Array1::from_elem(20, 3.0);
        let varying: Array1<f64> = (0..20).map(f64::from).collect();
        let outcomes: Array1<f64> = (0..20).map(|i| f64::from(i % 2)).collect();
        assert_eq!(
            fit_logistic(constant.view(), outcomes.view()).unwrap_err(),
            RegressionError::ConstantScore
        );
        let all_negative: Array1<f64> = Array1::zeros(20);
        assert_eq!(
            fit_logistic(varying.view(), all_negative.view()).unwrap_err(),
            RegressionError::ConstantOutcome
        );
        let short: Array1<f64> = Array1::zeros(3);
        assert!(matches!(
            fit_logistic(short.view(), short.view()).unwrap_err(),
            RegressionError::TooFewRows { found: 3, .. }
        ));
    }

    #[test]
    fn validation_excludes_rows_with_undefined_score_or_outcome() {
        use crate::records::AdmissionRecord;
        use crate::scores::{ScoreSet, ScoredAdmission};

        let mut population = Vec::new();
        for i in 0..30 {
            let mut record = AdmissionRecord::new(i, i * 10);
            record.af = if i == 0 { None } else { Some(i % 3 == 0) };
            let mut scores = ScoreSet::default();
            scores.npoaf = if i == 1 { None } else { Some((i % 6) as u32) };
            population.push(ScoredAdmission { record, scores });
        }

        let result = validate_score(&population, ScoreName::Npoaf, Some(0));
        let total = result.counts.true_positive
            + result.counts.false_positive
            + result.counts.false_negative
            + result.counts.true_negative;
        // Two rows drop: one missing outcome, one missing score.
        assert_eq!(total, 28);
        assert_eq!(result.cut_point, 2);
        assert_eq!(result.percentile, Some(0));
    }
}
