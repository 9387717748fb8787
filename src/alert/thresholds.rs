//! Severity scoring and threshold labelling.
//!
//! A reading is reduced to a single dimensionless score, and the score is
//! bucketed into Safe / Warning / Critical by two ordered edges. Both steps
//! are pure: no state, no I/O, safe to call from any thread.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{LabeledReading, Reading, SeverityLabel};

/// Neutral humidity (%) in the score formula.
const HUMIDITY_REFERENCE: f64 = 100.0;

/// Reference sea-level pressure (hPa) in the score formula.
const PRESSURE_REFERENCE_HPA: f64 = 1020.0;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Severity score of a reading:
///
/// ```text
/// temperature + (100 - humidity) / 2 + (1020 - pressure)
/// ```
///
/// Out-of-range inputs are not rejected; NaN inputs propagate.
pub fn score(reading: &Reading) -> f64 {
    reading.temperature
        + (HUMIDITY_REFERENCE - reading.humidity) / 2.0
        + (PRESSURE_REFERENCE_HPA - reading.pressure)
}

// ---------------------------------------------------------------------------
// Threshold policy
// ---------------------------------------------------------------------------

/// Two ordered edges splitting the score line into three half-open buckets:
///
///   score < warning_at                →  Safe
///   warning_at <= score < critical_at →  Warning
///   score >= critical_at              →  Critical
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    pub warning_at: f64,
    pub critical_at: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            warning_at: 50.0,
            critical_at: 120.0,
        }
    }
}

impl SeverityPolicy {
    /// Labels a score. Total over f64: a NaN score compares false against
    /// both edges and lands in Critical.
    pub fn label(&self, score: f64) -> SeverityLabel {
        if score < self.warning_at {
            SeverityLabel::Safe
        } else if score < self.critical_at {
            SeverityLabel::Warning
        } else {
            SeverityLabel::Critical
        }
    }

    /// Edges must be finite and strictly ascending.
    pub fn check(&self) -> Result<(), String> {
        if !self.warning_at.is_finite() || !self.critical_at.is_finite() {
            return Err(format!(
                "severity edges must be finite (warning_at={}, critical_at={})",
                self.warning_at, self.critical_at
            ));
        }
        if self.warning_at >= self.critical_at {
            return Err(format!(
                "warning_at ({}) must be below critical_at ({})",
                self.warning_at, self.critical_at
            ));
        }
        Ok(())
    }
}

/// Labels a score with the default 50 / 120 policy.
pub fn label(score: f64) -> SeverityLabel {
    SeverityPolicy::default().label(score)
}

// ---------------------------------------------------------------------------
// Predictors
// ---------------------------------------------------------------------------

/// Anything that can turn a reading into a severity label.
///
/// The threshold scorer below is the built-in implementation; a trained
/// classifier can be plugged in through this trait without touching the
/// dispatcher.
pub trait Predictor: Send + Sync {
    fn predict(&self, reading: &Reading) -> SeverityLabel;
}

/// Scores a reading and asks `predictor` for its label.
///
/// The formula score is recorded whatever the predictor decides, so the
/// history and log stay comparable across predictors.
pub fn classify_with(
    predictor: &dyn Predictor,
    reading: Reading,
    observed_at: DateTime<Utc>,
) -> LabeledReading {
    LabeledReading {
        score: score(&reading),
        label: predictor.predict(&reading),
        reading,
        observed_at,
    }
}

/// Deterministic predictor: `score` followed by a `SeverityPolicy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdScorer {
    pub policy: SeverityPolicy,
}

impl ThresholdScorer {
    pub fn new(policy: SeverityPolicy) -> Self {
        Self { policy }
    }

    /// Scores and labels a reading observed at `observed_at`.
    pub fn classify_at(&self, reading: Reading, observed_at: DateTime<Utc>) -> LabeledReading {
        classify_with(self, reading, observed_at)
    }

    pub fn classify(&self, reading: Reading) -> LabeledReading {
        self.classify_at(reading, Utc::now())
    }
}

impl Predictor for ThresholdScorer {
    fn predict(&self, reading: &Reading) -> SeverityLabel {
        self.policy.label(score(reading))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
