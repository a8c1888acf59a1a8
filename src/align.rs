// src/align.rs
//! Probability alignment: re-bases the classifier's confidence onto the positive class.

use serde::Serialize;

use crate::inference::ClassifierOutcome;

/// Caller-facing classifier result. `predicted_class` is -1 when undetermined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedOutcome {
    pub probability: f64,
    pub predicted_class: i32,
}

impl AlignedOutcome {
    pub const UNDETERMINED: AlignedOutcome = AlignedOutcome {
        probability: 0.0,
        predicted_class: -1,
    };

    pub fn is_determined(&self) -> bool {
        self.predicted_class != -1
    }

    /// Probability of class 1, whichever class the model predicted.
    pub fn positive_probability(&self) -> f64 {
        normalize_to_positive_class(self.predicted_class, self.probability)
    }
}

/// Raw pair as reported by the classifier, or the undetermined sentinel.
pub fn align(outcome: &ClassifierOutcome) -> AlignedOutcome {
    match outcome {
        ClassifierOutcome::Success(r) => AlignedOutcome {
            probability: r.raw_probability(),
            predicted_class: r.predicted_class(),
        },
        ClassifierOutcome::Unavailable => AlignedOutcome::UNDETERMINED,
    }
}

/// The model reports confidence in the class it predicted; this turns it into
/// confidence in class 1.
pub fn normalize_to_positive_class(predicted_class: i32, probability: f64) -> f64 {
    if predicted_class != 1 {
        1.0 - probability
    } else {
        probability
    }
}

/// Round to `places` decimals, ties away from zero (not banker's rounding).
pub fn round_half_away(x: f64, places: i32) -> f64 {
    let shift = 10f64.powi(places);
    let shifted = x * shift;
    let t = shifted.trunc();
    let rounded = if (shifted - t).abs() >= 0.5 {
        t + 1f64.copysign(shifted)
    } else {
        t
    };
    rounded / shift
}

/// Probability as a percentage with two decimals, for display.
pub fn to_percentage(probability: f64) -> f64 {
    round_half_away(probability * 100.0, 2)
}
