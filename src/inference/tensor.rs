// src/inference/tensor.rs
//! Wire shapes shared by the vectorizer and the classifier.

use serde::{Deserialize, Serialize};

use crate::error::RemoteCallError;

/// Dense tensor as exchanged with both services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<i64>,
    pub values: Vec<f64>,
}

impl Tensor {
    /// Number of elements the shape describes, `None` on overflow or a negative dimension.
    pub fn element_count(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1i64, |acc, d| if *d < 0 { None } else { acc.checked_mul(*d) })
            .and_then(|n| usize::try_from(n).ok())
    }

    pub fn is_consistent(&self) -> bool {
        self.element_count() == Some(self.values.len())
    }

    /// Same values under a declared shape; the values are not checked against it.
    pub fn reshaped(&self, shape: &[i64]) -> Tensor {
        Tensor {
            shape: shape.to_vec(),
            values: self.values.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorData {
    pub tensor: Tensor,
}

/// `{"data":{"tensor":{...}}}`, used for both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorEnvelope {
    pub data: TensorData,
}

impl TensorEnvelope {
    pub fn new(tensor: Tensor) -> Self {
        Self {
            data: TensorData { tensor },
        }
    }

    pub fn into_tensor(self) -> Tensor {
        self.data.tensor
    }
}

#[derive(Debug, Serialize)]
pub struct VectorizeRequest<'a> {
    #[serde(rename = "strData")]
    pub str_data: &'a str,
}

/// Classifier output: `values[0]` is the confidence in the predicted class,
/// `values[1]` the predicted class label (0 or 1) encoded as a float.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    values: Vec<f64>,
}

impl ClassificationResult {
    /// Requires at least two values, a finite raw probability in `[0, 1]`,
    /// and a label of exactly `0.0` or `1.0`.
    pub fn from_values(values: Vec<f64>) -> Result<Self, RemoteCallError> {
        if values.len() < 2 {
            return Err(RemoteCallError::Decode(format!(
                "classifier returned {} values, expected at least 2",
                values.len()
            )));
        }
        let p = values[0];
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(RemoteCallError::Decode(format!(
                "classifier probability out of range: {p}"
            )));
        }
        let label = values[1];
        if label != 0.0 && label != 1.0 {
            return Err(RemoteCallError::Decode(format!(
                "classifier label is not a binary class: {label}"
            )));
        }
        Ok(Self { values })
    }

    pub fn raw_probability(&self) -> f64 {
        self.values[0]
    }

    /// Always 0 or 1; anything else is rejected on decode.
    pub fn predicted_class(&self) -> i32 {
        self.values[1] as i32
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
