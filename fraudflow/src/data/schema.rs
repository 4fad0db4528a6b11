//! Ordered feature schema.
//!
//! The schema fixes the feature names and their order at preprocessing time.
//! Every consumer (training, evaluation, inference) must supply features in
//! this exact order; the schema is persisted as an artifact alongside the
//! scaler and model.

use crate::errors::SchemaError;
use serde::{Deserialize, Serialize};

/// The ordered list of feature names the model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<String>,
}

impl FeatureSchema {
    /// Creates a schema from ordered feature names.
    #[must_use]
    pub fn new(features: Vec<String>) -> Self {
        Self { features }
    }

    /// Returns the feature names in order.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Returns the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if the schema has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns the position of a feature, if present.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f == name)
    }

    /// Validates that the supplied names match the schema exactly: same
    /// arity, same names, same order.
    pub fn validate_names(&self, names: &[&str]) -> Result<(), SchemaError> {
        if names.len() != self.features.len() {
            return Err(SchemaError::WrongArity {
                expected: self.features.len(),
                found: names.len(),
            });
        }

        for name in names {
            if self.position(name).is_none() {
                return Err(SchemaError::UnknownFeature {
                    feature: (*name).to_string(),
                });
            }
        }
        for feature in &self.features {
            if !names.contains(&feature.as_str()) {
                return Err(SchemaError::MissingFeature {
                    feature: feature.clone(),
                });
            }
        }
        for (position, (supplied, expected)) in
            names.iter().zip(&self.features).enumerate()
        {
            if supplied != expected {
                return Err(SchemaError::FeatureOrder {
                    position,
                    expected: expected.clone(),
                    found: (*supplied).to_string(),
                });
            }
        }

        Ok(())
    }
}
