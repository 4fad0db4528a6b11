//! Named feature vectors for inference.

use crate::data::FeatureSchema;
use crate::errors::SchemaError;
use serde::{Deserialize, Serialize};

/// One transaction's features, as ordered name/value pairs.
///
/// The serving layer requires schema order; [`FeatureRecord::arranged`]
/// turns arbitrarily-ordered input (a parsed JSON object, say) into a
/// schema-ordered record first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pairs: Vec<(String, f64)>,
}

impl FeatureRecord {
    /// Creates a record from ordered pairs.
    #[must_use]
    pub fn new(pairs: Vec<(String, f64)>) -> Self {
        Self { pairs }
    }

    /// The feature names, in record order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.pairs.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The feature values, in record order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.pairs.iter().map(|(_, value)| *value).collect()
    }

    /// Number of features in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true when the record carries no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Reorders the pairs into schema order.
    ///
    /// The record must carry exactly the schema's features; only their
    /// order may differ.
    pub fn arranged(&self, schema: &FeatureSchema) -> Result<Self, SchemaError> {
        if self.pairs.len() != schema.len() {
            return Err(SchemaError::WrongArity {
                expected: schema.len(),
                found: self.pairs.len(),
            });
        }
        for (name, _) in &self.pairs {
            if schema.position(name).is_none() {
                return Err(SchemaError::UnknownFeature {
                    feature: name.clone(),
                });
            }
        }

        let mut pairs = Vec::with_capacity(schema.len());
        for feature in schema.features() {
            match self.pairs.iter().find(|(name, _)| name == feature) {
                Some((name, value)) => pairs.push((name.clone(), *value)),
                None => {
                    return Err(SchemaError::MissingFeature {
                        feature: feature.clone(),
                    })
                }
            }
        }
        Ok(Self { pairs })
    }
}
