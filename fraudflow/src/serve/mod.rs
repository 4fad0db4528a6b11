//! Online inference over trained artifacts.

mod context;
mod record;

pub use context::{InferenceContext, Prediction};
pub use record::FeatureRecord;
