//! Data handling: ingestion and preprocessing.
//!
//! This module contains the table model and the two data stages:
//! - [`RawTable`] with explicit missing markers and CSV parsing
//! - [`DataIngestor`]: fetch, land, and concatenate the raw sources
//! - [`DataProcessor`]: clean, encode, split, and scale

mod encode;
mod ingest;
mod preprocess;
mod scaler;
mod schema;
mod split;
mod table;

pub use encode::{encode_table, parse_number, CategoryEncoder, EncodedTable};
pub use ingest::DataIngestor;
pub use preprocess::{DataProcessor, PreparedData};
pub use scaler::StandardScaler;
pub use schema::FeatureSchema;
pub use split::{train_test_split, SplitData};
pub use table::{is_missing, RawTable};
