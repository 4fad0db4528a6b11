//! Fixtures shared by tests, benchmarks, and the `generate` command.

mod fixtures;

pub use fixtures::{punch_missing, TransactionGenerator, COLUMNS};
