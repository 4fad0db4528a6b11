//! Seeded synthetic transaction data.
//!
//! Used by the `generate` CLI command, the integration tests, and the
//! benchmarks. Generation is deterministic for a given builder.

use crate::data::RawTable;
use crate::errors::SchemaError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Column names of the generated table, label last.
pub const COLUMNS: [&str; 9] = [
    "TransactionAmount",
    "TransactionTime",
    "CustomerAge",
    "CreditLimit",
    "AvailableBalance",
    "TransactionLocation",
    "CardNetwork",
    "CardType",
    "Fraud",
];

const LOCATIONS: [&str; 3] = ["Online", "Store", "ATM"];
const NETWORKS: [&str; 3] = ["Visa", "Mastercard", "Amex"];
const CARD_TYPES: [&str; 2] = ["Debit", "Credit"];

/// Builder for a synthetic fraud transaction table.
///
/// Amounts are lognormal and ages are clamped normal; the categorical
/// columns draw uniformly. An exact share of rows is labelled fraud and
/// their amounts are inflated by a factor between 2 and 5.
#[derive(Debug, Clone)]
pub struct TransactionGenerator {
    rows: usize,
    fraud_rate: f64,
    seed: u64,
}

impl TransactionGenerator {
    /// Creates a generator for the given number of rows with a 0.1%
    /// fraud rate and the default seed.
    #[must_use]
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            fraud_rate: 0.001,
            seed: 42,
        }
    }

    /// Sets the fraction of rows labelled fraud.
    #[must_use]
    pub fn with_fraud_rate(mut self, fraud_rate: f64) -> Self {
        self.fraud_rate = fraud_rate;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Generates the table.
    pub fn build(&self) -> Result<RawTable, SchemaError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut amounts = Vec::with_capacity(self.rows);
        let mut table = RawTable::new(COLUMNS.iter().map(|c| (*c).to_string()).collect())?;

        struct Draw {
            time: f64,
            age: f64,
            limit: f64,
            balance: f64,
            location: &'static str,
            network: &'static str,
            card_type: &'static str,
        }

        let mut draws = Vec::with_capacity(self.rows);
        for _ in 0..self.rows {
            amounts.push(lognormal(&mut rng, 3.0, 1.0));
            draws.push(Draw {
                time: rng.gen_range(0.0..86_400.0),
                age: normal(&mut rng, 45.0, 15.0).clamp(18.0, 80.0),
                limit: lognormal(&mut rng, 8.0, 0.5),
                balance: rng.gen_range(0.0..10_000.0),
                location: pick(&mut rng, &LOCATIONS),
                network: pick(&mut rng, &NETWORKS),
                card_type: pick(&mut rng, &CARD_TYPES),
            });
        }

        // An exact count of fraud rows, with inflated amounts.
        let fraud_count = fraud_count(self.rows, self.fraud_rate);
        let mut labels = vec![0u8; self.rows];
        for idx in rand::seq::index::sample(&mut rng, self.rows, fraud_count) {
            labels[idx] = 1;
            amounts[idx] *= rng.gen_range(2.0..5.0);
        }

        for (i, draw) in draws.iter().enumerate() {
            table.push_row(vec![
                Some(format!("{:.4}", amounts[i])),
                Some(format!("{:.4}", draw.time)),
                Some(format!("{:.4}", draw.age)),
                Some(format!("{:.4}", draw.limit)),
                Some(format!("{:.4}", draw.balance)),
                Some(draw.location.to_string()),
                Some(draw.network.to_string()),
                Some(draw.card_type.to_string()),
                Some(labels[i].to_string()),
            ])?;
        }

        Ok(table)
    }
}

fn fraud_count(rows: usize, rate: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (rows as f64 * rate.max(0.0)) as usize;
    count.min(rows)
}

/// Blanks one feature cell in each of `count` distinct rows, never
/// touching the label column.
pub fn punch_missing(table: &RawTable, count: usize, seed: u64) -> Result<RawTable, SchemaError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows: Vec<Vec<Option<String>>> = table.rows().to_vec();
    let feature_cols = table.n_cols().saturating_sub(1);

    if feature_cols > 0 && !rows.is_empty() {
        for idx in rand::seq::index::sample(&mut rng, rows.len(), count.min(rows.len())) {
            let col = rng.gen_range(0..feature_cols);
            rows[idx][col] = None;
        }
    }

    let mut punched = RawTable::new(table.columns().to_vec())?;
    for row in rows {
        punched.push_row(row)?;
    }
    Ok(punched)
}

/// One standard normal draw via the Box-Muller transform, shifted and
/// scaled.
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    let radius = (-2.0 * u1.ln()).sqrt();
    mean + std_dev * radius * (std::f64::consts::TAU * u2).cos()
}

fn lognormal(rng: &mut StdRng, mu: f64, sigma: f64) -> f64 {
    normal(rng, mu, sigma).exp()
}

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}
