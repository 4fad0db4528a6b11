//! Categorical encoding.
//!
//! Non-numeric columns are encoded to integer codes by a column-local
//! encoder. Codes follow first-seen distinct value order over the rows. No
//! inverse mapping is persisted; decoded values cannot be recovered from the
//! artifacts, which is a known limitation of the dataset contract.

use crate::data::RawTable;
use crate::errors::SchemaError;

/// Encodes the distinct values of one column to integer codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fits an encoder over the values, assigning codes in first-seen order.
    #[must_use]
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = Vec::new();
        for value in values {
            if !classes.iter().any(|c| c == value) {
                classes.push(value.to_string());
            }
        }
        Self { classes }
    }

    /// Returns the code of a value, `None` for unseen values.
    #[must_use]
    pub fn encode(&self, value: &str) -> Option<f64> {
        self.classes.iter().position(|c| c == value).map(|i| i as f64)
    }

    /// Returns the distinct values in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Returns the number of distinct values.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// A fully numeric view of a table, plus the encoders that produced it.
#[derive(Debug, Clone)]
pub struct EncodedTable {
    /// Column names in table order.
    pub columns: Vec<String>,
    /// Row-major numeric cells covering every column.
    pub matrix: Vec<Vec<f64>>,
    /// Per-column encoder, `Some` for columns that were label-encoded.
    pub encoders: Vec<Option<CategoryEncoder>>,
}

impl EncodedTable {
    /// Names of the columns that were label-encoded.
    #[must_use]
    pub fn encoded_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .zip(&self.encoders)
            .filter(|(_, enc)| enc.is_some())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Parses a cell as a number.
#[must_use]
pub fn parse_number(token: &str) -> Option<f64> {
    token.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Encodes every column of a complete table to numbers.
///
/// A column is numeric iff every cell parses as a finite float; all other
/// columns are label-encoded in first-seen order. The table must contain no
/// missing cells (rows with missing values are dropped before this step).
pub fn encode_table(table: &RawTable) -> Result<EncodedTable, SchemaError> {
    let n_cols = table.n_cols();
    let n_rows = table.n_rows();

    let mut encoders: Vec<Option<CategoryEncoder>> = Vec::with_capacity(n_cols);
    let mut columns_numeric: Vec<Vec<f64>> = Vec::with_capacity(n_cols);

    for col in 0..n_cols {
        let cells: Vec<&str> = table
            .column(col)
            .into_iter()
            .map(|cell| cell.unwrap_or(""))
            .collect();

        let parsed: Option<Vec<f64>> = cells.iter().map(|c| parse_number(c)).collect();
        match parsed {
            Some(values) => {
                columns_numeric.push(values);
                encoders.push(None);
            }
            None => {
                let encoder = CategoryEncoder::fit(cells.iter().copied());
                let codes = cells
                    .iter()
                    .map(|c| encoder.encode(c).ok_or_else(|| SchemaError::UnknownFeature {
                        feature: (*c).to_string(),
                    }))
                    .collect::<Result<Vec<f64>, SchemaError>>()?;
                columns_numeric.push(codes);
                encoders.push(Some(encoder));
            }
        }
    }

    let matrix = (0..n_rows)
        .map(|row| columns_numeric.iter().map(|col| col[row]).collect())
        .collect();

    Ok(EncodedTable {
        columns: table.columns().to_vec(),
        matrix,
        encoders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_code_order() {
        let encoder = CategoryEncoder::fit(["Store", "Online", "Store", "ATM", "Online"]);

        assert_eq!(encoder.classes(), ["Store", "Online", "ATM"]);
        assert_eq!(encoder.encode("Store"), Some(0.0));
        assert_eq!(encoder.encode("Online"), Some(1.0));
        assert_eq!(encoder.encode("ATM"), Some(2.0));
    }

    #[test]
    fn test_unseen_value_has_no_code() {
        let encoder = CategoryEncoder::fit(["Visa", "Mastercard"]);
        assert_eq!(encoder.encode("Amex"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number(" -3 "), Some(-3.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("Online"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_encode_table_mixed_columns() {
        let mut table = RawTable::new(vec![
            "amount".to_string(),
            "location".to_string(),
            "fraud".to_string(),
        ])
        .unwrap();
        for row in [
            ["12.5", "Online", "0"],
            ["3.0", "Store", "0"],
            ["99.0", "Online", "1"],
        ] {
            table
                .push_row(row.iter().map(|v| Some((*v).to_string())).collect())
                .unwrap();
        }

        let encoded = encode_table(&table).unwrap();

        assert_eq!(encoded.encoded_columns(), ["location"]);
        assert_eq!(encoded.matrix[0], vec![12.5, 0.0, 0.0]);
        assert_eq!(encoded.matrix[1], vec![3.0, 1.0, 0.0]);
        assert_eq!(encoded.matrix[2], vec![99.0, 0.0, 1.0]);
    }

    #[test]
    fn test_numeric_looking_strings_stay_numeric() {
        let mut table = RawTable::new(vec!["code".to_string(), "y".to_string()]).unwrap();
        for row in [["001", "0"], ["002", "1"]] {
            table
                .push_row(row.iter().map(|v| Some((*v).to_string())).collect())
                .unwrap();
        }

        let encoded = encode_table(&table).unwrap();
        assert!(encoded.encoders[0].is_none());
        assert_eq!(encoded.matrix[0][0], 1.0);
    }
}
