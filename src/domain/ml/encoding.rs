//! Label encoding for categorical columns.
//!
//! Tables are fitted once during training and are read-only afterwards. Values
//! never seen during fit fall back in three explicit tiers, see [`EncodeOutcome`].

use super::feature_schema::UNKNOWN_CATEGORY;
use crate::domain::errors::{ValuationError, ValuationResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Result of encoding a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOutcome {
    /// Value was observed during fit.
    Known(u32),
    /// Unseen value, mapped to the code of the `"unknown"` sentinel.
    UnknownSentinel(u32),
    /// Unseen value and no sentinel in the table.
    DefaultZero,
}

impl EncodeOutcome {
    pub fn code(&self) -> u32 {
        match self {
            EncodeOutcome::Known(code) | EncodeOutcome::UnknownSentinel(code) => *code,
            EncodeOutcome::DefaultZero => 0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self, EncodeOutcome::Known(_))
    }
}

/// Bijection between the distinct values of one column and dense codes `0..k`.
///
/// Codes follow the lexical order of the values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingTable {
    codes: BTreeMap<String, u32>,
}

impl EncodingTable {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value.to_string(), code as u32))
            .collect();
        Self { codes }
    }

    pub fn encode(&self, value: &str) -> EncodeOutcome {
        if let Some(code) = self.codes.get(value) {
            return EncodeOutcome::Known(*code);
        }
        match self.codes.get(UNKNOWN_CATEGORY) {
            Some(code) => EncodeOutcome::UnknownSentinel(*code),
            None => EncodeOutcome::DefaultZero,
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }

    /// Values ordered by code.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }
}

/// Encoding tables keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSet {
    tables: BTreeMap<String, EncodingTable>,
}

impl EncoderSet {
    /// Fits one table per column. `column_values` yields, for each column, the
    /// value of every training row.
    pub fn fit<'a, I, V>(column_values: I) -> ValuationResult<Self>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: IntoIterator<Item = &'a str>,
    {
        let mut tables = BTreeMap::new();
        for (column, values) in column_values {
            let table = EncodingTable::fit(values);
            if table.is_empty() {
                return Err(ValuationError::InsufficientData {
                    rows: 0,
                    required: 1,
                });
            }
            tables.insert(column.to_string(), table);
        }
        Ok(Self { tables })
    }

    pub fn table(&self, column: &str) -> ValuationResult<&EncodingTable> {
        self.tables
            .get(column)
            .ok_or_else(|| ValuationError::SchemaMismatch {
                column: column.to_string(),
            })
    }

    /// Encodes one value. Unseen values never fail; a column without a table does.
    pub fn transform(&self, column: &str, value: &str) -> ValuationResult<EncodeOutcome> {
        let outcome = self.table(column)?.encode(value);
        match outcome {
            EncodeOutcome::Known(_) => {}
            EncodeOutcome::UnknownSentinel(code) => {
                debug!(column, value, tier = "unknown_sentinel", code, "Unseen category");
            }
            EncodeOutcome::DefaultZero => {
                debug!(column, value, tier = "default_zero", code = 0, "Unseen category");
            }
        }
        Ok(outcome)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
