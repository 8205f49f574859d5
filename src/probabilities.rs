//! Segment Visit Probabilities

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    tables::{SchemaError, Table},
    variants::{Variant, VariantMap},
};

const TABLE: &str = "probabilities";

/// Segment label used for fairness bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub String);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        SegmentId(value.to_string())
    }
}

/// Visit probabilities for one `(age_cat, freq_cat)` combination.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProbability {
    /// Age category
    pub age_cat: String,

    /// Visit frequency category
    pub freq_cat: String,

    /// Segment the combination belongs to
    pub segment_id: SegmentId,

    /// Probability of a store visit under each variant
    pub probabilities: VariantMap<f64>,
}

impl SegmentProbability {
    /// Create a probability row.
    pub fn new(
        age_cat: impl Into<String>,
        freq_cat: impl Into<String>,
        segment_id: impl Into<SegmentId>,
        probabilities: VariantMap<f64>,
    ) -> Self {
        Self {
            age_cat: age_cat.into(),
            freq_cat: freq_cat.into(),
            segment_id: segment_id.into(),
            probabilities,
        }
    }

    /// Join key of this row.
    pub fn key(&self) -> (&str, &str) {
        (&self.age_cat, &self.freq_cat)
    }
}

/// Probability rows in input order.
///
/// Duplicate join keys are accepted here; they only become an error when a
/// customer references the duplicated combination.
#[derive(Debug, Clone, Default)]
pub struct SegmentProbabilities {
    rows: Vec<SegmentProbability>,
}

impl SegmentProbabilities {
    /// Create from rows.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::OutOfRange`] if any probability is not in `[0, 1]`.
    pub fn new(rows: Vec<SegmentProbability>) -> Result<Self, SchemaError> {
        for (row, probability) in rows.iter().enumerate() {
            for (variant, value) in probability.probabilities.iter() {
                if !(0.0..=1.0).contains(value) {
                    return Err(SchemaError::OutOfRange {
                        table: TABLE,
                        row,
                        column: variant.probability_column(),
                        value: *value,
                    });
                }
            }
        }

        Ok(Self { rows })
    }

    /// Read probabilities from a table with `age_cat`, `freq_cat`,
    /// `segment_id` and `prob_dm1`..`prob_dm3` columns.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if a column is missing or a value is invalid.
    pub fn from_table(table: &Table) -> Result<Self, SchemaError> {
        let age = table.column(TABLE, "age_cat")?;
        let freq = table.column(TABLE, "freq_cat")?;
        let segment = table.column(TABLE, "segment_id")?;
        let prob = VariantMap::new(
            table.column(TABLE, Variant::Baseline.probability_column())?,
            table.column(TABLE, Variant::Medium.probability_column())?,
            table.column(TABLE, Variant::Large.probability_column())?,
        );

        let rows = table
            .rows()
            .enumerate()
            .map(|(idx, row)| {
                Ok(SegmentProbability {
                    age_cat: age.label(idx, row)?,
                    freq_cat: freq.label(idx, row)?,
                    segment_id: SegmentId(segment.label(idx, row)?),
                    probabilities: VariantMap::new(
                        prob.baseline.probability(idx, row)?,
                        prob.medium.probability(idx, row)?,
                        prob.large.probability(idx, row)?,
                    ),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(Self { rows })
    }

    /// Iterate over the rows in input order.
    pub fn iter(&self) -> impl Iterator<Item = &SegmentProbability> {
        self.rows.iter()
    }

    /// Get a row by position.
    pub fn get(&self, idx: usize) -> Option<&SegmentProbability> {
        self.rows.get(idx)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<&Table> for SegmentProbabilities {
    type Error = SchemaError;

    fn try_from(table: &Table) -> Result<Self, Self::Error> {
        Self::from_table(table)
    }
}
