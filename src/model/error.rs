//! Model errors

use thiserror::Error;

use crate::{
    customers::CustomerId, probabilities::SegmentId, tables::SchemaError, variants::Variant,
};

/// The customer/probability join is not one-to-one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinIntegrityError {
    /// No probability row matches the customer's categories.
    #[error("customer {customer_id} has no probability row for ({age_cat}, {freq_cat})")]
    MissingProbability {
        /// Customer without a match
        customer_id: CustomerId,

        /// Age category of the customer
        age_cat: String,

        /// Frequency category of the customer
        freq_cat: String,
    },

    /// Several probability rows match the customer's categories.
    #[error(
        "customer {customer_id} matches {rows} probability rows for ({age_cat}, {freq_cat})"
    )]
    DuplicateProbability {
        /// Customer with several matches
        customer_id: CustomerId,

        /// Age category of the customer
        age_cat: String,

        /// Frequency category of the customer
        freq_cat: String,

        /// Number of matching rows
        rows: usize,
    },
}

/// Errors that can occur while building a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An input table does not have the expected shape.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Customers and probabilities do not join one-to-one.
    #[error(transparent)]
    JoinIntegrity(#[from] JoinIntegrityError),

    /// Money amount in minor units cannot be represented exactly as a model coefficient.
    #[error(
        "money amount in minor units cannot be represented exactly as a model coefficient: {0}"
    )]
    MinorUnitsNotRepresentable(i64),

    /// A fairness right-hand side cannot be represented as a model coefficient.
    #[error("fairness threshold for segment {segment}, variant {variant} is not representable")]
    ThresholdNotRepresentable {
        /// Segment of the constraint
        segment: SegmentId,

        /// Variant of the constraint
        variant: Variant,
    },
}
