//! Customers

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::tables::{SchemaError, Table};

const TABLE: &str = "customers";

/// Unique customer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A campaign recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier
    pub customer_id: CustomerId,

    /// Age category
    pub age_cat: String,

    /// Visit frequency category
    pub freq_cat: String,
}

impl Customer {
    /// Create a new customer.
    pub fn new(id: i64, age_cat: impl Into<String>, freq_cat: impl Into<String>) -> Self {
        Self {
            customer_id: CustomerId(id),
            age_cat: age_cat.into(),
            freq_cat: freq_cat.into(),
        }
    }
}

/// Non-empty list of customers with unique identifiers, in input order.
#[derive(Debug, Clone)]
pub struct Customers {
    customers: Vec<Customer>,
}

impl Customers {
    /// Create a validated customer list.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Empty`] if there are no customers and
    /// [`SchemaError::DuplicateKey`] if a `customer_id` appears twice.
    pub fn new(customers: Vec<Customer>) -> Result<Self, SchemaError> {
        if customers.is_empty() {
            return Err(SchemaError::Empty { table: TABLE });
        }

        let mut seen = FxHashSet::default();

        for customer in &customers {
            if !seen.insert(customer.customer_id) {
                return Err(SchemaError::DuplicateKey {
                    table: TABLE,
                    key: customer.customer_id.to_string(),
                });
            }
        }

        Ok(Self { customers })
    }

    /// Read customers from a table with `customer_id`, `age_cat` and `freq_cat` columns.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if a column is missing, a value has the wrong
    /// type, or the resulting list is empty or has duplicate identifiers.
    pub fn from_table(table: &Table) -> Result<Self, SchemaError> {
        // An empty payload carries no columns either; report it as empty.
        if table.is_empty() {
            return Err(SchemaError::Empty { table: TABLE });
        }

        let id = table.column(TABLE, "customer_id")?;
        let age = table.column(TABLE, "age_cat")?;
        let freq = table.column(TABLE, "freq_cat")?;

        let customers = table
            .rows()
            .enumerate()
            .map(|(idx, row)| {
                Ok(Customer {
                    customer_id: CustomerId(id.integer(idx, row)?),
                    age_cat: age.label(idx, row)?,
                    freq_cat: freq.label(idx, row)?,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Self::new(customers)
    }

    /// Iterate over the customers in input order.
    pub fn iter(&self) -> impl Iterator<Item = &Customer> {
        self.customers.iter()
    }

    /// Customers as a slice.
    pub fn as_slice(&self) -> &[Customer] {
        &self.customers
    }

    /// Number of customers.
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    /// Always `false`; an empty list cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

impl TryFrom<&Table> for Customers {
    type Error = SchemaError;

    fn try_from(table: &Table) -> Result<Self, Self::Error> {
        Self::from_table(table)
    }
}
