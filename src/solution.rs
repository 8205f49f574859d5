//! Campaign Solution
//!
//! Maps solved decision variables back to one row per customer, in the
//! model's customer order, with a 0/1 indicator column per variant.

use std::{fmt::Write as _, io};

use num_traits::ToPrimitive;
use rusty_money::{Money, iso::Currency};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{Alignment, Color, Style, object::{Columns, Rows}},
};
use thiserror::Error;
use tracing::debug;

use crate::{
    customers::CustomerId,
    model::{DecisionKey, Model},
    solvers::{Assignment, BINARY_THRESHOLD, SolveStatus, Solved},
    variants::{Variant, VariantMap},
};

/// Errors that can occur while extracting a solution.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    /// Extraction requires an optimal solve.
    #[error("no solution to extract: solver status is {status}")]
    NoSolution {
        /// Status of the solve
        status: SolveStatus,
    },

    /// The assignment does not cover a decision variable of the model.
    #[error("assignment has no value for customer {customer_id}, variant {variant}")]
    MissingValue {
        /// Customer of the missing variable
        customer_id: CustomerId,

        /// Variant of the missing variable
        variant: Variant,
    },

    /// A customer was not assigned exactly one variant (this is a bug).
    #[error("customer {customer_id} was assigned {selected} variants")]
    InvariantViolation {
        /// Offending customer
        customer_id: CustomerId,

        /// Number of variants selected for the customer
        selected: usize,
    },
}

/// Decision for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionRow {
    /// Customer identifier
    pub customer_id: CustomerId,

    /// Age category
    pub age_cat: String,

    /// Visit frequency category
    pub freq_cat: String,

    /// Baseline indicator
    pub send_prob_dm1: u8,

    /// Medium coupon indicator
    pub send_prob_dm2: u8,

    /// Large coupon indicator
    pub send_prob_dm3: u8,
}

impl SolutionRow {
    /// Indicator for a variant.
    pub fn indicator(&self, variant: Variant) -> u8 {
        match variant {
            Variant::Baseline => self.send_prob_dm1,
            Variant::Medium => self.send_prob_dm2,
            Variant::Large => self.send_prob_dm3,
        }
    }

    /// The variant sent to this customer.
    pub fn variant(&self) -> Option<Variant> {
        Variant::ALL
            .into_iter()
            .find(|&variant| self.indicator(variant) == 1)
    }
}

/// Per-customer decisions and the objective value of an optimal solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    rows: Vec<SolutionRow>,
    objective_value: f64,
    variant_counts: VariantMap<usize>,
    expected_spend: f64,
    budget: f64,
}

impl Solution {
    /// Rows, one per customer in model order.
    pub fn rows(&self) -> &[SolutionRow] {
        &self.rows
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &SolutionRow> {
        self.rows.iter()
    }

    /// Row for a customer.
    pub fn row(&self, customer_id: CustomerId) -> Option<&SolutionRow> {
        self.rows.iter().find(|row| row.customer_id == customer_id)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total incremental visits reported by the solver.
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// Number of customers assigned to each variant.
    pub fn variant_counts(&self) -> VariantMap<usize> {
        self.variant_counts
    }

    /// Expected coupon spend of the chosen assignment, in minor units.
    pub fn expected_spend(&self) -> f64 {
        self.expected_spend
    }

    /// Campaign budget, in minor units.
    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Expected spend as money, rounded to the nearest minor unit.
    pub fn expected_spend_money<'c>(&self, currency: &'c Currency) -> Option<Money<'c, Currency>> {
        self.expected_spend
            .round()
            .to_i64()
            .map(|minor| Money::from_minor(minor, currency))
    }

    /// Serialise the rows and summary as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the rows as CSV with a header row, one record per customer.
    ///
    /// # Errors
    ///
    /// Returns a [`csv::Error`] if serialisation or writing fails.
    pub fn write_csv(&self, out: impl io::Write) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(out);

        for row in &self.rows {
            writer.serialize(row)?;
        }

        writer.flush()?;

        Ok(())
    }

    /// Prints the solution table and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_to(&self, mut out: impl io::Write, currency: &Currency) -> io::Result<()> {
        let mut builder = Builder::default();

        builder.push_record([
            "customer_id",
            "age_cat",
            "freq_cat",
            Variant::Baseline.solution_column(),
            Variant::Medium.solution_column(),
            Variant::Large.solution_column(),
        ]);

        for row in &self.rows {
            builder.push_record([
                row.customer_id.to_string(),
                row.age_cat.clone(),
                row.freq_cat.clone(),
                row.send_prob_dm1.to_string(),
                row.send_prob_dm2.to_string(),
                row.send_prob_dm3.to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(3..6), Alignment::center());

        writeln!(out, "\n{table}")?;

        let spend = self
            .expected_spend_money(currency)
            .map_or_else(|| format!("{:.0}", self.expected_spend), |m| m.to_string());

        let budget = self
            .budget
            .round()
            .to_i64()
            .map_or_else(
                || format!("{:.0}", self.budget),
                |minor| Money::from_minor(minor, currency).to_string(),
            );

        let mut counts = String::new();

        for (variant, count) in self.variant_counts.iter() {
            _ = write!(counts, " {variant}={count}");
        }

        writeln!(out, " Incremental visits: {:.4}", self.objective_value)?;
        writeln!(out, " Variants:{counts}")?;
        writeln!(out, " Expected spend: {spend} of {budget}")?;

        writeln!(out)
    }
}

/// Map an optimal solve back to per-customer decisions.
///
/// # Errors
///
/// Returns [`ExtractError::NoSolution`] unless the solve is optimal, and an
/// error if the assignment does not give every customer exactly one variant.
pub fn extract(model: &Model, solved: &Solved) -> Result<Solution, ExtractError> {
    let assignment = match (&solved.status, &solved.assignment) {
        (SolveStatus::Optimal, Some(assignment)) => assignment,
        (status, _) => return Err(ExtractError::NoSolution { status: *status }),
    };

    let mut rows = Vec::with_capacity(model.customers().len());
    let mut variant_counts = VariantMap::<usize>::default();
    let mut selected = Vec::with_capacity(model.variable_count());

    for (customer_idx, customer) in model.customers().iter().enumerate() {
        let indicators = indicators(assignment, customer_idx, customer.customer_id)?;

        let chosen: Vec<Variant> = indicators
            .iter()
            .filter(|&(_, &indicator)| indicator == 1)
            .map(|(variant, _)| variant)
            .collect();

        let [variant] = chosen.as_slice() else {
            return Err(ExtractError::InvariantViolation {
                customer_id: customer.customer_id,
                selected: chosen.len(),
            });
        };

        *variant_counts.get_mut(*variant) += 1;
        selected.push(DecisionKey::new(customer_idx, *variant));

        rows.push(SolutionRow {
            customer_id: customer.customer_id,
            age_cat: customer.age_cat.clone(),
            freq_cat: customer.freq_cat.clone(),
            send_prob_dm1: indicators.baseline,
            send_prob_dm2: indicators.medium,
            send_prob_dm3: indicators.large,
        });
    }

    let expected_spend = model.expected_spend(|key| {
        if selected.get(key.customer).is_some_and(|chosen| *chosen == key) {
            1.0
        } else {
            0.0
        }
    });

    debug!(
        objective = assignment.objective(),
        expected_spend, "solution extracted"
    );

    Ok(Solution {
        rows,
        objective_value: assignment.objective(),
        variant_counts,
        expected_spend,
        budget: model.budget(),
    })
}

/// Read the three indicators of a customer, treating values above
/// [`BINARY_THRESHOLD`] as selected.
fn indicators(
    assignment: &Assignment,
    customer_idx: usize,
    customer_id: CustomerId,
) -> Result<VariantMap<u8>, ExtractError> {
    let mut indicators = VariantMap::<u8>::default();

    for variant in Variant::ALL {
        let value = assignment
            .value(DecisionKey::new(customer_idx, variant))
            .ok_or(ExtractError::MissingValue {
                customer_id,
                variant,
            })?;

        if value > BINARY_THRESHOLD {
            *indicators.get_mut(variant) = 1;
        }
    }

    Ok(indicators)
}
