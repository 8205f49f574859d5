//! Campaign Model
//!
//! Translates customers and segment visit probabilities into a binary
//! program. For every customer `i` and variant `m` there is one decision
//! `x[i,m]`. The model maximises incremental visits over the baseline,
//!
//! ```text
//! max  Σ_i Σ_{m∈{2,3}} (P[i,m] − P[i,1]) · x[i,m]
//! s.t. Σ_m x[i,m] = 1                                  for every customer i
//!      Σ_i Σ_{m∈{2,3}} cost[m] · P[i,m] · x[i,m] ≤ B
//!      Σ_{i∈s} x[i,m] ≥ threshold[m] · |s|              for every segment s, variant m
//! ```
//!
//! The resulting [`Model`] is an immutable value. It holds no solver state,
//! so it can be handed to any [`Solver`](crate::solvers::Solver) and solved
//! repeatedly or concurrently with other models.

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tracing::debug;

use crate::{
    campaign::CampaignConfig,
    customers::{Customer, Customers},
    probabilities::SegmentProbabilities,
    tables::Table,
    variants::{Variant, VariantMap},
};

pub mod error;
pub mod join;
pub mod observer;
pub(crate) mod state;

pub use error::{JoinIntegrityError, ModelError};
pub use join::{Segment, SegmentMembership};
pub use observer::{FormulationStats, ModelObserver, NoopObserver};

use state::ModelState;

/// Identifies the decision variable `x[i,m]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecisionKey {
    /// Position of the customer in the model's customer order
    pub customer: usize,

    /// Mail variant
    pub variant: Variant,
}

impl DecisionKey {
    /// Create a key.
    pub const fn new(customer: usize, variant: Variant) -> Self {
        Self { customer, variant }
    }

    /// Dense position of the variable: customers in order, variants in column order.
    pub const fn column(self) -> usize {
        self.customer * Variant::ALL.len() + self.variant.index()
    }
}

/// Linear expression over decision variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(DecisionKey, f64)>,
}

impl LinearExpr {
    /// Sum of the given variables, each with coefficient one.
    pub fn from_keys(keys: impl IntoIterator<Item = DecisionKey>) -> Self {
        Self {
            terms: keys.into_iter().map(|key| (key, 1.0)).collect(),
        }
    }

    /// Add `coefficient · x[key]`.
    pub fn add_term(&mut self, key: DecisionKey, coefficient: f64) {
        self.terms.push((key, coefficient));
    }

    /// Terms of the expression.
    pub fn terms(&self) -> &[(DecisionKey, f64)] {
        &self.terms
    }

    /// Evaluate the expression given a value for every variable.
    pub fn eval(&self, value: impl Fn(DecisionKey) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|&(key, coefficient)| coefficient * value(key))
            .sum()
    }
}

/// Relation operator for a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRelation {
    /// Equality (`lhs == rhs`)
    Eq,

    /// Less than or equal (`lhs <= rhs`)
    Leq,

    /// Greater than or equal (`lhs >= rhs`)
    Geq,
}

impl ConstraintRelation {
    /// Whether `lhs <relation> rhs` holds within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            ConstraintRelation::Eq => (lhs - rhs).abs() <= tolerance,
            ConstraintRelation::Leq => lhs <= rhs + tolerance,
            ConstraintRelation::Geq => lhs >= rhs - tolerance,
        }
    }
}

/// What a constraint enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// The customer receives exactly one variant.
    Assignment {
        /// Customer position
        customer: usize,
    },

    /// Expected coupon spend stays within budget.
    Budget,

    /// A minimum share of the segment receives the variant.
    Fairness {
        /// Position in [`SegmentMembership`]
        segment: usize,

        /// Variant that must be represented
        variant: Variant,
    },
}

/// Recorded linear constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConstraint {
    /// What the constraint enforces
    pub kind: ConstraintKind,

    /// Left-hand side expression
    pub lhs: LinearExpr,

    /// Relation operator
    pub relation: ConstraintRelation,

    /// Right-hand side scalar
    pub rhs: f64,
}

/// Assembled campaign model.
#[derive(Debug, Clone)]
pub struct Model {
    customers: Vec<Customer>,
    probabilities: Vec<VariantMap<f64>>,
    segments: SegmentMembership,
    costs: VariantMap<f64>,
    budget: f64,
    objective: LinearExpr,
    constraints: Vec<ModelConstraint>,
}

impl Model {
    /// Build a model from validated inputs.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the join is not one-to-one or an amount cannot
    /// be represented as a coefficient.
    pub fn build(
        customers: &Customers,
        probabilities: &SegmentProbabilities,
        config: &CampaignConfig<'_>,
    ) -> Result<Self, ModelError> {
        ModelBuilder::new(config).build(customers, probabilities)
    }

    /// Build a model straight from the two input tables.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Schema`] if a table does not have the expected
    /// columns, otherwise as [`Model::build`].
    pub fn from_tables(
        customers: &Table,
        probabilities: &Table,
        config: &CampaignConfig<'_>,
    ) -> Result<Self, ModelError> {
        ModelBuilder::new(config).build_from_tables(customers, probabilities)
    }

    /// Customers in model order.
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Number of decision variables.
    pub fn variable_count(&self) -> usize {
        self.customers.len() * Variant::ALL.len()
    }

    /// All decision keys, ordered by [`DecisionKey::column`].
    pub fn decision_keys(&self) -> impl Iterator<Item = DecisionKey> + '_ {
        (0..self.customers.len()).flat_map(|customer| {
            Variant::ALL
                .into_iter()
                .map(move |variant| DecisionKey::new(customer, variant))
        })
    }

    /// Objective to maximise.
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// All recorded constraints.
    pub fn constraints(&self) -> &[ModelConstraint] {
        &self.constraints
    }

    /// Segment membership derived from the join.
    pub fn segments(&self) -> &SegmentMembership {
        &self.segments
    }

    /// Visit probabilities for the customer at `customer` position.
    pub fn probabilities(&self, customer: usize) -> Option<&VariantMap<f64>> {
        self.probabilities.get(customer)
    }

    /// Coupon value of a variant as a coefficient (minor units).
    pub fn cost(&self, variant: Variant) -> f64 {
        *self.costs.get(variant)
    }

    /// Budget as a coefficient (minor units).
    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Expected coupon spend for the given variable values.
    pub fn expected_spend(&self, value: impl Fn(DecisionKey) -> f64) -> f64 {
        self.probabilities
            .iter()
            .enumerate()
            .flat_map(|(customer, probabilities)| {
                Variant::INCENTIVISED.into_iter().map(move |variant| {
                    (DecisionKey::new(customer, variant), *probabilities.get(variant))
                })
            })
            .map(|(key, probability)| self.cost(key.variant) * probability * value(key))
            .sum()
    }
}

/// Builds [`Model`]s for one campaign configuration.
#[derive(Debug, Clone, Copy)]
pub struct ModelBuilder<'c, 'a> {
    config: &'c CampaignConfig<'a>,
}

impl<'c, 'a> ModelBuilder<'c, 'a> {
    /// Create a builder for a campaign.
    pub fn new(config: &'c CampaignConfig<'a>) -> Self {
        Self { config }
    }

    /// Build a model from validated inputs.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the join is not one-to-one or an amount cannot
    /// be represented as a coefficient.
    pub fn build(
        &self,
        customers: &Customers,
        probabilities: &SegmentProbabilities,
    ) -> Result<Model, ModelError> {
        let mut observer = NoopObserver;

        self.build_with_observer(customers, probabilities, &mut observer)
    }

    /// Read both tables and build a model from them.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Schema`] if a table does not have the expected
    /// columns, otherwise as [`ModelBuilder::build`].
    pub fn build_from_tables(
        &self,
        customers: &Table,
        probabilities: &Table,
    ) -> Result<Model, ModelError> {
        let customers = Customers::from_table(customers)?;
        let probabilities = SegmentProbabilities::from_table(probabilities)?;

        self.build(&customers, &probabilities)
    }

    /// Build a model, reporting every variable, objective term and constraint
    /// to `observer`.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the join is not one-to-one or an amount cannot
    /// be represented as a coefficient.
    pub fn build_with_observer(
        &self,
        customers: &Customers,
        probabilities: &SegmentProbabilities,
        observer: &mut dyn ModelObserver,
    ) -> Result<Model, ModelError> {
        let costs = VariantMap::from_fn(|variant| money_coefficient(self.config.cost(variant)));
        let costs = VariantMap::new(costs.baseline?, costs.medium?, costs.large?);
        let budget = money_coefficient(self.config.budget())?;

        // The join is checked before any variable exists.
        let joined = join::join(customers, probabilities)?;

        let mut state = ModelState::new(observer);

        for (customer_idx, customer) in customers.iter().enumerate() {
            for variant in Variant::ALL {
                state
                    .observer()
                    .on_decision_variable(DecisionKey::new(customer_idx, variant), customer);
            }
        }

        add_assignment_constraints(&mut state, customers.len());
        add_lift_objective(&mut state, &joined.probabilities);
        add_budget_constraint(&mut state, &joined.probabilities, &costs, budget);
        self.add_fairness_constraints(&mut state, &joined.segments)?;

        let (objective, constraints) = state.into_parts();

        let model = Model {
            customers: customers.as_slice().to_vec(),
            probabilities: joined.probabilities,
            segments: joined.segments,
            costs,
            budget,
            objective,
            constraints,
        };

        debug!(
            customers = model.customers.len(),
            segments = model.segments.len(),
            variables = model.variable_count(),
            constraints = model.constraints.len(),
            "campaign model built"
        );

        Ok(model)
    }

    /// For every segment and every variant, at least the configured share of
    /// the segment receives that variant. The threshold is not rounded; integrality
    /// of the decisions rounds it up.
    fn add_fairness_constraints(
        &self,
        state: &mut ModelState<'_>,
        segments: &SegmentMembership,
    ) -> Result<(), ModelError> {
        let fairness = self.config.fairness();

        for (segment_idx, segment) in segments.iter().enumerate() {
            for variant in Variant::ALL {
                let rhs = fairness
                    .fraction(variant)
                    .checked_mul(Decimal::from(segment.len()))
                    .and_then(|rhs| rhs.to_f64())
                    .ok_or_else(|| ModelError::ThresholdNotRepresentable {
                        segment: segment.id.clone(),
                        variant,
                    })?;

                let lhs = LinearExpr::from_keys(
                    segment
                        .members
                        .iter()
                        .map(|&customer| DecisionKey::new(customer, variant)),
                );

                state.add_geq_constraint(
                    ConstraintKind::Fairness {
                        segment: segment_idx,
                        variant,
                    },
                    lhs,
                    rhs,
                );
            }
        }

        Ok(())
    }
}

/// Every customer receives exactly one variant.
fn add_assignment_constraints(state: &mut ModelState<'_>, customer_count: usize) {
    for customer in 0..customer_count {
        let lhs = LinearExpr::from_keys(
            Variant::ALL
                .into_iter()
                .map(|variant| DecisionKey::new(customer, variant)),
        );

        state.add_eq_constraint(ConstraintKind::Assignment { customer }, lhs, 1.0);
    }
}

/// Lift of each incentivised variant over the customer's baseline. Baseline
/// decisions contribute nothing. Negative lifts are kept; the solver avoids them.
fn add_lift_objective(state: &mut ModelState<'_>, probabilities: &[VariantMap<f64>]) {
    for (customer, probabilities) in probabilities.iter().enumerate() {
        for variant in Variant::INCENTIVISED {
            let lift = probabilities.get(variant) - probabilities.baseline;

            state.add_to_objective(DecisionKey::new(customer, variant), lift);
        }
    }
}

/// Expected redemption spend, `cost[m] · P[i,m]` per incentivised decision, within budget.
fn add_budget_constraint(
    state: &mut ModelState<'_>,
    probabilities: &[VariantMap<f64>],
    costs: &VariantMap<f64>,
    budget: f64,
) {
    let mut lhs = LinearExpr::default();

    for (customer, probabilities) in probabilities.iter().enumerate() {
        for variant in Variant::INCENTIVISED {
            lhs.add_term(
                DecisionKey::new(customer, variant),
                costs.get(variant) * probabilities.get(variant),
            );
        }
    }

    state.add_leq_constraint(ConstraintKind::Budget, lhs, budget);
}

/// Convert a money amount to a coefficient in minor units.
fn money_coefficient(money: Money<'_, Currency>) -> Result<f64, ModelError> {
    let minor_units = money.to_minor_units();

    // Coefficients are `f64`; only integers with absolute value <= 2^53 survive
    // the conversion unchanged, so reject anything that would not round-trip.
    i64_to_f64_exact(minor_units).ok_or(ModelError::MinorUnitsNotRepresentable(minor_units))
}

/// Convert an `i64` to an `f64` if it can be represented exactly.
pub fn i64_to_f64_exact(v: i64) -> Option<f64> {
    let f = v.to_f64()?;

    (f.to_i64() == Some(v)).then_some(f)
}
