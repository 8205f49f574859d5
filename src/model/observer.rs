//! Model Observer
//!
//! Observers receive callbacks while the model is being built, which makes it
//! possible to inspect or record the formulation without changing it.

use crate::{
    customers::Customer,
    model::{ConstraintKind, DecisionKey, ModelConstraint},
};

/// Callbacks invoked as the model is constructed.
pub trait ModelObserver {
    /// A binary decision variable was created for a customer/variant pair.
    fn on_decision_variable(&mut self, key: DecisionKey, customer: &Customer);

    /// A term was added to the objective.
    fn on_objective_term(&mut self, key: DecisionKey, coefficient: f64);

    /// A constraint was recorded.
    fn on_constraint(&mut self, constraint: &ModelConstraint);
}

/// Observer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ModelObserver for NoopObserver {
    fn on_decision_variable(&mut self, _key: DecisionKey, _customer: &Customer) {}

    fn on_objective_term(&mut self, _key: DecisionKey, _coefficient: f64) {}

    fn on_constraint(&mut self, _constraint: &ModelConstraint) {}
}

/// Observer that counts what the builder produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FormulationStats {
    /// Decision variables
    pub variables: usize,

    /// Objective terms
    pub objective_terms: usize,

    /// One-variant-per-customer constraints
    pub assignment_constraints: usize,

    /// Budget constraints
    pub budget_constraints: usize,

    /// Per-segment, per-variant minimum share constraints
    pub fairness_constraints: usize,
}

impl FormulationStats {
    /// Total number of constraints.
    pub fn constraints(&self) -> usize {
        self.assignment_constraints + self.budget_constraints + self.fairness_constraints
    }
}

impl ModelObserver for FormulationStats {
    fn on_decision_variable(&mut self, _key: DecisionKey, _customer: &Customer) {
        self.variables += 1;
    }

    fn on_objective_term(&mut self, _key: DecisionKey, _coefficient: f64) {
        self.objective_terms += 1;
    }

    fn on_constraint(&mut self, constraint: &ModelConstraint) {
        match constraint.kind {
            ConstraintKind::Assignment { .. } => self.assignment_constraints += 1,
            ConstraintKind::Budget => self.budget_constraints += 1,
            ConstraintKind::Fairness { .. } => self.fairness_constraints += 1,
        }
    }
}
