//! Model State

use std::fmt;

use crate::model::{
    ConstraintKind, ConstraintRelation, DecisionKey, LinearExpr, ModelConstraint,
    observer::ModelObserver,
};

/// Builder state for the objective and recorded constraints
pub(crate) struct ModelState<'o> {
    objective: LinearExpr,
    constraints: Vec<ModelConstraint>,
    observer: &'o mut dyn ModelObserver,
}

impl fmt::Debug for ModelState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelState")
            .field(
                "objective",
                &format!("[{} terms]", self.objective.terms().len()),
            )
            .field(
                "constraints",
                &format!("[{} constraints]", self.constraints.len()),
            )
            .field("observer", &"<ModelObserver>")
            .finish()
    }
}

impl<'o> ModelState<'o> {
    pub(crate) fn new(observer: &'o mut dyn ModelObserver) -> Self {
        Self {
            objective: LinearExpr::default(),
            constraints: Vec::new(),
            observer,
        }
    }

    pub(crate) fn observer(&mut self) -> &mut dyn ModelObserver {
        &mut *self.observer
    }

    /// Add a term to the objective.
    pub(crate) fn add_to_objective(&mut self, key: DecisionKey, coefficient: f64) {
        self.objective.add_term(key, coefficient);
        self.observer.on_objective_term(key, coefficient);
    }

    fn push(&mut self, kind: ConstraintKind, lhs: LinearExpr, relation: ConstraintRelation, rhs: f64) {
        let constraint = ModelConstraint {
            kind,
            lhs,
            relation,
            rhs,
        };

        self.observer.on_constraint(&constraint);
        self.constraints.push(constraint);
    }

    /// Record an equality constraint.
    pub(crate) fn add_eq_constraint(&mut self, kind: ConstraintKind, lhs: LinearExpr, rhs: f64) {
        self.push(kind, lhs, ConstraintRelation::Eq, rhs);
    }

    /// Record a less-than-or-equal constraint.
    pub(crate) fn add_leq_constraint(&mut self, kind: ConstraintKind, lhs: LinearExpr, rhs: f64) {
        self.push(kind, lhs, ConstraintRelation::Leq, rhs);
    }

    /// Record a greater-than-or-equal constraint.
    pub(crate) fn add_geq_constraint(&mut self, kind: ConstraintKind, lhs: LinearExpr, rhs: f64) {
        self.push(kind, lhs, ConstraintRelation::Geq, rhs);
    }

    /// Extract the objective and all recorded constraints.
    pub(crate) fn into_parts(self) -> (LinearExpr, Vec<ModelConstraint>) {
        (self.objective, self.constraints)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::observer::{FormulationStats, NoopObserver},
        variants::Variant,
    };

    use super::*;

    #[test]
    fn debug_reports_sizes() {
        let mut observer = NoopObserver;
        let state = ModelState::new(&mut observer);

        let formatted = format!("{state:?}");

        assert!(formatted.contains("ModelState"));
        assert!(formatted.contains("0 terms"));
        assert!(formatted.contains("0 constraints"));
    }

    #[test]
    fn recorded_constraints_reach_the_observer() {
        let mut stats = FormulationStats::default();
        let mut state = ModelState::new(&mut stats);

        let key = DecisionKey::new(0, Variant::Large);

        state.add_to_objective(key, 0.4);
        state.add_eq_constraint(
            ConstraintKind::Assignment { customer: 0 },
            LinearExpr::from_keys([key]),
            1.0,
        );
        state.add_leq_constraint(ConstraintKind::Budget, LinearExpr::default(), 10.0);

        let (objective, constraints) = state.into_parts();

        assert_eq!(objective.terms().len(), 1);
        assert_eq!(constraints.len(), 2);
        assert_eq!(stats.objective_terms, 1);
        assert_eq!(stats.assignment_constraints, 1);
        assert_eq!(stats.budget_constraints, 1);
    }
}
