//! Solvers for Campaign Models

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::{DecisionKey, Model};

pub mod milp;

/// Binary threshold for determining truthiness
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Solver Errors
#[derive(Debug, Error)]
pub enum SolverError {
    /// No solver backend was compiled in.
    #[error("no MILP solver backend is available; enable the `solver-microlp` or `solver-highs` feature")]
    Unavailable,

    /// Internal solver invariant was violated (this is a bug).
    #[error("solver invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

/// Outcome of a solve attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// An optimal assignment was found.
    Optimal,

    /// No assignment satisfies every constraint.
    Infeasible,

    /// The objective can grow without bound.
    Unbounded,

    /// No solve has produced this result.
    #[default]
    NotSolved,

    /// The solver failed for another reason.
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unbounded => "Unbounded",
            SolveStatus::NotSolved => "Not Solved",
            SolveStatus::Error => "Error",
        };

        f.write_str(status)
    }
}

/// Solved value of every decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
    objective: f64,
}

impl Assignment {
    /// Create an assignment from values ordered by [`DecisionKey::column`].
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    /// Value of a decision variable, if the assignment covers it.
    pub fn value(&self, key: DecisionKey) -> Option<f64> {
        self.values.get(key.column()).copied()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the assignment holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Objective value reported for this assignment.
    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// Result of handing a model to a solver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solved {
    /// Solve status
    pub status: SolveStatus,

    /// Variable values, present only when the status is [`SolveStatus::Optimal`]
    pub assignment: Option<Assignment>,

    /// Solver message when the status is [`SolveStatus::Error`]
    pub detail: Option<String>,
}

impl Solved {
    /// An optimal result.
    pub fn optimal(assignment: Assignment) -> Self {
        Self {
            status: SolveStatus::Optimal,
            assignment: Some(assignment),
            detail: None,
        }
    }

    /// A result without an assignment.
    pub fn without_assignment(status: SolveStatus, detail: Option<String>) -> Self {
        Self {
            status,
            assignment: None,
            detail,
        }
    }

    /// Whether an optimal assignment is available.
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal && self.assignment.is_some()
    }
}

/// Trait for solving campaign models
pub trait Solver {
    /// Solve the model, maximising its objective.
    ///
    /// Infeasible, unbounded and failed solves are reported through
    /// [`Solved::status`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the solver cannot be invoked at all.
    fn solve(model: &Model) -> Result<Solved, SolverError>;
}
