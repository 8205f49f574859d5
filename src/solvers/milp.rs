//! MILP Solver

#[cfg(any(feature = "solver-highs", feature = "solver-microlp"))]
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, variable,
};
#[cfg(any(feature = "solver-highs", feature = "solver-microlp"))]
use tracing::debug;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

#[cfg(any(feature = "solver-highs", feature = "solver-microlp"))]
use crate::{
    model::{ConstraintRelation, LinearExpr},
    solvers::{Assignment, SolveStatus},
};
use crate::{
    model::Model,
    solvers::{Solved, Solver, SolverError},
};

/// Solver using Mixed Integer Linear Programming (MILP)
#[derive(Debug)]
pub struct MILPSolver;

impl Solver for MILPSolver {
    #[cfg(any(feature = "solver-highs", feature = "solver-microlp"))]
    fn solve(model: &Model) -> Result<Solved, SolverError> {
        // One binary variable per decision key, in column order, so that the
        // key's column is also its position in `vars`.
        let mut pb = ProblemVariables::new();
        let vars: Vec<Variable> = pb.add_vector(variable().binary(), model.variable_count());

        ensure_variable_count(vars.len(), model.variable_count())?;

        let objective = to_expression(model.objective(), &vars)?;

        let mut problem = pb.maximise(objective).using(default_solver);

        for constraint in model.constraints() {
            let lhs = to_expression(&constraint.lhs, &vars)?;

            problem = match constraint.relation {
                ConstraintRelation::Eq => problem.with(lhs.eq(constraint.rhs)),
                ConstraintRelation::Leq => problem.with(lhs.leq(constraint.rhs)),
                ConstraintRelation::Geq => problem.with(lhs.geq(constraint.rhs)),
            };
        }

        debug!(
            variables = vars.len(),
            constraints = model.constraints().len(),
            "handing campaign model to solver"
        );

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => {
                return Ok(Solved::without_assignment(SolveStatus::Infeasible, None));
            }
            Err(ResolutionError::Unbounded) => {
                return Ok(Solved::without_assignment(SolveStatus::Unbounded, None));
            }
            Err(other) => {
                return Ok(Solved::without_assignment(
                    SolveStatus::Error,
                    Some(other.to_string()),
                ));
            }
        };

        let values: Vec<f64> = vars.iter().map(|&var| solution.value(var)).collect();

        let objective = model
            .objective()
            .eval(|key| values.get(key.column()).copied().unwrap_or_default());

        Ok(Solved::optimal(Assignment::new(values, objective)))
    }

    #[cfg(not(any(feature = "solver-highs", feature = "solver-microlp")))]
    fn solve(_model: &Model) -> Result<Solved, SolverError> {
        Err(SolverError::Unavailable)
    }
}

/// Translate a model expression into a solver expression.
#[cfg(any(feature = "solver-highs", feature = "solver-microlp"))]
fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Result<Expression, SolverError> {
    let mut out = Expression::default();

    for &(key, coefficient) in expr.terms() {
        let var = vars
            .get(key.column())
            .copied()
            .ok_or(SolverError::InvariantViolation {
                message: "decision key outside the model's variables",
            })?;

        out += var * coefficient;
    }

    Ok(out)
}

/// Ensure that one solver variable exists per decision key.
#[cfg(any(feature = "solver-highs", feature = "solver-microlp"))]
fn ensure_variable_count(vars_len: usize, keys_len: usize) -> Result<(), SolverError> {
    if vars_len != keys_len {
        return Err(SolverError::InvariantViolation {
            message: "solver variable count does not match number of decision keys",
        });
    }

    Ok(())
}
