//! Campaign Optimiser
//!
//! Runs the full pipeline for one campaign: build the model, solve it once and
//! extract the per-customer decisions. Every call builds its own [`Model`], so
//! concurrent calls share nothing.

use std::marker::PhantomData;

use thiserror::Error;
use tracing::{Span, info, warn};

use crate::{
    campaign::CampaignConfig,
    customers::Customers,
    model::{FormulationStats, Model, ModelBuilder, ModelError},
    probabilities::SegmentProbabilities,
    solution::{ExtractError, Solution, extract},
    solvers::{SolveStatus, Solver, SolverError, milp::MILPSolver},
    tables::Table,
};

/// Errors that can occur while optimising a campaign.
#[derive(Debug, Error)]
pub enum OptimiseError {
    /// Input tables are malformed or do not join one-to-one.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The budget and fairness thresholds admit no assignment.
    #[error("no campaign satisfies the budget and fairness constraints")]
    Infeasible,

    /// The objective is unbounded.
    #[error("campaign model is unbounded")]
    Unbounded,

    /// No solver backend could be invoked.
    #[error("MILP solver unavailable")]
    SolverUnavailable,

    /// The solver failed for another reason.
    #[error("MILP solver failed: {detail}")]
    SolverFailed {
        /// Solver message
        detail: String,
    },

    /// The solved result could not be mapped back to customers.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl OptimiseError {
    /// Whether the error stems from campaign inputs (budget or fairness too
    /// tight) rather than from malformed data or a system fault.
    pub fn is_business_error(&self) -> bool {
        matches!(self, OptimiseError::Infeasible)
    }
}

impl From<SolverError> for OptimiseError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Unavailable => OptimiseError::SolverUnavailable,
            SolverError::InvariantViolation { .. } => OptimiseError::SolverFailed {
                detail: err.to_string(),
            },
        }
    }
}

/// Build, solve and extract a campaign with solver `S`.
#[derive(Debug, Clone, Copy)]
pub struct CampaignOptimiser<'a, S = MILPSolver> {
    config: CampaignConfig<'a>,
    solver: PhantomData<S>,
}

impl<'a> CampaignOptimiser<'a> {
    /// Create an optimiser using the MILP solver.
    pub fn new(config: CampaignConfig<'a>) -> Self {
        Self::with_solver(config)
    }
}

impl<'a, S: Solver> CampaignOptimiser<'a, S> {
    /// Create an optimiser using solver `S`.
    pub fn with_solver(config: CampaignConfig<'a>) -> Self {
        Self {
            config,
            solver: PhantomData,
        }
    }

    /// Campaign configuration.
    pub fn config(&self) -> &CampaignConfig<'a> {
        &self.config
    }

    /// Optimise a campaign from validated inputs.
    ///
    /// # Errors
    ///
    /// Returns an [`OptimiseError`] if the model cannot be built, the solve is
    /// not optimal, or the solution cannot be extracted.
    #[tracing::instrument(
        name = "campaign.optimise",
        skip_all,
        fields(
            customers = customers.len(),
            variables = tracing::field::Empty,
            constraints = tracing::field::Empty,
            status = tracing::field::Empty
        ),
        err
    )]
    pub fn optimise(
        &self,
        customers: &Customers,
        probabilities: &SegmentProbabilities,
    ) -> Result<Solution, OptimiseError> {
        let mut stats = FormulationStats::default();

        let model = ModelBuilder::new(&self.config).build_with_observer(
            customers,
            probabilities,
            &mut stats,
        )?;

        let span = Span::current();

        span.record("variables", stats.variables);
        span.record("constraints", stats.constraints());

        self.optimise_model(&model)
    }

    /// Optimise a campaign straight from the two input tables.
    ///
    /// # Errors
    ///
    /// As [`CampaignOptimiser::optimise`], plus schema errors from either table.
    pub fn optimise_tables(
        &self,
        customers: &Table,
        probabilities: &Table,
    ) -> Result<Solution, OptimiseError> {
        let customers = Customers::from_table(customers).map_err(ModelError::from)?;
        let probabilities =
            SegmentProbabilities::from_table(probabilities).map_err(ModelError::from)?;

        self.optimise(&customers, &probabilities)
    }

    /// Solve an already built model and extract its solution.
    ///
    /// # Errors
    ///
    /// Returns an [`OptimiseError`] if the solve is not optimal or the solution
    /// cannot be extracted.
    pub fn optimise_model(&self, model: &Model) -> Result<Solution, OptimiseError> {
        let solved = S::solve(model)?;

        Span::current().record("status", tracing::field::display(solved.status));

        info!(status = %solved.status, "campaign model solved");

        match solved.status {
            SolveStatus::Optimal => Ok(extract(model, &solved)?),
            SolveStatus::Infeasible => {
                warn!(
                    budget = model.budget(),
                    "campaign is infeasible; the budget or fairness thresholds are too tight"
                );

                Err(OptimiseError::Infeasible)
            }
            SolveStatus::Unbounded => Err(OptimiseError::Unbounded),
            SolveStatus::Error => Err(OptimiseError::SolverFailed {
                detail: solved.detail.unwrap_or_default(),
            }),
            SolveStatus::NotSolved => Err(ExtractError::NoSolution {
                status: SolveStatus::NotSolved,
            }
            .into()),
        }
    }
}
