//! Mailshot prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    campaign::{CampaignConfig, CampaignError, FairnessThresholds, VariantCosts},
    customers::{Customer, CustomerId, Customers},
    model::{
        DecisionKey, FormulationStats, JoinIntegrityError, Model, ModelBuilder, ModelError,
        ModelObserver, NoopObserver,
    },
    optimiser::{CampaignOptimiser, OptimiseError},
    probabilities::{SegmentId, SegmentProbabilities, SegmentProbability},
    solution::{ExtractError, Solution, SolutionRow, extract},
    solvers::{Assignment, SolveStatus, Solved, Solver, SolverError, milp::MILPSolver},
    tables::{Cell, SchemaError, Table},
    variants::{Variant, VariantMap},
};
