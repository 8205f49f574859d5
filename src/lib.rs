//! Mailshot
//!
//! Mailshot chooses one direct-mail variant per customer (no coupon, medium
//! coupon or large coupon) to maximise incremental store visits, subject to a
//! budget for expected coupon redemptions and a minimum share of every
//! customer segment per variant.
//!
//! The pipeline is strictly sequential:
//!
//! 1. [`model::ModelBuilder`] joins customers to segment visit probabilities
//!    and records a binary program as an immutable [`model::Model`].
//! 2. A [`solvers::Solver`] (by default [`solvers::milp::MILPSolver`], backed
//!    by `good_lp`) solves it and reports a [`solvers::SolveStatus`].
//! 3. [`solution::extract`] maps the solved variables back to one row per
//!    customer.
//!
//! [`optimiser::CampaignOptimiser`] runs all three steps.

pub mod campaign;
pub mod customers;
pub mod fixtures;
pub mod model;
pub mod optimiser;
pub mod prelude;
pub mod probabilities;
pub mod solution;
pub mod solvers;
pub mod tables;
pub mod utils;
pub mod variants;
