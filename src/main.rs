//! Mailshot CLI
//!
//! Use `-f` to load a fixture set by name, or `-c` and `-p` to load customer
//! and probability records from CSV, JSON or YAML files.
//! Use `--budget`, `--medium-cost`, `--large-cost` and `--fairness` to override
//! the campaign, and `-o json` or `-o csv` to print JSON or CSV instead of a table.

use std::{
    io::{self, Write},
    time::Instant,
};

use anyhow::Result;
use clap::Parser;
use humanize_duration::{Truncate, prelude::DurationExt};
use tracing::error;

use mailshot::{
    optimiser::{CampaignOptimiser, OptimiseError},
    utils::{MailshotArgs, OutputFormat, init_logging},
};

fn main() -> Result<()> {
    let args = MailshotArgs::parse();

    init_logging(&args.logging)?;

    let inputs = args.inputs()?;
    let currency = inputs.campaign.currency();

    let optimiser = CampaignOptimiser::new(inputs.campaign);

    let start = Instant::now();

    let solution = match optimiser.optimise(&inputs.customers, &inputs.probabilities) {
        Ok(solution) => solution,
        Err(err @ OptimiseError::Infeasible) => {
            error!("{err}; relax the budget or fairness thresholds");

            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    let elapsed = start.elapsed();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match args.output {
        OutputFormat::Table => {
            solution.write_to(&mut handle, currency)?;

            writeln!(
                handle,
                " {} ({}s)",
                elapsed.human(Truncate::Nano),
                elapsed.as_secs_f32()
            )?;
        }
        OutputFormat::Json => {
            writeln!(handle, "{}", solution.to_json()?)?;
        }
        OutputFormat::Csv => {
            solution.write_csv(&mut handle)?;
        }
    }

    Ok(())
}
