//! Utils
//!
//! Command line arguments and logging set-up for the `mailshot` binary.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, ValueEnum};
use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Registry,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

use crate::{
    campaign::{CampaignConfig, CampaignError, FairnessThresholds, VariantCosts},
    customers::Customers,
    fixtures::{Fixture, FixtureError, parse_money, parse_percentage},
    probabilities::SegmentProbabilities,
    tables::{SchemaError, Table},
};

/// Errors that can occur while preparing CLI inputs.
#[derive(Debug, Error)]
pub enum CliError {
    /// IO error reading an input file
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that could not be read
        path: PathBuf,

        /// Underlying error
        source: io::Error,
    },

    /// Input file has an extension other than `.csv`, `.json`, `.yml` or `.yaml`
    #[error("Unsupported input file type: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Neither a fixture set nor both input files were given
    #[error("Either --fixture or both --customers and --probabilities are required")]
    MissingInput,

    /// Input table could not be parsed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Fixture could not be loaded
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// Campaign overrides are invalid
    #[error(transparent)]
    Campaign(#[from] CampaignError),
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Solution output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table and summary for the terminal.
    Table,

    /// JSON records plus summary.
    Json,

    /// CSV records only, as a solution export.
    Csv,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Campaign overrides applied on top of the loaded campaign.
#[derive(Debug, Default, Args)]
pub struct CampaignArgs {
    /// Budget for expected coupon redemptions (e.g., "15000 JPY")
    #[arg(long)]
    pub budget: Option<String>,

    /// Medium coupon value (e.g., "1000 JPY")
    #[arg(long)]
    pub medium_cost: Option<String>,

    /// Large coupon value (e.g., "2000 JPY")
    #[arg(long)]
    pub large_cost: Option<String>,

    /// Minimum share of each segment per variant (e.g., "10%" or "0.1")
    #[arg(long)]
    pub fairness: Option<String>,
}

impl CampaignArgs {
    /// Apply the overrides to a campaign.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the resulting campaign is invalid.
    pub fn apply(
        &self,
        config: CampaignConfig<'static>,
    ) -> Result<CampaignConfig<'static>, CliError> {
        let mut config = config;

        if self.medium_cost.is_some() || self.large_cost.is_some() {
            let costs = config.costs();

            let medium = self
                .medium_cost
                .as_deref()
                .map(parse_money)
                .transpose()?
                .unwrap_or(costs.medium);

            let large = self
                .large_cost
                .as_deref()
                .map(parse_money)
                .transpose()?
                .unwrap_or(costs.large);

            config = config.with_costs(VariantCosts::new(medium, large))?;
        }

        if let Some(budget) = self.budget.as_deref() {
            config = config.with_budget(parse_money(budget)?)?;
        }

        if let Some(fairness) = self.fairness.as_deref() {
            let threshold = parse_percentage(fairness)?;

            config = config.with_fairness(FairnessThresholds::uniform(threshold))?;
        }

        Ok(config)
    }
}

/// Optimise a direct-mail campaign
#[derive(Debug, Parser)]
#[command(name = "mailshot", version, about)]
pub struct MailshotArgs {
    /// Fixture set to load customers, probabilities and campaign from
    #[arg(short, long, conflicts_with_all = ["customers", "probabilities"])]
    pub fixture: Option<String>,

    /// Customer records (CSV, JSON or YAML)
    #[arg(short, long, requires = "probabilities")]
    pub customers: Option<PathBuf>,

    /// Segment probability records (CSV, JSON or YAML)
    #[arg(short, long, requires = "customers")]
    pub probabilities: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Campaign overrides
    #[command(flatten)]
    pub campaign: CampaignArgs,

    /// Logging
    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Inputs resolved from the command line.
#[derive(Debug)]
pub struct Inputs {
    /// Customers
    pub customers: Customers,

    /// Segment probabilities
    pub probabilities: SegmentProbabilities,

    /// Campaign after overrides
    pub campaign: CampaignConfig<'static>,
}

impl MailshotArgs {
    /// Load the customers, probabilities and campaign named by the arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if no input is named, a file cannot be read or parsed,
    /// or the campaign overrides are invalid.
    pub fn inputs(&self) -> Result<Inputs, CliError> {
        let (customers, probabilities, campaign) = match (
            self.fixture.as_deref(),
            self.customers.as_deref(),
            self.probabilities.as_deref(),
        ) {
            (Some(name), _, _) => {
                let fixture = Fixture::from_set(name)?;

                (
                    fixture.customers()?.clone(),
                    fixture.probabilities()?.clone(),
                    fixture.campaign(),
                )
            }
            (None, Some(customers), Some(probabilities)) => (
                Customers::from_table(&read_table(customers)?)?,
                SegmentProbabilities::from_table(&read_table(probabilities)?)?,
                CampaignConfig::default(),
            ),
            _ => return Err(CliError::MissingInput),
        };

        Ok(Inputs {
            customers,
            probabilities,
            campaign: self.campaign.apply(campaign)?,
        })
    }
}

/// Read a table of records from a CSV, JSON or YAML file, chosen by extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has another extension, or
/// does not hold a list of records.
pub fn read_table(path: &Path) -> Result<Table, CliError> {
    let contents = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => Ok(Table::from_csv_str(&contents)?),
        Some("json") => Ok(Table::from_json_str(&contents)?),
        Some("yml" | "yaml") => Ok(Table::from_yaml_str(&contents)?),
        _ => Err(CliError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Install the global tracing subscriber. Logs are written to stderr.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(args: &LoggingArgs) -> Result<(), TryInitError> {
    match args.log_format {
        LogFormat::Compact => init_subscriber(
            args,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(io::stderr),
        ),
        LogFormat::Json => init_subscriber(
            args,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_writer(io::stderr),
        ),
    }
}

fn build_env_filter(args: &LoggingArgs) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level))
}

fn init_subscriber<L>(args: &LoggingArgs, fmt_layer: L) -> Result<(), TryInitError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_env_filter(args))
        .try_init()
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::JPY};
    use testresult::TestResult;

    use crate::variants::Variant;

    use super::*;

    #[test]
    fn overrides_replace_only_given_values() -> TestResult {
        let args = CampaignArgs {
            budget: Some("5000 JPY".to_string()),
            large_cost: Some("1500 JPY".to_string()),
            ..CampaignArgs::default()
        };

        let config = args.apply(CampaignConfig::default())?;

        assert_eq!(config.budget(), Money::from_minor(5_000, JPY));
        assert_eq!(config.cost(Variant::Medium), Money::from_minor(1_000, JPY));
        assert_eq!(config.cost(Variant::Large), Money::from_minor(1_500, JPY));

        Ok(())
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let args = CampaignArgs {
            budget: Some("-1 JPY".to_string()),
            ..CampaignArgs::default()
        };

        assert!(matches!(
            args.apply(CampaignConfig::default()),
            Err(CliError::Campaign(CampaignError::NegativeBudget))
        ));
    }

    #[test]
    fn fixture_flag_is_parsed() -> TestResult {
        let args = MailshotArgs::try_parse_from([
            "mailshot",
            "--fixture",
            "example",
            "--fairness",
            "0%",
            "--output",
            "json",
        ])?;

        assert_eq!(args.fixture.as_deref(), Some("example"));
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.campaign.fairness.as_deref(), Some("0%"));

        let inputs = args.inputs()?;

        assert_eq!(inputs.customers.len(), 36);
        assert_eq!(inputs.campaign.budget().to_minor_units(), 15_000);

        Ok(())
    }

    #[test]
    fn read_table_picks_format_from_extension() -> TestResult {
        let dir = tempfile::tempdir()?;

        let json = dir.path().join("customers.json");
        fs::write(&json, r#"[{"customer_id": 1, "age_cat": "a", "freq_cat": "x"}]"#)?;

        let txt = dir.path().join("customers.txt");
        fs::write(&txt, "")?;

        assert_eq!(read_table(&json)?.len(), 1);
        assert!(matches!(
            read_table(&txt),
            Err(CliError::UnsupportedFormat(_))
        ));

        Ok(())
    }

    #[test]
    fn csv_inputs_are_read_from_files() -> TestResult {
        let dir = tempfile::tempdir()?;

        let customers = dir.path().join("customers.csv");
        fs::write(
            &customers,
            "customer_id,age_cat,freq_cat\n1,age20~34,freq0\n2,age35~49,freq1\n",
        )?;

        let probabilities = dir.path().join("visit_probability.csv");
        fs::write(
            &probabilities,
            "age_cat,freq_cat,segment_id,prob_dm1,prob_dm2,prob_dm3\n\
             age20~34,freq0,1,0.1,0.2,0.3\n\
             age35~49,freq1,2,0.2,0.25,0.3\n",
        )?;

        let customers_arg = customers.to_string_lossy().into_owned();
        let probabilities_arg = probabilities.to_string_lossy().into_owned();

        let args = MailshotArgs::try_parse_from([
            "mailshot",
            "--customers",
            customers_arg.as_str(),
            "--probabilities",
            probabilities_arg.as_str(),
            "--output",
            "csv",
        ])?;

        assert_eq!(args.output, OutputFormat::Csv);

        let inputs = args.inputs()?;

        assert_eq!(inputs.customers.len(), 2);
        assert_eq!(inputs.probabilities.len(), 2);

        Ok(())
    }

    #[test]
    fn inputs_require_a_source() -> TestResult {
        let args = MailshotArgs::try_parse_from(["mailshot"])?;

        assert!(matches!(args.inputs(), Err(CliError::MissingInput)));

        Ok(())
    }
}
