//! Fixtures
//!
//! A fixture set named `<name>` is made of up to three YAML files under the
//! base path:
//!
//! - `customers/<name>.yml`: list of customer records
//! - `probabilities/<name>.yml`: list of segment probability records
//! - `campaigns/<name>.yml`: campaign economics (optional, defaults apply)

use std::{fs, path::PathBuf};

use thiserror::Error;

use crate::{
    campaign::{CampaignConfig, CampaignError},
    customers::Customers,
    fixtures::campaign::CampaignFixture,
    probabilities::SegmentProbabilities,
    tables::{SchemaError, Table},
};

pub mod campaign;

pub use campaign::{parse_money, parse_percentage};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Fixture records do not form a valid table
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Campaign economics are invalid
    #[error(transparent)]
    Campaign(#[from] CampaignError),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// No customers loaded
    #[error("No customers loaded")]
    NoCustomers,

    /// No probabilities loaded
    #[error("No probabilities loaded")]
    NoProbabilities,
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    customers: Option<Customers>,
    probabilities: Option<SegmentProbabilities>,
    campaign: Option<CampaignConfig<'static>>,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            customers: None,
            probabilities: None,
            campaign: None,
        }
    }

    fn read_table(&self, category: &str, name: &str) -> Result<Table, FixtureError> {
        let file_path = self.base_path.join(category).join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        Ok(Table::from_yaml_str(&contents)?)
    }

    /// Load customers from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold valid customers.
    pub fn load_customers(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let table = self.read_table("customers", name)?;

        self.customers = Some(Customers::from_table(&table)?);

        Ok(self)
    }

    /// Load segment probabilities from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold valid probabilities.
    pub fn load_probabilities(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let table = self.read_table("probabilities", name)?;

        self.probabilities = Some(SegmentProbabilities::from_table(&table)?);

        Ok(self)
    }

    /// Load campaign economics from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the campaign is invalid.
    pub fn load_campaign(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("campaigns").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CampaignFixture = serde_norway::from_str(&contents)?;

        self.campaign = Some(CampaignConfig::try_from(fixture)?);

        Ok(self)
    }

    /// Create a fixture from a set of files with the same name. The campaign
    /// file is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_customers(name)?.load_probabilities(name)?;

        if fixture
            .base_path
            .join("campaigns")
            .join(format!("{name}.yml"))
            .exists()
        {
            fixture.load_campaign(name)?;
        }

        Ok(fixture)
    }

    /// Loaded customers
    ///
    /// # Errors
    ///
    /// Returns an error if no customers have been loaded.
    pub fn customers(&self) -> Result<&Customers, FixtureError> {
        self.customers.as_ref().ok_or(FixtureError::NoCustomers)
    }

    /// Loaded segment probabilities
    ///
    /// # Errors
    ///
    /// Returns an error if no probabilities have been loaded.
    pub fn probabilities(&self) -> Result<&SegmentProbabilities, FixtureError> {
        self.probabilities
            .as_ref()
            .ok_or(FixtureError::NoProbabilities)
    }

    /// Loaded campaign economics, or the default campaign.
    pub fn campaign(&self) -> CampaignConfig<'static> {
        self.campaign.unwrap_or_default()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use rusty_money::iso::JPY;
    use testresult::TestResult;

    use super::*;

    fn write_fixture(base: &Path, category: &str, name: &str, contents: &str) -> TestResult {
        let dir = base.join(category);

        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{name}.yml")), contents)?;

        Ok(())
    }

    const CUSTOMERS: &str = "- customer_id: 1\n  age_cat: young\n  freq_cat: low\n- customer_id: 2\n  age_cat: old\n  freq_cat: low\n";

    const PROBABILITIES: &str = "- age_cat: young\n  freq_cat: low\n  segment_id: 1\n  prob_dm1: 0.1\n  prob_dm2: 0.2\n  prob_dm3: 0.3\n- age_cat: old\n  freq_cat: low\n  segment_id: 1\n  prob_dm1: 0.2\n  prob_dm2: 0.25\n  prob_dm3: 0.3\n";

    #[test]
    fn fixture_loads_customers_probabilities_and_campaign() -> TestResult {
        let dir = tempfile::tempdir()?;

        write_fixture(dir.path(), "customers", "small", CUSTOMERS)?;
        write_fixture(dir.path(), "probabilities", "small", PROBABILITIES)?;
        write_fixture(
            dir.path(),
            "campaigns",
            "small",
            "medium_cost: 500 JPY\nlarge_cost: 900 JPY\nbudget: 2000 JPY\nfairness: 0%\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());

        fixture
            .load_customers("small")?
            .load_probabilities("small")?
            .load_campaign("small")?;

        assert_eq!(fixture.customers()?.len(), 2);
        assert_eq!(fixture.probabilities()?.len(), 2);

        let campaign = fixture.campaign();

        assert_eq!(campaign.budget().to_minor_units(), 2_000);
        assert_eq!(campaign.currency(), JPY);

        Ok(())
    }

    #[test]
    fn campaign_defaults_when_not_loaded() {
        let fixture = Fixture::with_base_path("/nonexistent");

        assert_eq!(fixture.campaign().budget().to_minor_units(), 1_000_000);
        assert!(matches!(fixture.customers(), Err(FixtureError::NoCustomers)));
    }

    #[test]
    fn missing_files_are_io_errors() {
        let mut fixture = Fixture::with_base_path("/nonexistent");

        let result = fixture.load_customers("missing");

        assert!(matches!(result, Err(FixtureError::Io(_))));
    }

    #[test]
    fn example_set_is_loadable() -> TestResult {
        let fixture = Fixture::from_set("example")?;

        assert_eq!(fixture.customers()?.len(), 36);
        assert_eq!(fixture.probabilities()?.len(), 12);
        assert_eq!(fixture.campaign().budget().to_minor_units(), 15_000);

        Ok(())
    }
}
