//! Campaign Fixtures

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use serde::Deserialize;

use crate::{
    campaign::{CampaignConfig, FairnessThresholds, VariantCosts},
    fixtures::FixtureError,
    variants::Variant,
};

/// Campaign economics in YAML
#[derive(Debug, Deserialize)]
pub struct CampaignFixture {
    /// Medium coupon value (e.g., "1000 JPY")
    pub medium_cost: String,

    /// Large coupon value (e.g., "2000 JPY")
    pub large_cost: String,

    /// Budget for expected coupon redemptions (e.g., "1000000 JPY")
    pub budget: String,

    /// Minimum share of each segment per variant; defaults to 10%
    #[serde(default)]
    pub fairness: Option<FairnessFixture>,
}

/// Fairness thresholds in YAML, either one value for all variants or one per variant
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FairnessFixture {
    /// Same threshold for every variant (e.g., "10%")
    Uniform(String),

    /// Per-variant thresholds; missing variants keep the default
    PerVariant {
        /// Threshold for the baseline variant
        baseline: Option<String>,

        /// Threshold for the medium variant
        medium: Option<String>,

        /// Threshold for the large variant
        large: Option<String>,
    },
}

impl TryFrom<FairnessFixture> for FairnessThresholds {
    type Error = FixtureError;

    fn try_from(fixture: FairnessFixture) -> Result<Self, Self::Error> {
        match fixture {
            FairnessFixture::Uniform(threshold) => {
                Ok(FairnessThresholds::uniform(parse_percentage(&threshold)?))
            }
            FairnessFixture::PerVariant {
                baseline,
                medium,
                large,
            } => {
                let mut thresholds = FairnessThresholds::default();

                for (variant, threshold) in [
                    (Variant::Baseline, baseline),
                    (Variant::Medium, medium),
                    (Variant::Large, large),
                ] {
                    if let Some(threshold) = threshold {
                        thresholds = thresholds.with(variant, parse_percentage(&threshold)?);
                    }
                }

                Ok(thresholds)
            }
        }
    }
}

impl TryFrom<CampaignFixture> for CampaignConfig<'static> {
    type Error = FixtureError;

    fn try_from(fixture: CampaignFixture) -> Result<Self, Self::Error> {
        let costs = VariantCosts::new(
            parse_money(&fixture.medium_cost)?,
            parse_money(&fixture.large_cost)?,
        );

        let budget = parse_money(&fixture.budget)?;

        let fairness = fixture
            .fairness
            .map(FairnessThresholds::try_from)
            .transpose()?
            .unwrap_or_default();

        Ok(CampaignConfig::new(costs, budget, fairness)?)
    }
}

/// Parse a money string (e.g., "2000 JPY" or "2.99 GBP") using the currency's
/// minor unit exponent.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", the
/// amount is not a number with at most the currency's precision, or the
/// currency code is not recognised.
pub fn parse_money(s: &str) -> Result<Money<'static, Currency>, FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    let [amount, currency_code] = parts.as_slice() else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = iso::find(currency_code)
        .ok_or_else(|| FixtureError::UnknownCurrency((*currency_code).to_string()))?;

    let scaled = (0..currency.exponent)
        .try_fold(amount, |acc, _| acc.checked_mul(Decimal::TEN))
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    // Amounts finer than the currency's minor unit are rejected, not rounded.
    if scaled.fract() != Decimal::ZERO {
        return Err(FixtureError::InvalidPrice(s.to_string()));
    }

    let minor_units = scaled
        .to_i64()
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    Ok(Money::from_minor(minor_units, currency))
}

/// Parse percentage string (e.g., "15%" or "0.15") into a `Percentage`
///
/// The value is read as a decimal, so non-finite or out-of-range numbers
/// (`NaN`, `inf`, `1e40`) are rejected rather than converted.
///
/// # Errors
///
/// Returns an error if the string is not a decimal number.
pub fn parse_percentage(s: &str) -> Result<Percentage, FixtureError> {
    let trimmed = s.trim();

    let value = match trimmed.strip_suffix('%') {
        Some(percent_str) => percent_str
            .trim()
            .parse::<Decimal>()
            .ok()
            .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED)),
        None => trimmed.parse::<Decimal>().ok(),
    }
    .ok_or_else(|| FixtureError::InvalidPercentage(s.to_string()))?;

    Ok(Percentage::from(value))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, JPY};
    use testresult::TestResult;

    use crate::campaign::CampaignError;

    use super::*;

    #[test]
    fn parse_money_uses_currency_exponent() -> TestResult {
        let yen = parse_money("2000 JPY")?;
        let pounds = parse_money("2.99 GBP")?;

        assert_eq!(yen.to_minor_units(), 2_000);
        assert_eq!(yen.currency(), JPY);
        assert_eq!(pounds.to_minor_units(), 299);
        assert_eq!(pounds.currency(), GBP);

        Ok(())
    }

    #[test]
    fn parse_money_rejects_sub_minor_amounts() {
        let result = parse_money("10.5 JPY");

        assert!(matches!(result, Err(FixtureError::InvalidPrice(_))));
    }

    #[test]
    fn parse_money_rejects_invalid_format() {
        assert!(matches!(
            parse_money("2000JPY"),
            Err(FixtureError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_money("2000 XYZ"),
            Err(FixtureError::UnknownCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn parse_percentage_accepts_both_formats() -> TestResult {
        assert_eq!(parse_percentage("15%")?, Percentage::from(Decimal::new(15, 2)));
        assert_eq!(parse_percentage(" 0.15 ")?, Percentage::from(Decimal::new(15, 2)));
        assert!(matches!(
            parse_percentage("ten"),
            Err(FixtureError::InvalidPercentage(_))
        ));

        Ok(())
    }

    #[test]
    fn parse_percentage_rejects_non_finite_and_huge_values() {
        for input in ["NaN", "inf", "-inf", "1e40", "NaN%", "1e40%"] {
            assert!(
                matches!(
                    parse_percentage(input),
                    Err(FixtureError::InvalidPercentage(ref raw)) if raw == input
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn campaign_fixture_with_unparseable_fairness_is_an_error() -> TestResult {
        let fixture: CampaignFixture = serde_norway::from_str(
            "medium_cost: 1000 JPY\nlarge_cost: 2000 JPY\nbudget: 15000 JPY\nfairness: \"NaN\"\n",
        )?;

        assert!(matches!(
            CampaignConfig::try_from(fixture),
            Err(FixtureError::InvalidPercentage(_))
        ));

        Ok(())
    }

    #[test]
    fn campaign_fixture_builds_validated_config() -> TestResult {
        let fixture: CampaignFixture = serde_norway::from_str(
            "medium_cost: 1000 JPY\nlarge_cost: 2000 JPY\nbudget: 15000 JPY\nfairness:\n  medium: 0%\n  large: 5%\n",
        )?;

        let config = CampaignConfig::try_from(fixture)?;

        assert_eq!(config.budget().to_minor_units(), 15_000);
        assert_eq!(config.fairness().fraction(Variant::Medium), Decimal::ZERO);
        assert_eq!(
            config.fairness().get(Variant::Large),
            Percentage::from(Decimal::new(5, 2))
        );
        assert_eq!(config.fairness().get(Variant::Baseline), Percentage::from(0.10));

        Ok(())
    }

    #[test]
    fn campaign_fixture_rejects_mixed_currencies() -> TestResult {
        let fixture: CampaignFixture = serde_norway::from_str(
            "medium_cost: 1000 JPY\nlarge_cost: 2000 JPY\nbudget: 100 GBP\n",
        )?;

        let result = CampaignConfig::try_from(fixture);

        assert!(matches!(
            result,
            Err(FixtureError::Campaign(CampaignError::CurrencyMismatch(
                "GBP", "JPY"
            )))
        ));

        Ok(())
    }
}
