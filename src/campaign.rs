//! Campaign Configuration
//!
//! Campaign economics are inputs to the model: the coupon value sent with each
//! incentivised variant, the total budget for expected coupon redemptions, and
//! the minimum share of every segment that must receive each variant.

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::variants::{Variant, VariantMap};

/// Default coupon value for the medium variant, in minor units.
pub const DEFAULT_MEDIUM_COST_MINOR: i64 = 1_000;

/// Default coupon value for the large variant, in minor units.
pub const DEFAULT_LARGE_COST_MINOR: i64 = 2_000;

/// Default campaign budget, in minor units.
pub const DEFAULT_BUDGET_MINOR: i64 = 1_000_000;

/// Default minimum share of each segment per variant.
pub const DEFAULT_FAIRNESS: f64 = 0.10;

/// Invalid campaign configuration
#[derive(Debug, Error, PartialEq)]
pub enum CampaignError {
    /// An incentivised variant must have a strictly positive coupon value.
    #[error("coupon value for {0} must be positive")]
    NonPositiveCost(Variant),

    /// The budget cannot be negative.
    #[error("campaign budget cannot be negative")]
    NegativeBudget,

    /// All amounts must use the same currency (expected, found).
    #[error("currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// A fairness threshold is not a fraction in `[0, 1]`.
    #[error("fairness threshold for {0} must be between 0 and 1")]
    ThresholdOutOfRange(Variant),
}

/// Coupon value sent with each incentivised variant. The baseline variant costs nothing.
#[derive(Debug, Clone, Copy)]
pub struct VariantCosts<'a> {
    /// Coupon value of the medium variant
    pub medium: Money<'a, Currency>,

    /// Coupon value of the large variant
    pub large: Money<'a, Currency>,
}

impl<'a> VariantCosts<'a> {
    /// Create coupon values for the medium and large variants.
    pub const fn new(medium: Money<'a, Currency>, large: Money<'a, Currency>) -> Self {
        Self { medium, large }
    }

    /// Coupon value of a variant.
    pub fn get(&self, variant: Variant) -> Money<'a, Currency> {
        match variant {
            Variant::Baseline => Money::from_minor(0, self.medium.currency()),
            Variant::Medium => self.medium,
            Variant::Large => self.large,
        }
    }
}

/// Minimum share of each segment that must receive each variant.
#[derive(Debug, Clone, Copy)]
pub struct FairnessThresholds(VariantMap<Percentage>);

impl FairnessThresholds {
    /// Separate thresholds per variant.
    pub fn new(baseline: Percentage, medium: Percentage, large: Percentage) -> Self {
        Self(VariantMap::new(baseline, medium, large))
    }

    /// The same threshold for every variant.
    pub fn uniform(threshold: Percentage) -> Self {
        Self(VariantMap::new(threshold, threshold, threshold))
    }

    /// No minimum share for any variant.
    pub fn none() -> Self {
        Self::uniform(Percentage::from(0.0))
    }

    /// Threshold for a variant.
    pub fn get(&self, variant: Variant) -> Percentage {
        *self.0.get(variant)
    }

    /// Threshold for a variant as a decimal fraction.
    pub fn fraction(&self, variant: Variant) -> Decimal {
        self.get(variant) * Decimal::ONE
    }

    /// Replace the threshold for one variant.
    #[must_use]
    pub fn with(mut self, variant: Variant, threshold: Percentage) -> Self {
        *self.0.get_mut(variant) = threshold;
        self
    }
}

impl Default for FairnessThresholds {
    fn default() -> Self {
        Self::uniform(Percentage::from(DEFAULT_FAIRNESS))
    }
}

/// Campaign economics used by the model builder.
#[derive(Debug, Clone, Copy)]
pub struct CampaignConfig<'a> {
    costs: VariantCosts<'a>,
    budget: Money<'a, Currency>,
    fairness: FairnessThresholds,
}

impl<'a> CampaignConfig<'a> {
    /// Create a validated campaign configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`CampaignError`] if a coupon value is not positive, the budget
    /// is negative, currencies differ, or a fairness threshold is outside `[0, 1]`.
    pub fn new(
        costs: VariantCosts<'a>,
        budget: Money<'a, Currency>,
        fairness: FairnessThresholds,
    ) -> Result<Self, CampaignError> {
        let config = Self {
            costs,
            budget,
            fairness,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), CampaignError> {
        let currency = self.budget.currency();

        for variant in Variant::INCENTIVISED {
            let cost = self.costs.get(variant);

            if cost.currency() != currency {
                return Err(CampaignError::CurrencyMismatch(
                    currency.iso_alpha_code,
                    cost.currency().iso_alpha_code,
                ));
            }

            if cost.to_minor_units() <= 0 {
                return Err(CampaignError::NonPositiveCost(variant));
            }
        }

        if self.budget.to_minor_units() < 0 {
            return Err(CampaignError::NegativeBudget);
        }

        for variant in Variant::ALL {
            let fraction = self.fairness.fraction(variant);

            if fraction < Decimal::ZERO || fraction > Decimal::ONE {
                return Err(CampaignError::ThresholdOutOfRange(variant));
            }
        }

        Ok(())
    }

    /// Replace the budget.
    ///
    /// # Errors
    ///
    /// Returns a [`CampaignError`] if the budget is negative or in another currency.
    pub fn with_budget(self, budget: Money<'a, Currency>) -> Result<Self, CampaignError> {
        Self::new(self.costs, budget, self.fairness)
    }

    /// Replace the coupon values.
    ///
    /// # Errors
    ///
    /// Returns a [`CampaignError`] if a value is not positive or in another currency.
    pub fn with_costs(self, costs: VariantCosts<'a>) -> Result<Self, CampaignError> {
        Self::new(costs, self.budget, self.fairness)
    }

    /// Replace the fairness thresholds.
    ///
    /// # Errors
    ///
    /// Returns a [`CampaignError`] if a threshold is outside `[0, 1]`.
    pub fn with_fairness(self, fairness: FairnessThresholds) -> Result<Self, CampaignError> {
        Self::new(self.costs, self.budget, fairness)
    }

    /// Coupon value of a variant.
    pub fn cost(&self, variant: Variant) -> Money<'a, Currency> {
        self.costs.get(variant)
    }

    /// Coupon values.
    pub fn costs(&self) -> VariantCosts<'a> {
        self.costs
    }

    /// Total budget for expected coupon redemptions.
    pub fn budget(&self) -> Money<'a, Currency> {
        self.budget
    }

    /// Fairness thresholds.
    pub fn fairness(&self) -> FairnessThresholds {
        self.fairness
    }

    /// Currency shared by all amounts.
    pub fn currency(&self) -> &'a Currency {
        self.budget.currency()
    }
}

impl Default for CampaignConfig<'static> {
    fn default() -> Self {
        let currency = rusty_money::iso::JPY;

        Self {
            costs: VariantCosts::new(
                Money::from_minor(DEFAULT_MEDIUM_COST_MINOR, currency),
                Money::from_minor(DEFAULT_LARGE_COST_MINOR, currency),
            ),
            budget: Money::from_minor(DEFAULT_BUDGET_MINOR, currency),
            fairness: FairnessThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, JPY};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn default_campaign_uses_yen_coupons_and_ten_percent_fairness() {
        let config = CampaignConfig::default();

        assert_eq!(config.cost(Variant::Baseline).to_minor_units(), 0);
        assert_eq!(config.cost(Variant::Medium).to_minor_units(), 1_000);
        assert_eq!(config.cost(Variant::Large).to_minor_units(), 2_000);
        assert_eq!(config.budget().to_minor_units(), 1_000_000);
        assert_eq!(config.currency(), JPY);
        assert_eq!(
            config.fairness().fraction(Variant::Medium),
            Percentage::from(0.10) * Decimal::ONE
        );
    }

    #[test]
    fn zero_budget_is_allowed() -> TestResult {
        let config = CampaignConfig::default().with_budget(Money::from_minor(0, JPY))?;

        assert_eq!(config.budget().to_minor_units(), 0);

        Ok(())
    }

    #[test]
    fn negative_budget_is_rejected() {
        let result = CampaignConfig::default().with_budget(Money::from_minor(-1, JPY));

        assert_eq!(result.err(), Some(CampaignError::NegativeBudget));
    }

    #[test]
    fn zero_coupon_value_is_rejected() {
        let costs = VariantCosts::new(Money::from_minor(0, JPY), Money::from_minor(2_000, JPY));

        let result = CampaignConfig::default().with_costs(costs);

        assert_eq!(
            result.err(),
            Some(CampaignError::NonPositiveCost(Variant::Medium))
        );
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let costs = VariantCosts::new(Money::from_minor(100, GBP), Money::from_minor(200, GBP));

        let result = CampaignConfig::default().with_costs(costs);

        assert_eq!(result.err(), Some(CampaignError::CurrencyMismatch("JPY", "GBP")));
    }

    #[test]
    fn thresholds_above_one_are_rejected() {
        let fairness = FairnessThresholds::default().with(Variant::Large, Percentage::from(1.5));

        let result = CampaignConfig::default().with_fairness(fairness);

        assert_eq!(
            result.err(),
            Some(CampaignError::ThresholdOutOfRange(Variant::Large))
        );
    }

    #[test]
    fn relaxing_one_variant_keeps_the_others() {
        let fairness = FairnessThresholds::default().with(Variant::Medium, Percentage::from(0.0));

        assert_eq!(fairness.fraction(Variant::Medium), Decimal::ZERO);
        assert_eq!(
            fairness.fraction(Variant::Baseline),
            Percentage::from(0.10) * Decimal::ONE
        );
    }
}
