//! Mail Variants

use std::fmt;

use serde::{Deserialize, Serialize};

/// A direct-mail treatment a customer can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Variant 1: mail without a coupon
    Baseline,

    /// Variant 2: mail with the medium coupon
    Medium,

    /// Variant 3: mail with the large coupon
    Large,
}

impl Variant {
    /// All variants, in column order.
    pub const ALL: [Variant; 3] = [Variant::Baseline, Variant::Medium, Variant::Large];

    /// Variants that carry an incentive.
    pub const INCENTIVISED: [Variant; 2] = [Variant::Medium, Variant::Large];

    /// One-based variant number used in column names (`prob_dm1` ...).
    pub const fn number(self) -> u8 {
        match self {
            Variant::Baseline => 1,
            Variant::Medium => 2,
            Variant::Large => 3,
        }
    }

    /// Zero-based position of the variant in [`Variant::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Variant::Baseline => 0,
            Variant::Medium => 1,
            Variant::Large => 2,
        }
    }

    /// Whether the variant carries an incentive.
    pub const fn is_incentivised(self) -> bool {
        !matches!(self, Variant::Baseline)
    }

    /// Name of the visit probability column for this variant.
    pub const fn probability_column(self) -> &'static str {
        match self {
            Variant::Baseline => "prob_dm1",
            Variant::Medium => "prob_dm2",
            Variant::Large => "prob_dm3",
        }
    }

    /// Name of the solution indicator column for this variant.
    pub const fn solution_column(self) -> &'static str {
        match self {
            Variant::Baseline => "send_prob_dm1",
            Variant::Medium => "send_prob_dm2",
            Variant::Large => "send_prob_dm3",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dm{}", self.number())
    }
}

/// A value for each of the three variants.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VariantMap<T> {
    /// Value for [`Variant::Baseline`]
    pub baseline: T,

    /// Value for [`Variant::Medium`]
    pub medium: T,

    /// Value for [`Variant::Large`]
    pub large: T,
}

impl<T> VariantMap<T> {
    /// Create a map from one value per variant.
    pub const fn new(baseline: T, medium: T, large: T) -> Self {
        Self {
            baseline,
            medium,
            large,
        }
    }

    /// Build a map by calling `f` for every variant.
    pub fn from_fn(mut f: impl FnMut(Variant) -> T) -> Self {
        Self {
            baseline: f(Variant::Baseline),
            medium: f(Variant::Medium),
            large: f(Variant::Large),
        }
    }

    /// Get the value for a variant.
    pub const fn get(&self, variant: Variant) -> &T {
        match variant {
            Variant::Baseline => &self.baseline,
            Variant::Medium => &self.medium,
            Variant::Large => &self.large,
        }
    }

    /// Get a mutable reference to the value for a variant.
    pub fn get_mut(&mut self, variant: Variant) -> &mut T {
        match variant {
            Variant::Baseline => &mut self.baseline,
            Variant::Medium => &mut self.medium,
            Variant::Large => &mut self.large,
        }
    }

    /// Iterate over `(variant, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Variant, &T)> {
        Variant::ALL.into_iter().map(move |variant| (variant, self.get(variant)))
    }

    /// Transform every value.
    pub fn map<U>(&self, mut f: impl FnMut(Variant, &T) -> U) -> VariantMap<U> {
        VariantMap::from_fn(|variant| f(variant, self.get(variant)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_and_indices_follow_column_order() {
        for (idx, variant) in Variant::ALL.into_iter().enumerate() {
            assert_eq!(variant.index(), idx);
            assert_eq!(usize::from(variant.number()), idx + 1);
        }
    }

    #[test]
    fn only_baseline_is_not_incentivised() {
        assert!(!Variant::Baseline.is_incentivised());
        assert!(Variant::INCENTIVISED.iter().all(|v| v.is_incentivised()));
    }

    #[test]
    fn column_names_match_dataset_headers() {
        assert_eq!(Variant::Medium.probability_column(), "prob_dm2");
        assert_eq!(Variant::Large.solution_column(), "send_prob_dm3");
        assert_eq!(Variant::Baseline.to_string(), "dm1");
    }

    #[test]
    fn variant_map_get_and_map() {
        let mut probs: VariantMap<f64> = VariantMap::new(0.1, 0.3, 0.5);

        *probs.get_mut(Variant::Medium) = 0.25;

        let lift = probs.map(|_, p| p - 0.1);

        assert!((lift.medium - 0.15).abs() < 1e-12);
        assert!((lift.large - 0.4).abs() < 1e-12);
        assert_eq!(probs.iter().count(), 3);
    }
}
