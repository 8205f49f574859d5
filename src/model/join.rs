//! Customer / Probability Join

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    customers::Customers,
    model::error::JoinIntegrityError,
    probabilities::{SegmentId, SegmentProbabilities},
    variants::VariantMap,
};

/// A segment and the positions of its customers in the model's customer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment label
    pub id: SegmentId,

    /// Customer positions, ascending
    pub members: Vec<usize>,
}

impl Segment {
    /// Number of customers in the segment.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the segment has no customers.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Customer to segment mapping derived from the join.
///
/// Segments are kept in the order their first customer appears. Only segments
/// with at least one customer are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentMembership {
    segments: Vec<Segment>,
    customer_segment: Vec<usize>,
}

impl SegmentMembership {
    fn assign(&mut self, lookup: &mut FxHashMap<SegmentId, usize>, id: &SegmentId) {
        let customer = self.customer_segment.len();

        let segment_idx = *lookup.entry(id.clone()).or_insert_with(|| {
            self.segments.push(Segment {
                id: id.clone(),
                members: Vec::new(),
            });

            self.segments.len() - 1
        });

        if let Some(segment) = self.segments.get_mut(segment_idx) {
            segment.members.push(customer);
        }

        self.customer_segment.push(segment_idx);
    }

    /// Iterate over the segments.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Segment of the customer at `customer` position.
    pub fn segment_of(&self, customer: usize) -> Option<&Segment> {
        self.customer_segment
            .get(customer)
            .and_then(|idx| self.segments.get(*idx))
    }

    /// Number of customers in a segment, zero if unknown.
    pub fn size(&self, id: &SegmentId) -> usize {
        self.segments
            .iter()
            .find(|segment| &segment.id == id)
            .map_or(0, Segment::len)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether there are no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Result of joining customers to probabilities on `(age_cat, freq_cat)`.
#[derive(Debug, Clone)]
pub(crate) struct Joined {
    /// Visit probabilities per customer, in customer order
    pub(crate) probabilities: Vec<VariantMap<f64>>,

    /// Segment membership
    pub(crate) segments: SegmentMembership,
}

/// Join every customer to exactly one probability row.
///
/// # Errors
///
/// Returns a [`JoinIntegrityError`] if a customer matches no row or several rows.
pub(crate) fn join(
    customers: &Customers,
    probabilities: &SegmentProbabilities,
) -> Result<Joined, JoinIntegrityError> {
    let mut index: FxHashMap<(&str, &str), SmallVec<[usize; 1]>> = FxHashMap::default();

    for (row_idx, row) in probabilities.iter().enumerate() {
        index.entry(row.key()).or_default().push(row_idx);
    }

    let mut joined = Joined {
        probabilities: Vec::with_capacity(customers.len()),
        segments: SegmentMembership::default(),
    };

    let mut segment_lookup = FxHashMap::default();

    for customer in customers.iter() {
        let key = (customer.age_cat.as_str(), customer.freq_cat.as_str());

        let row = match index.get(&key).map(SmallVec::as_slice) {
            Some([row_idx]) => probabilities.get(*row_idx),
            Some(rows) if rows.len() > 1 => {
                return Err(JoinIntegrityError::DuplicateProbability {
                    customer_id: customer.customer_id,
                    age_cat: customer.age_cat.clone(),
                    freq_cat: customer.freq_cat.clone(),
                    rows: rows.len(),
                });
            }
            _ => None,
        };

        let Some(row) = row else {
            return Err(JoinIntegrityError::MissingProbability {
                customer_id: customer.customer_id,
                age_cat: customer.age_cat.clone(),
                freq_cat: customer.freq_cat.clone(),
            });
        };

        joined.probabilities.push(row.probabilities);
        joined.segments.assign(&mut segment_lookup, &row.segment_id);
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        customers::{Customer, CustomerId},
        probabilities::SegmentProbability,
    };

    use super::*;

    fn probabilities() -> Result<SegmentProbabilities, crate::tables::SchemaError> {
        SegmentProbabilities::new(vec![
            SegmentProbability::new("young", "low", "a", VariantMap::new(0.1, 0.2, 0.3)),
            SegmentProbability::new("young", "high", "b", VariantMap::new(0.4, 0.5, 0.6)),
            SegmentProbability::new("old", "low", "a", VariantMap::new(0.2, 0.2, 0.2)),
            SegmentProbability::new("unused", "low", "z", VariantMap::new(0.0, 0.0, 0.0)),
        ])
    }

    #[test]
    fn join_looks_up_probabilities_and_segments() -> TestResult {
        let customers = Customers::new(vec![
            Customer::new(1, "young", "high"),
            Customer::new(2, "young", "low"),
            Customer::new(3, "old", "low"),
        ])?;

        let joined = join(&customers, &probabilities()?)?;

        assert_eq!(
            joined.probabilities,
            vec![
                VariantMap::new(0.4, 0.5, 0.6),
                VariantMap::new(0.1, 0.2, 0.3),
                VariantMap::new(0.2, 0.2, 0.2),
            ]
        );

        // Segments appear in first-customer order; the unused segment is absent.
        let ids: Vec<&str> = joined.segments.iter().map(|s| s.id.0.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        assert_eq!(joined.segments.size(&SegmentId::from("a")), 2);
        assert_eq!(joined.segments.size(&SegmentId::from("z")), 0);
        assert_eq!(
            joined.segments.segment_of(2).map(|s| s.members.clone()),
            Some(vec![1, 2])
        );

        Ok(())
    }

    #[test]
    fn join_rejects_customers_without_probabilities() -> TestResult {
        let customers = Customers::new(vec![
            Customer::new(1, "young", "high"),
            Customer::new(2, "old", "high"),
        ])?;

        let result = join(&customers, &probabilities()?);

        assert_eq!(
            result.err(),
            Some(JoinIntegrityError::MissingProbability {
                customer_id: CustomerId(2),
                age_cat: "old".to_string(),
                freq_cat: "high".to_string(),
            })
        );

        Ok(())
    }

    #[test]
    fn join_rejects_duplicated_probability_rows() -> TestResult {
        let mut rows: Vec<SegmentProbability> = probabilities()?.iter().cloned().collect();
        rows.push(SegmentProbability::new(
            "young",
            "low",
            "c",
            VariantMap::new(0.1, 0.1, 0.1),
        ));

        let customers = Customers::new(vec![Customer::new(1, "young", "low")])?;

        let result = join(&customers, &SegmentProbabilities::new(rows)?);

        assert!(matches!(
            result,
            Err(JoinIntegrityError::DuplicateProbability { rows: 2, .. })
        ));

        Ok(())
    }

    #[test]
    fn duplicates_not_referenced_by_customers_are_ignored() -> TestResult {
        let mut rows: Vec<SegmentProbability> = probabilities()?.iter().cloned().collect();
        rows.push(SegmentProbability::new(
            "unused",
            "low",
            "z",
            VariantMap::new(0.0, 0.0, 0.0),
        ));

        let customers = Customers::new(vec![Customer::new(1, "young", "low")])?;

        let joined = join(&customers, &SegmentProbabilities::new(rows)?)?;

        assert_eq!(joined.probabilities.len(), 1);

        Ok(())
    }
}
