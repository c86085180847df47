use super::classifier::{PresentationClass, RiskTier};
use super::domain::{Outcome, ScreeningResult};
use serde::Serialize;

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    pub total_users: usize,
    pub total_tests: usize,
    pub positive_tests: usize,
    pub negative_tests: usize,
    pub average_risk: f64,
}

/// Positive/negative split feeding the outcome pie chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSplit {
    pub positive: usize,
    pub negative: usize,
}

impl OutcomeSplit {
    pub fn entries(&self) -> [OutcomeSliceEntry; 2] {
        [
            OutcomeSliceEntry {
                outcome: Outcome::Negative,
                label: "No risk",
                count: self.negative,
                presentation: Outcome::Negative.presentation(),
            },
            OutcomeSliceEntry {
                outcome: Outcome::Positive,
                label: "At risk",
                count: self.positive,
                presentation: Outcome::Positive.presentation(),
            },
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSliceEntry {
    pub outcome: Outcome,
    pub label: &'static str,
    pub count: usize,
    pub presentation: PresentationClass,
}

/// Results per risk tier. The buckets always sum to the number of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierHistogram {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl TierHistogram {
    pub fn from_results(results: &[ScreeningResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut histogram, result| {
                *histogram.bucket_mut(result.tier()) += 1;
                histogram
            })
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }

    fn bucket_mut(&mut self, tier: RiskTier) -> &mut usize {
        match tier {
            RiskTier::Low => &mut self.low,
            RiskTier::Medium => &mut self.medium,
            RiskTier::High => &mut self.high,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }

    pub fn entries(&self) -> Vec<TierBucketEntry> {
        RiskTier::ordered()
            .into_iter()
            .map(|tier| TierBucketEntry {
                tier,
                label: tier.bucket_label(),
                count: self.count(tier),
                presentation: tier.presentation(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierBucketEntry {
    pub tier: RiskTier,
    pub label: &'static str,
    pub count: usize,
    pub presentation: PresentationClass,
}

/// Everything the dashboard derives from one result collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultAggregate {
    pub statistics: DashboardStatistics,
    pub outcome_split: OutcomeSplit,
    pub tier_histogram: TierHistogram,
}

/// Single pass over the results. `total_users` is supplied by the caller
/// because it comes from the independently fetched user list.
pub fn aggregate(total_users: usize, results: &[ScreeningResult]) -> ResultAggregate {
    let mut positive = 0;
    let mut negative = 0;
    let mut probability_sum = 0.0;

    for result in results {
        match result.known_outcome() {
            Some(Outcome::Positive) => positive += 1,
            Some(Outcome::Negative) => negative += 1,
            None => {}
        }
        probability_sum += result.probability;
    }

    let average_risk = if results.is_empty() {
        0.0
    } else {
        probability_sum / results.len() as f64
    };

    ResultAggregate {
        statistics: DashboardStatistics {
            total_users,
            total_tests: results.len(),
            positive_tests: positive,
            negative_tests: negative,
            average_risk,
        },
        outcome_split: OutcomeSplit { positive, negative },
        tier_histogram: TierHistogram::from_results(results),
    }
}
