use super::classifier::{RiskTier, UnknownRiskTier};
use super::domain::{Outcome, ScreeningResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome axis of the results filter. `All` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutcomeSelector {
    #[default]
    All,
    Only(Outcome),
}

impl OutcomeSelector {
    pub fn matches(self, result: &ScreeningResult) -> bool {
        match self {
            Self::All => true,
            Self::Only(outcome) => result.known_outcome() == Some(outcome),
        }
    }
}

/// Tier axis of the results filter. `All` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TierSelector {
    #[default]
    All,
    Only(RiskTier),
}

impl TierSelector {
    pub fn matches(self, result: &ScreeningResult) -> bool {
        match self {
            Self::All => true,
            Self::Only(tier) => result.tier() == tier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("unknown outcome selector '{0}', expected all, SÍ, or NO")]
    Outcome(String),
    #[error(transparent)]
    Tier(#[from] UnknownRiskTier),
}

impl FromStr for OutcomeSelector {
    type Err = SelectorError;

    /// Accepts the wire strings plus the unaccented `SI` typed on keyboards
    /// without dead keys.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        match trimmed.to_uppercase().as_str() {
            "SÍ" | "SI" => Ok(Self::Only(Outcome::Positive)),
            "NO" => Ok(Self::Only(Outcome::Negative)),
            _ => Err(SelectorError::Outcome(value.to_string())),
        }
    }
}

impl FromStr for TierSelector {
    type Err = SelectorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        Ok(Self::Only(trimmed.parse()?))
    }
}

impl fmt::Display for OutcomeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(outcome) => f.write_str(outcome.wire_label()),
        }
    }
}

impl fmt::Display for TierSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(RiskTier::Low) => f.write_str("low"),
            Self::Only(RiskTier::Medium) => f.write_str("medium"),
            Self::Only(RiskTier::High) => f.write_str("high"),
        }
    }
}

impl Serialize for OutcomeSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for TierSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OutcomeSelector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for TierSelector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Compound filter over outcome and risk tier, combined with logical AND.
/// Each axis can be reset to `All` without touching the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultFilter {
    #[serde(default)]
    pub outcome: OutcomeSelector,
    #[serde(default, rename = "risk")]
    pub tier: TierSelector,
}

impl ResultFilter {
    pub fn new(outcome: OutcomeSelector, tier: TierSelector) -> Self {
        Self { outcome, tier }
    }

    pub fn with_outcome(self, outcome: OutcomeSelector) -> Self {
        Self { outcome, ..self }
    }

    pub fn with_tier(self, tier: TierSelector) -> Self {
        Self { tier, ..self }
    }

    pub fn reset_outcome(self) -> Self {
        self.with_outcome(OutcomeSelector::All)
    }

    pub fn reset_tier(self) -> Self {
        self.with_tier(TierSelector::All)
    }

    pub fn is_identity(&self) -> bool {
        self.outcome == OutcomeSelector::All && self.tier == TierSelector::All
    }

    pub fn matches(&self, result: &ScreeningResult) -> bool {
        self.outcome.matches(result) && self.tier.matches(result)
    }

    /// Order-preserving subsequence of `results` matching both axes.
    pub fn apply<'a>(&self, results: &'a [ScreeningResult]) -> Vec<&'a ScreeningResult> {
        results.iter().filter(|result| self.matches(result)).collect()
    }
}

/// Results filtered for display, computed eagerly from a source collection.
/// A new view is built whenever the source or the filter changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredResults {
    pub filter: ResultFilter,
    pub source_total: usize,
    pub results: Vec<ScreeningResult>,
}

impl FilteredResults {
    pub fn new(results: &[ScreeningResult], filter: ResultFilter) -> Self {
        Self {
            filter,
            source_total: results.len(),
            results: filter.apply(results).into_iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_parse_case_insensitively() {
        assert_eq!("ALL".parse::<OutcomeSelector>(), Ok(OutcomeSelector::All));
        assert_eq!(
            "sí".parse::<OutcomeSelector>(),
            Ok(OutcomeSelector::Only(Outcome::Positive))
        );
        assert_eq!(
            "SI".parse::<OutcomeSelector>(),
            Ok(OutcomeSelector::Only(Outcome::Positive))
        );
        assert_eq!(
            "high".parse::<TierSelector>(),
            Ok(TierSelector::Only(RiskTier::High))
        );
        assert!("maybe".parse::<OutcomeSelector>().is_err());
        assert!("severe".parse::<TierSelector>().is_err());
    }

    #[test]
    fn axes_reset_independently() {
        let filter = ResultFilter::new(
            OutcomeSelector::Only(Outcome::Negative),
            TierSelector::Only(RiskTier::Low),
        );

        let outcome_reset = filter.reset_outcome();
        assert_eq!(outcome_reset.outcome, OutcomeSelector::All);
        assert_eq!(outcome_reset.tier, TierSelector::Only(RiskTier::Low));

        let tier_reset = filter.reset_tier();
        assert_eq!(tier_reset.outcome, OutcomeSelector::Only(Outcome::Negative));
        assert_eq!(tier_reset.tier, TierSelector::All);

        assert!(filter.reset_outcome().reset_tier().is_identity());
    }

    #[test]
    fn filter_round_trips_through_query_strings() {
        let filter: ResultFilter =
            serde_json::from_value(serde_json::json!({ "outcome": "NO", "risk": "medium" }))
                .expect("filter decodes");
        assert_eq!(
            filter,
            ResultFilter::new(
                OutcomeSelector::Only(Outcome::Negative),
                TierSelector::Only(RiskTier::Medium)
            )
        );
        assert_eq!(
            serde_json::to_value(filter).expect("filter serialises"),
            serde_json::json!({ "outcome": "NO", "risk": "medium" })
        );
    }
}
