use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Probabilities strictly below this value are low risk.
pub const LOW_RISK_CEILING: f64 = 30.0;
/// Probabilities at or above this value are high risk.
pub const HIGH_RISK_FLOOR: f64 = 70.0;

/// Discrete risk bucket derived from a screening probability.
///
/// Variants are declared in severity order so `Ord` follows low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const fn ordered() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    /// Total over every `f64`. NaN is treated as the bottom of the scale,
    /// values outside [0, 100] fall into the nearest tier.
    pub fn classify(probability: f64) -> Self {
        if probability.is_nan() || probability < LOW_RISK_CEILING {
            Self::Low
        } else if probability < HIGH_RISK_FLOOR {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Legend used by the tier histogram.
    pub const fn bucket_label(self) -> &'static str {
        match self {
            Self::Low => "Low (<30%)",
            Self::Medium => "Medium (30-70%)",
            Self::High => "High (>=70%)",
        }
    }

    pub const fn presentation(self) -> PresentationClass {
        match self {
            Self::Low => PresentationClass::Success,
            Self::Medium => PresentationClass::Warning,
            Self::High => PresentationClass::Error,
        }
    }

    /// Parses a server-supplied risk label. The backend emits Spanish labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "bajo" | "riesgo bajo" => Some(Self::Low),
            "medium" | "medio" | "riesgo medio" => Some(Self::Medium),
            "high" | "alto" | "riesgo alto" | "riesgo muy alto" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk tier '{0}', expected low, medium, or high")]
pub struct UnknownRiskTier(pub String);

impl FromStr for RiskTier {
    type Err = UnknownRiskTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownRiskTier(value.to_string())),
        }
    }
}

/// Colour family shared by every chip and table renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationClass {
    Success,
    Warning,
    Error,
    Default,
}

/// Forces a wire percentage into [0, 100]; NaN becomes 0.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoints_sit_exactly_at_thirty_and_seventy() {
        assert_eq!(RiskTier::classify(0.0), RiskTier::Low);
        assert_eq!(RiskTier::classify(29.999), RiskTier::Low);
        assert_eq!(RiskTier::classify(30.0), RiskTier::Medium);
        assert_eq!(RiskTier::classify(69.999), RiskTier::Medium);
        assert_eq!(RiskTier::classify(70.0), RiskTier::High);
        assert_eq!(RiskTier::classify(100.0), RiskTier::High);
    }

    #[test]
    fn classification_never_decreases_as_probability_rises() {
        let mut previous = RiskTier::classify(0.0);
        for step in 0..=10_000 {
            let tier = RiskTier::classify(step as f64 / 100.0);
            assert!(tier >= previous, "tier dropped at {}", step as f64 / 100.0);
            previous = tier;
        }
    }

    #[test]
    fn out_of_domain_values_are_total() {
        assert_eq!(RiskTier::classify(f64::NAN), RiskTier::Low);
        assert_eq!(RiskTier::classify(-5.0), RiskTier::Low);
        assert_eq!(RiskTier::classify(250.0), RiskTier::High);
        assert_eq!(RiskTier::classify(f64::INFINITY), RiskTier::High);
        assert_eq!(clamp_percentage(f64::NAN), 0.0);
        assert_eq!(clamp_percentage(-1.0), 0.0);
        assert_eq!(clamp_percentage(101.0), 100.0);
    }

    #[test]
    fn severity_order_and_presentation_line_up() {
        let ordered = RiskTier::ordered();
        assert!(ordered.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(
            ordered.map(RiskTier::presentation),
            [
                PresentationClass::Success,
                PresentationClass::Warning,
                PresentationClass::Error
            ]
        );
    }

    #[test]
    fn parses_selector_and_server_labels() {
        assert_eq!("Medium".parse::<RiskTier>(), Ok(RiskTier::Medium));
        assert!("extreme".parse::<RiskTier>().is_err());
        assert_eq!(RiskTier::from_label("Alto"), Some(RiskTier::High));
        assert_eq!(RiskTier::from_label("Bajo"), Some(RiskTier::Low));
        assert_eq!(RiskTier::from_label("unknown"), None);
    }
}
