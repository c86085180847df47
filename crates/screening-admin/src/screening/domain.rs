use super::classifier::{clamp_percentage, PresentationClass, RiskTier};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Identifiers arrive as strings from the current backend and as integers from
/// older exports; both normalise to their decimal text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawIdentifier> for String {
    fn from(raw: RawIdentifier) -> Self {
        match raw {
            RawIdentifier::Text(text) => text,
            RawIdentifier::Signed(value) => value.to_string(),
            RawIdentifier::Unsigned(value) => value.to_string(),
        }
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                RawIdentifier::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Tutor (guardian) account identifier.
    UserId
);
identifier!(
    /// Child profile identifier.
    ChildId
);

/// Guardian account owning zero or more children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_age")]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(
        default,
        alias = "created_at",
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
}

/// Minor profile belonging to exactly one tutor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: ChildId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_age")]
    pub age: Option<u32>,
    #[serde(alias = "user_id")]
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(
        default,
        alias = "birth_date",
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<NaiveDate>,
}

/// Binary screening verdict. The wire strings are fixed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "SÍ")]
    Positive,
    #[serde(rename = "NO")]
    Negative,
}

impl Outcome {
    pub const fn wire_label(self) -> &'static str {
        match self {
            Self::Positive => "SÍ",
            Self::Negative => "NO",
        }
    }

    /// Exact match on the wire strings.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "SÍ" => Some(Self::Positive),
            "NO" => Some(Self::Negative),
            _ => None,
        }
    }

    pub const fn presentation(self) -> PresentationClass {
        match self {
            Self::Positive => PresentationClass::Error,
            Self::Negative => PresentationClass::Success,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_label())
    }
}

/// Outcome as recorded on a result. Unrecognised wire values are kept verbatim
/// so they can still be displayed, but they never match an outcome counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOutcome {
    Known(Outcome),
    Other(String),
}

impl RecordedOutcome {
    pub fn known(&self) -> Option<Outcome> {
        match self {
            Self::Known(outcome) => Some(*outcome),
            Self::Other(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Known(outcome) => outcome.wire_label(),
            Self::Other(raw) => raw,
        }
    }

    pub fn presentation(&self) -> PresentationClass {
        self.known()
            .map_or(PresentationClass::Default, Outcome::presentation)
    }
}

impl Default for RecordedOutcome {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<Outcome> for RecordedOutcome {
    fn from(value: Outcome) -> Self {
        Self::Known(value)
    }
}

impl From<String> for RecordedOutcome {
    fn from(value: String) -> Self {
        match Outcome::from_wire(&value) {
            Some(outcome) => Self::Known(outcome),
            None => Self::Other(value),
        }
    }
}

impl Serialize for RecordedOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RecordedOutcome {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
        };
        Ok(Self::from(raw))
    }
}

/// One completed screening activity attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResult {
    #[serde(alias = "user_id")]
    pub user_id: UserId,
    #[serde(default, alias = "child_id", skip_serializing_if = "Option::is_none")]
    pub child_id: Option<ChildId>,
    #[serde(default, alias = "user_name", skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, alias = "activity_name")]
    pub activity_name: String,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "result", default)]
    pub outcome: RecordedOutcome,
    #[serde(default, deserialize_with = "deserialize_percentage")]
    pub probability: f64,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_percentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(
        default,
        alias = "duration_seconds",
        deserialize_with = "deserialize_optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_seconds: Option<f64>,
    #[serde(default, alias = "risk_level", skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ScreeningResult {
    /// Tier derived from the probability. Always used for display and
    /// filtering, regardless of the server label.
    pub fn tier(&self) -> RiskTier {
        RiskTier::classify(self.probability)
    }

    /// Tier the backend attached, if it sent a recognisable label.
    pub fn reported_tier(&self) -> Option<RiskTier> {
        self.risk_level.as_deref().and_then(RiskTier::from_label)
    }

    pub fn known_outcome(&self) -> Option<Outcome> {
        self.outcome.known()
    }
}

/// Server-side totals from `/api/statistics`, used only for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerStatistics {
    #[serde(alias = "totalUsers")]
    pub total_users: u64,
    #[serde(alias = "totalChildren")]
    pub total_children: u64,
    #[serde(alias = "totalTests")]
    pub total_tests: u64,
    #[serde(alias = "positiveTests")]
    pub positive_tests: u64,
    #[serde(alias = "negativeTests")]
    pub negative_tests: u64,
    #[serde(alias = "averageRisk", deserialize_with = "deserialize_percentage")]
    pub average_risk: f64,
}

/// Opaque model metadata from `/api/model/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelInfo(pub Value);

impl Default for ModelInfo {
    fn default() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }
}

impl ModelInfo {
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

fn number_from_value(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn deserialize_percentage<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(clamp_percentage(number_from_value(value).unwrap_or(0.0)))
}

fn deserialize_optional_percentage<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(number_from_value(value).map(clamp_percentage))
}

fn deserialize_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(number_from_value(value).filter(|number| number.is_finite() && *number >= 0.0))
}

/// Whole non-negative ages only; anything else reads as unknown.
fn deserialize_optional_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(number_from_value(value)
        .filter(|age| age.is_finite() && *age >= 0.0 && age.fract() == 0.0)
        .filter(|age| *age <= f64::from(u32::MAX))
        .map(|age| age as u32))
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => Ok(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()),
        _ => Ok(None),
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.naive_utc());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("failed to parse '{raw}' as an ISO-8601 timestamp"))
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => Ok(parse_timestamp(&raw).ok()),
        _ => Ok(None),
    }
}
