use super::classifier::{PresentationClass, RiskTier};
use super::domain::{ChildId, ScreeningResult, User, UserId};
use super::gateway::{Endpoint, ScreeningGateway};
use super::join::{Row, NOT_AVAILABLE};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Display form of one screening result, shared by the results table, the
/// result dialog, and the roster detail dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub activity_name: String,
    pub timestamp: Option<NaiveDateTime>,
    pub outcome: String,
    pub outcome_class: PresentationClass,
    pub probability: f64,
    pub tier: RiskTier,
    pub tier_label: &'static str,
    pub tier_class: PresentationClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub duration_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_risk_level: Option<String>,
    /// Server label mapped onto a tier, when recognisable. Display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_tier: Option<RiskTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&ScreeningResult> for ResultView {
    fn from(result: &ScreeningResult) -> Self {
        let tier = result.tier();
        Self {
            activity_name: result.activity_name.clone(),
            timestamp: result.timestamp,
            outcome: result.outcome.label().to_string(),
            outcome_class: result.outcome.presentation(),
            probability: result.probability,
            tier,
            tier_label: tier.label(),
            tier_class: tier.presentation(),
            confidence: result.confidence,
            duration_label: duration_label(result.duration_seconds),
            reported_risk_level: result.risk_level.clone(),
            reported_tier: result.reported_tier(),
            details: result.details.clone(),
        }
    }
}

/// Whole minutes, or `N/A` when no positive duration was recorded.
pub fn duration_label(seconds: Option<f64>) -> String {
    match seconds {
        Some(seconds) if seconds > 0.0 => format!("{}m", (seconds / 60.0).floor() as u64),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Which row's results to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTarget {
    pub tutor_id: UserId,
    pub child_id: Option<ChildId>,
}

impl From<&Row> for DetailTarget {
    fn from(row: &Row) -> Self {
        Self {
            tutor_id: row.tutor_id.clone(),
            child_id: if row.is_child {
                row.child_id.clone()
            } else {
                None
            },
        }
    }
}

/// Results behind one roster row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDetail {
    pub tutor_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutor: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<ChildId>,
    pub result_count: usize,
    pub results: Vec<ResultView>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user {0} not found")]
pub struct UnknownTutor(pub UserId);

/// Child rows read the full result list and keep the child's results; tutor
/// rows use the per-user endpoint. Result fetch failures yield an empty list.
/// Only a 404 for the tutor is an error; a lookup that fails otherwise or
/// returns no payload leaves `tutor` empty.
pub async fn load_row_detail<G>(
    gateway: &G,
    target: &DetailTarget,
) -> Result<RowDetail, UnknownTutor>
where
    G: ScreeningGateway + ?Sized,
{
    let tutor = match gateway.fetch_user(&target.tutor_id).await {
        Ok(user) => user,
        Err(err) if err.is_not_found() => return Err(UnknownTutor(target.tutor_id.clone())),
        Err(err) => {
            warn!(user_id = %target.tutor_id, error = %err, "tutor lookup failed");
            None
        }
    };

    let results = match &target.child_id {
        Some(child_id) => gateway.fetch_results().await.map(|results| {
            results
                .into_iter()
                .filter(|result| result.child_id.as_ref() == Some(child_id))
                .collect::<Vec<_>>()
        }),
        None => gateway.fetch_results_for_user(&target.tutor_id).await,
    };

    let results = results.unwrap_or_else(|err| {
        let endpoint = match target.child_id {
            Some(_) => Endpoint::Results,
            None => Endpoint::UserResults,
        };
        warn!(%endpoint, user_id = %target.tutor_id, error = %err, "detail results unavailable");
        Vec::new()
    });

    let results: Vec<ResultView> = results.iter().map(ResultView::from).collect();

    Ok(RowDetail {
        tutor_id: target.tutor_id.clone(),
        tutor,
        child_id: target.child_id.clone(),
        result_count: results.len(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_rendered_in_whole_minutes() {
        assert_eq!(duration_label(Some(185.0)), "3m");
        assert_eq!(duration_label(Some(59.0)), "0m");
        assert_eq!(duration_label(Some(0.0)), "N/A");
        assert_eq!(duration_label(None), "N/A");
    }

    #[test]
    fn view_carries_the_server_label_beside_the_derived_tier() {
        let result: ScreeningResult = serde_json::from_value(serde_json::json!({
            "user_id": "1",
            "result": "NO",
            "probability": 45.0,
            "risk_level": "Bajo"
        }))
        .expect("result decodes");

        let view = ResultView::from(&result);
        assert_eq!(view.tier, RiskTier::Medium);
        assert_eq!(view.reported_tier, Some(RiskTier::Low));
        assert_eq!(view.outcome_class, PresentationClass::Success);
    }

    #[test]
    fn fallback_rows_target_the_tutor() {
        let row = Row {
            tutor_id: UserId::from("2"),
            tutor_name: "B".to_string(),
            child_id: None,
            child_name: NOT_AVAILABLE.to_string(),
            child_age: None,
            is_child: false,
        };
        let target = DetailTarget::from(&row);
        assert_eq!(target.tutor_id.as_str(), "2");
        assert_eq!(target.child_id, None);
    }
}
