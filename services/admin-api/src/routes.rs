use crate::infra::AppState;
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use screening_admin::error::AppError;
use screening_admin::screening::detail::{load_row_detail, DetailTarget, RowDetail};
use screening_admin::screening::domain::{ChildId, ModelInfo, ServerStatistics, UserId};
use screening_admin::screening::filter::{
    FilteredResults, OutcomeSelector, ResultFilter, TierSelector,
};
use screening_admin::screening::snapshot::{
    load_dashboard, load_results, load_roster, CommitOutcome, DashboardView, RosterSnapshot,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Raw selector strings, parsed in the handler so a bad value maps to 400
/// with the selector error rather than axum's query rejection.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResultsQuery {
    #[serde(default)]
    pub(crate) outcome: Option<String>,
    #[serde(default)]
    pub(crate) risk: Option<String>,
}

impl ResultsQuery {
    fn filter(&self) -> Result<ResultFilter, AppError> {
        let outcome = match &self.outcome {
            Some(raw) => raw.parse::<OutcomeSelector>()?,
            None => OutcomeSelector::All,
        };
        let tier = match &self.risk {
            Some(raw) => raw.parse::<TierSelector>()?,
            None => TierSelector::All,
        };
        Ok(ResultFilter::new(outcome, tier))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DetailQuery {
    #[serde(default)]
    pub(crate) child_id: Option<String>,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/dashboard", get(dashboard_endpoint))
        .route("/api/v1/roster", get(roster_endpoint))
        .route("/api/v1/roster/:tutor_id/results", get(row_detail_endpoint))
        .route("/api/v1/results", get(results_endpoint))
        .route("/api/v1/statistics", get(statistics_endpoint))
        .route("/api/v1/model", get(model_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Overlapping refreshes may finish out of order; the newest issued load wins.
pub(crate) async fn dashboard_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<DashboardView> {
    let ticket = state.dashboard.begin();
    let snapshot = load_dashboard(state.gateway.as_ref()).await;
    let (current, outcome) = state.dashboard.commit(ticket, snapshot);
    if outcome == CommitOutcome::Stale {
        debug!("newer dashboard load already committed");
    }
    Json(current.view())
}

pub(crate) async fn roster_endpoint(Extension(state): Extension<AppState>) -> Json<RosterSnapshot> {
    Json(load_roster(state.gateway.as_ref()).await)
}

pub(crate) async fn row_detail_endpoint(
    Extension(state): Extension<AppState>,
    Path(tutor_id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<RowDetail>, AppError> {
    let target = DetailTarget {
        tutor_id: UserId::new(tutor_id),
        child_id: query
            .child_id
            .filter(|id| !id.trim().is_empty())
            .map(ChildId::new),
    };
    let detail = load_row_detail(state.gateway.as_ref(), &target).await?;
    Ok(Json(detail))
}

pub(crate) async fn results_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<FilteredResults>, AppError> {
    let filter = query.filter()?;
    let snapshot = load_results(state.gateway.as_ref()).await;
    Ok(Json(snapshot.filtered(filter)))
}

pub(crate) async fn statistics_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<ServerStatistics>, AppError> {
    Ok(Json(state.gateway.fetch_statistics().await?))
}

pub(crate) async fn model_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<ModelInfo>, AppError> {
    Ok(Json(state.gateway.fetch_model_info().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use screening_admin::screening::domain::{
        Child, Outcome, RecordedOutcome, ScreeningResult, User,
    };
    use screening_admin::screening::gateway::{
        Endpoint, GatewayFixture, InMemoryScreeningGateway,
    };
    use serde_json::Value;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn result(owner: &str, child: Option<&str>, outcome: Outcome, probability: f64) -> ScreeningResult {
        ScreeningResult {
            user_id: UserId::from(owner),
            child_id: child.map(ChildId::from),
            user_name: None,
            activity_name: "Secuencias".to_string(),
            timestamp: None,
            outcome: RecordedOutcome::Known(outcome),
            probability,
            confidence: None,
            duration_seconds: Some(90.0),
            risk_level: None,
            details: None,
        }
    }

    fn fixture() -> GatewayFixture {
        GatewayFixture {
            users: vec![
                User {
                    id: UserId::from("1"),
                    name: "Ana".to_string(),
                    age: None,
                    gender: None,
                    created_at: None,
                },
                User {
                    id: UserId::from("2"),
                    name: "Luis".to_string(),
                    age: None,
                    gender: None,
                    created_at: None,
                },
            ],
            children: vec![Child {
                id: ChildId::from("10"),
                name: "Sofia".to_string(),
                age: Some(6),
                user_id: UserId::from("1"),
                gender: None,
                birth_date: None,
            }],
            results: vec![
                result("1", Some("10"), Outcome::Positive, 80.0),
                result("2", None, Outcome::Negative, 90.0),
                result("1", Some("10"), Outcome::Positive, 10.0),
            ],
            ..GatewayFixture::default()
        }
    }

    fn app(gateway: InMemoryScreeningGateway) -> Router {
        let metrics = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::new(Arc::new(gateway), metrics);
        state.readiness.store(true, Ordering::Release);
        router().layer(Extension(state))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn dashboard_reports_statistics_and_charts() {
        let (status, body) =
            get_json(app(InMemoryScreeningGateway::new(fixture())), "/api/v1/dashboard").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statistics"]["totalUsers"], 2);
        assert_eq!(body["statistics"]["totalTests"], 3);
        assert_eq!(body["statistics"]["positiveTests"], 2);
        assert_eq!(body["outcomeChart"][0]["count"], 1);
        assert_eq!(body["tierChart"][2]["label"], "High (>=70%)");
        assert_eq!(body["tierChart"][2]["count"], 2);
    }

    #[tokio::test]
    async fn roster_lists_fallback_rows() {
        let (status, body) =
            get_json(app(InMemoryScreeningGateway::new(fixture())), "/api/v1/roster").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body["rows"].as_array().expect("rows array");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["tutorName"], "Luis");
        assert_eq!(rows[1]["childName"], "N/A");
        assert_eq!(body["summary"]["tutorsWithoutChildren"], 1);
    }

    #[tokio::test]
    async fn results_apply_both_selectors() {
        let (status, body) = get_json(
            app(InMemoryScreeningGateway::new(fixture())),
            "/api/v1/results?outcome=SI&risk=high",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sourceTotal"], 3);
        assert_eq!(body["results"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["filter"]["outcome"], "SÍ");
        assert_eq!(body["filter"]["risk"], "high");
    }

    #[tokio::test]
    async fn unknown_selector_is_rejected() {
        let (status, body) = get_json(
            app(InMemoryScreeningGateway::new(fixture())),
            "/api/v1/results?risk=extreme",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("extreme")));
    }

    #[tokio::test]
    async fn row_detail_filters_by_child() {
        let (status, body) = get_json(
            app(InMemoryScreeningGateway::new(fixture())),
            "/api/v1/roster/1/results?child_id=10",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resultCount"], 2);
        assert_eq!(body["results"][0]["durationLabel"], "1m");
        assert_eq!(body["results"][0]["outcomeClass"], "error");
    }

    #[tokio::test]
    async fn row_detail_for_unknown_tutor_is_not_found() {
        let (status, _) = get_json(
            app(InMemoryScreeningGateway::new(fixture())),
            "/api/v1/roster/99/results",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn passthrough_failure_is_bad_gateway() {
        let gateway = InMemoryScreeningGateway::new(fixture()).failing(Endpoint::Statistics);
        let (status, _) = get_json(app(gateway), "/api/v1/statistics").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let metrics = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::new(Arc::new(InMemoryScreeningGateway::default()), metrics);
        let app = router().layer(Extension(state));

        let (status, body) = get_json(app, "/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");
    }
}
