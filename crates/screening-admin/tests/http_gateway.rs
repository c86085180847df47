use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use screening_admin::config::GatewayConfig;
use screening_admin::screening::detail::{load_row_detail, DetailTarget};
use screening_admin::screening::domain::{Outcome, UserId};
use screening_admin::screening::gateway::{
    Endpoint, GatewayError, HttpScreeningGateway, ScreeningGateway,
};
use screening_admin::screening::snapshot::{load_dashboard, load_roster};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn user(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    match id.as_str() {
        "7" => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "id": 7, "name": "Ana", "age": 34, "created_at": "2024-03-01T10:00:00" }
            })),
        ),
        "5" => (StatusCode::OK, Json(json!({ "success": true }))),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Usuario no encontrado" })),
        ),
    }
}

async fn user_results(Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [{
            "user_id": id,
            "activity_name": "Ritmo",
            "result": "NO",
            "probability": 12.0
        }]
    }))
}

async fn users(State(body): State<Value>) -> Json<Value> {
    Json(body)
}

fn backend(users_body: Value) -> Router {
    Router::new()
        .route("/api/users", get(users).with_state(users_body))
        .route("/api/users/:id", get(user))
        .route("/api/results/user/:id", get(user_results))
        .route(
            "/api/children",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": [{ "id": "c1", "name": "Sofia", "age": 6, "user_id": 7 }]
                }))
            }),
        )
        .route(
            "/api/results",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": [{
                        "user_id": "7",
                        "child_id": "c1",
                        "activity_name": "Memoria",
                        "result": "SÍ",
                        "probability": 82.5,
                        "duration_seconds": 240,
                        "risk_level": "Alto",
                        "timestamp": "2024-03-02T09:15:00"
                    }]
                }))
            }),
        )
        .route(
            "/api/statistics",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "message": "database offline" })),
                )
            }),
        )
        .route("/api/model/info", get(|| async { "not json" }))
}

async fn gateway() -> HttpScreeningGateway {
    gateway_with_users(json!({ "success": true })).await
}

async fn gateway_with_users(users_body: Value) -> HttpScreeningGateway {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let address = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, backend(users_body))
            .await
            .expect("serve backend");
    });

    let config = GatewayConfig::new(format!("http://{address}"), 5).expect("config valid");
    HttpScreeningGateway::new(&config).expect("gateway builds")
}

#[tokio::test]
async fn envelope_without_data_reads_as_empty() {
    let gateway = gateway().await;
    let users = gateway.fetch_users().await.expect("users fetch succeeds");
    assert!(users.is_empty());
}

#[tokio::test]
async fn snake_case_payloads_decode() {
    let gateway = gateway().await;

    let children = gateway.fetch_children().await.expect("children fetch");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].user_id, UserId::from("7"));

    let results = gateway.fetch_results().await.expect("results fetch");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].known_outcome(), Some(Outcome::Positive));
    assert_eq!(results[0].duration_seconds, Some(240.0));
    assert_eq!(results[0].activity_name, "Memoria");
}

#[tokio::test]
async fn unknown_user_is_distinct_from_missing_payload() {
    let gateway = gateway().await;

    let found = gateway
        .fetch_user(&UserId::from("7"))
        .await
        .expect("lookup succeeds");
    assert_eq!(found.map(|user| user.name), Some("Ana".to_string()));

    let empty = gateway
        .fetch_user(&UserId::from("5"))
        .await
        .expect("missing data is not an error");
    assert!(empty.is_none());

    let err = gateway
        .fetch_user(&UserId::from("8"))
        .await
        .expect_err("remote answered 404");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn tutor_without_payload_still_shows_results() {
    let gateway = gateway().await;
    let target = DetailTarget {
        tutor_id: UserId::from("5"),
        child_id: None,
    };

    let detail = load_row_detail(&gateway, &target)
        .await
        .expect("only a 404 rejects the tutor");

    assert!(detail.tutor.is_none());
    assert_eq!(detail.result_count, 1);
    assert_eq!(detail.results[0].activity_name, "Ritmo");
}

#[tokio::test]
async fn detail_for_unknown_tutor_is_rejected() {
    let gateway = gateway().await;
    let target = DetailTarget {
        tutor_id: UserId::from("8"),
        child_id: None,
    };

    assert!(load_row_detail(&gateway, &target).await.is_err());
}

#[tokio::test]
async fn one_malformed_age_keeps_every_user() {
    let gateway = gateway_with_users(json!({
        "success": true,
        "data": [
            { "id": 1, "name": "Ana", "age": 34 },
            { "id": 2, "name": "Luis", "age": 34 },
            { "id": 3, "name": "Marta", "age": "40" },
            { "id": 4, "name": "Pablo", "age": -1 }
        ]
    }))
    .await;

    let users = gateway.fetch_users().await.expect("users decode");
    assert_eq!(users.len(), 4);
    assert_eq!(users[2].age, Some(40));
    assert_eq!(users[3].age, None);

    let dashboard = load_dashboard(&gateway).await;
    assert_eq!(dashboard.statistics().total_users, 4);

    let roster = load_roster(&gateway).await;
    assert_eq!(roster.summary.tutor_count, 4);
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let gateway = gateway().await;

    match gateway.fetch_statistics().await {
        Err(GatewayError::Status {
            endpoint,
            status,
            message,
        }) => {
            assert_eq!(endpoint, Endpoint::Statistics);
            assert_eq!(status, 500);
            assert_eq!(message, "database offline");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_body_is_a_decode_error() {
    let gateway = gateway().await;

    let err = gateway.fetch_model_info().await.expect_err("decode fails");
    assert!(matches!(
        err,
        GatewayError::Decode {
            endpoint: Endpoint::ModelInfo,
            ..
        }
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    drop(listener);

    let config = GatewayConfig::new(format!("http://{address}"), 2).expect("config valid");
    let gateway = HttpScreeningGateway::new(&config).expect("gateway builds");

    let err = gateway.fetch_users().await.expect_err("connection refused");
    assert!(matches!(
        err,
        GatewayError::Transport {
            endpoint: Endpoint::Users,
            ..
        }
    ));
}
