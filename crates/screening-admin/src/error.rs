use crate::config::ConfigError;
use crate::screening::detail::UnknownTutor;
use crate::screening::filter::SelectorError;
use crate::screening::gateway::GatewayError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Gateway(GatewayError),
    Fixture(serde_json::Error),
    NotFound(UnknownTutor),
    InvalidSelector(SelectorError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Gateway(err) => write!(f, "screening api error: {}", err),
            AppError::Fixture(err) => write!(f, "fixture error: {}", err),
            AppError::NotFound(err) => write!(f, "{}", err),
            AppError::InvalidSelector(err) => write!(f, "invalid filter: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Gateway(err) => Some(err),
            AppError::Fixture(err) => Some(err),
            AppError::NotFound(err) => Some(err),
            AppError::InvalidSelector(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidSelector(_) => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Fixture(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<GatewayError> for AppError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Fixture(value)
    }
}

impl From<UnknownTutor> for AppError {
    fn from(value: UnknownTutor) -> Self {
        Self::NotFound(value)
    }
}

impl From<SelectorError> for AppError {
    fn from(value: SelectorError) -> Self {
        Self::InvalidSelector(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::domain::UserId;

    #[test]
    fn maps_lookup_and_filter_errors_to_client_statuses() {
        let missing = AppError::from(UnknownTutor(UserId::from("42"))).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let selector = "often"
            .parse::<crate::screening::filter::TierSelector>()
            .expect_err("selector rejected");
        let invalid = AppError::from(selector).into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }
}
