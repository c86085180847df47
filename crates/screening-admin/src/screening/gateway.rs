use super::domain::{Child, ModelInfo, ScreeningResult, ServerStatistics, User, UserId};
use super::join::{ChildResolutionError, ChildResolver};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use tracing::debug;

/// Read endpoints of the remote screening API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Users,
    User,
    Children,
    Results,
    UserResults,
    Statistics,
    ModelInfo,
}

impl Endpoint {
    /// Route template, used in logs and errors.
    pub const fn template(self) -> &'static str {
        match self {
            Self::Users => "/api/users",
            Self::User => "/api/users/{id}",
            Self::Children => "/api/children",
            Self::Results => "/api/results",
            Self::UserResults => "/api/results/user/{userId}",
            Self::Statistics => "/api/statistics",
            Self::ModelInfo => "/api/model/info",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template())
    }
}

/// Response wrapper used by every endpoint. A missing or null `data` field is
/// an empty payload, never an error.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T: Default> ApiEnvelope<T> {
    pub fn into_data(self) -> T {
        self.data.unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: Endpoint, message: String },
    #[error("{endpoint} answered {status}: {message}")]
    Status {
        endpoint: Endpoint,
        status: u16,
        message: String,
    },
    #[error("{endpoint} returned an unreadable payload: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
    #[error("{endpoint} unavailable: {reason}")]
    Unavailable { endpoint: Endpoint, reason: String },
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Read-only access to users, children, results, and diagnostics.
#[async_trait]
pub trait ScreeningGateway: Send + Sync {
    async fn fetch_users(&self) -> Result<Vec<User>, GatewayError>;
    /// `None` when the response carried no payload. A user the remote does not
    /// know is a [`GatewayError::Status`] with status 404.
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, GatewayError>;
    async fn fetch_children(&self) -> Result<Vec<Child>, GatewayError>;
    async fn fetch_results(&self) -> Result<Vec<ScreeningResult>, GatewayError>;
    async fn fetch_results_for_user(
        &self,
        id: &UserId,
    ) -> Result<Vec<ScreeningResult>, GatewayError>;
    async fn fetch_statistics(&self) -> Result<ServerStatistics, GatewayError>;
    async fn fetch_model_info(&self) -> Result<ModelInfo, GatewayError>;
}

/// Gateway speaking JSON over HTTP. No retries: a failed request is
/// reported once and left to the caller.
#[derive(Debug, Clone)]
pub struct HttpScreeningGateway {
    client: Client,
    base_url: Url,
}

impl HttpScreeningGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(config.base_url())
            .map_err(|err| GatewayError::InvalidUrl(format!("{}: {err}", config.base_url())))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(config.base_url().to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GatewayError::InvalidUrl(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T>(
        &self,
        endpoint: Endpoint,
        segments: &[&str],
    ) -> Result<ApiEnvelope<T>, GatewayError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(segments);
        debug!(%endpoint, %url, "requesting screening api");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| GatewayError::Transport {
                endpoint,
                message: err.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| GatewayError::Transport {
            endpoint,
            message: err.to_string(),
        })?;

        if status.is_success() {
            return serde_json::from_str::<ApiEnvelope<T>>(&text)
                .map_err(|source| GatewayError::Decode { endpoint, source });
        }

        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&text)
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or(text);

        Err(GatewayError::Status {
            endpoint,
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ScreeningGateway for HttpScreeningGateway {
    async fn fetch_users(&self) -> Result<Vec<User>, GatewayError> {
        Ok(self
            .get::<Vec<User>>(Endpoint::Users, &["api", "users"])
            .await?
            .into_data())
    }

    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, GatewayError> {
        Ok(self
            .get::<User>(Endpoint::User, &["api", "users", id.as_str()])
            .await?
            .data)
    }

    async fn fetch_children(&self) -> Result<Vec<Child>, GatewayError> {
        Ok(self
            .get::<Vec<Child>>(Endpoint::Children, &["api", "children"])
            .await?
            .into_data())
    }

    async fn fetch_results(&self) -> Result<Vec<ScreeningResult>, GatewayError> {
        Ok(self
            .get::<Vec<ScreeningResult>>(Endpoint::Results, &["api", "results"])
            .await?
            .into_data())
    }

    async fn fetch_results_for_user(
        &self,
        id: &UserId,
    ) -> Result<Vec<ScreeningResult>, GatewayError> {
        Ok(self
            .get::<Vec<ScreeningResult>>(
                Endpoint::UserResults,
                &["api", "results", "user", id.as_str()],
            )
            .await?
            .into_data())
    }

    async fn fetch_statistics(&self) -> Result<ServerStatistics, GatewayError> {
        Ok(self
            .get::<ServerStatistics>(Endpoint::Statistics, &["api", "statistics"])
            .await?
            .into_data())
    }

    async fn fetch_model_info(&self) -> Result<ModelInfo, GatewayError> {
        Ok(self
            .get::<ModelInfo>(Endpoint::ModelInfo, &["api", "model", "info"])
            .await?
            .into_data())
    }
}

/// Collections served by [`InMemoryScreeningGateway`]. Also the shape of
/// the JSON fixture files accepted by the console.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayFixture {
    pub users: Vec<User>,
    pub children: Vec<Child>,
    pub results: Vec<ScreeningResult>,
    pub statistics: ServerStatistics,
    #[serde(alias = "modelInfo")]
    pub model_info: ModelInfo,
}

/// Gateway backed by fixed collections, with per-endpoint failure injection
/// and a call log so callers can assert how often each endpoint was hit.
#[derive(Debug, Default)]
pub struct InMemoryScreeningGateway {
    fixture: GatewayFixture,
    failing: HashSet<Endpoint>,
    failing_children_of: HashSet<UserId>,
    calls: Mutex<Vec<Endpoint>>,
}

impl InMemoryScreeningGateway {
    pub fn new(fixture: GatewayFixture) -> Self {
        Self {
            fixture,
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self::new)
    }

    /// Every call to `endpoint` fails with [`GatewayError::Unavailable`].
    pub fn failing(mut self, endpoint: Endpoint) -> Self {
        self.failing.insert(endpoint);
        self
    }

    /// Per-user child lookups for `user` fail; see the [`ChildResolver`] impl.
    pub fn failing_children_of(mut self, user: impl Into<UserId>) -> Self {
        self.failing_children_of.insert(user.into());
        self
    }

    pub fn fixture(&self) -> &GatewayFixture {
        &self.fixture
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .expect("gateway call log poisoned")
            .iter()
            .filter(|call| **call == endpoint)
            .count()
    }

    fn record(&self, endpoint: Endpoint) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .expect("gateway call log poisoned")
            .push(endpoint);

        if self.failing.contains(&endpoint) {
            return Err(GatewayError::Unavailable {
                endpoint,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-user child lookup over the fixture, one call per tutor.
impl ChildResolver for InMemoryScreeningGateway {
    fn children_of(&self, user: &UserId) -> Result<Vec<Child>, ChildResolutionError> {
        if self.failing_children_of.contains(user) {
            return Err(ChildResolutionError {
                user: user.clone(),
                reason: "injected failure".to_string(),
            });
        }

        Ok(self
            .fixture
            .children
            .iter()
            .filter(|child| &child.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScreeningGateway for InMemoryScreeningGateway {
    async fn fetch_users(&self) -> Result<Vec<User>, GatewayError> {
        self.record(Endpoint::Users)?;
        Ok(self.fixture.users.clone())
    }

    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, GatewayError> {
        self.record(Endpoint::User)?;
        match self.fixture.users.iter().find(|user| &user.id == id) {
            Some(user) => Ok(Some(user.clone())),
            None => Err(GatewayError::Status {
                endpoint: Endpoint::User,
                status: 404,
                message: format!("user {id} not found"),
            }),
        }
    }

    async fn fetch_children(&self) -> Result<Vec<Child>, GatewayError> {
        self.record(Endpoint::Children)?;
        Ok(self.fixture.children.clone())
    }

    async fn fetch_results(&self) -> Result<Vec<ScreeningResult>, GatewayError> {
        self.record(Endpoint::Results)?;
        Ok(self.fixture.results.clone())
    }

    async fn fetch_results_for_user(
        &self,
        id: &UserId,
    ) -> Result<Vec<ScreeningResult>, GatewayError> {
        self.record(Endpoint::UserResults)?;
        Ok(self
            .fixture
            .results
            .iter()
            .filter(|result| &result.user_id == id)
            .cloned()
            .collect())
    }

    async fn fetch_statistics(&self) -> Result<ServerStatistics, GatewayError> {
        self.record(Endpoint::Statistics)?;
        Ok(self.fixture.statistics.clone())
    }

    async fn fetch_model_info(&self) -> Result<ModelInfo, GatewayError> {
        self.record(Endpoint::ModelInfo)?;
        Ok(self.fixture.model_info.clone())
    }
}
