use metrics_exporter_prometheus::PrometheusHandle;
use screening_admin::config::GatewayConfig;
use screening_admin::error::AppError;
use screening_admin::screening::gateway::{
    HttpScreeningGateway, InMemoryScreeningGateway, ScreeningGateway,
};
use screening_admin::screening::snapshot::{DashboardSnapshot, SnapshotSlot};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) gateway: Arc<dyn ScreeningGateway>,
    pub(crate) dashboard: Arc<SnapshotSlot<DashboardSnapshot>>,
}

impl AppState {
    pub(crate) fn new(gateway: Arc<dyn ScreeningGateway>, metrics: PrometheusHandle) -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(metrics),
            gateway,
            dashboard: Arc::new(SnapshotSlot::default()),
        }
    }
}

/// Where the screening data comes from.
#[derive(Debug, Clone)]
pub(crate) enum GatewaySource {
    Remote(GatewayConfig),
    Fixture(PathBuf),
}

impl GatewaySource {
    pub(crate) fn connect(self) -> Result<Arc<dyn ScreeningGateway>, AppError> {
        match self {
            GatewaySource::Remote(config) => {
                info!(base_url = config.base_url(), "using remote screening api");
                Ok(Arc::new(HttpScreeningGateway::new(&config)?))
            }
            GatewaySource::Fixture(path) => {
                let raw = std::fs::read_to_string(&path)?;
                let gateway = InMemoryScreeningGateway::from_json(&raw)?;
                info!(
                    fixture = %path.display(),
                    users = gateway.fixture().users.len(),
                    results = gateway.fixture().results.len(),
                    "using fixture data"
                );
                Ok(Arc::new(gateway))
            }
        }
    }
}
