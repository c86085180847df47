use super::domain::{ScreeningResult, User};
use super::filter::{FilteredResults, ResultFilter};
use super::gateway::{Endpoint, GatewayError, ScreeningGateway};
use super::join::{join_rows, ChildIndex, RosterSummary, Row};
use super::stats::{
    aggregate, DashboardStatistics, OutcomeSliceEntry, ResultAggregate, TierBucketEntry,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Failed loads degrade to an empty collection. The views built on top do
/// not distinguish "no data" from "fetch failed".
fn or_empty<T>(endpoint: Endpoint, fetched: Result<Vec<T>, GatewayError>) -> Vec<T> {
    match fetched {
        Ok(items) => {
            debug!(%endpoint, count = items.len(), "fetched collection");
            items
        }
        Err(err) => {
            warn!(%endpoint, error = %err, "fetch failed; continuing with an empty collection");
            Vec::new()
        }
    }
}

/// Dashboard state derived from one load of users and results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub loaded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub aggregate: ResultAggregate,
}

impl DashboardSnapshot {
    pub fn from_collections(users: &[User], results: &[ScreeningResult]) -> Self {
        Self {
            loaded_at: Utc::now(),
            aggregate: aggregate(users.len(), results),
        }
    }

    pub fn statistics(&self) -> &DashboardStatistics {
        &self.aggregate.statistics
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            loaded_at: self.loaded_at,
            statistics: self.aggregate.statistics,
            outcome_chart: self.aggregate.outcome_split.entries().to_vec(),
            tier_chart: self.aggregate.tier_histogram.entries(),
        }
    }
}

/// Chart-ready rendering of a [`DashboardSnapshot`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub loaded_at: DateTime<Utc>,
    pub statistics: DashboardStatistics,
    pub outcome_chart: Vec<OutcomeSliceEntry>,
    pub tier_chart: Vec<TierBucketEntry>,
}

/// Users and results are independent, so both requests are in flight at once.
pub async fn load_dashboard<G>(gateway: &G) -> DashboardSnapshot
where
    G: ScreeningGateway + ?Sized,
{
    let (users, results) = tokio::join!(gateway.fetch_users(), gateway.fetch_results());
    let users = or_empty(Endpoint::Users, users);
    let results = or_empty(Endpoint::Results, results);

    let snapshot = DashboardSnapshot::from_collections(&users, &results);
    info!(
        users = snapshot.statistics().total_users,
        tests = snapshot.statistics().total_tests,
        "dashboard loaded"
    );
    snapshot
}

/// Tutor/child rows for the roster table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSnapshot {
    pub loaded_at: DateTime<Utc>,
    pub summary: RosterSummary,
    pub rows: Vec<Row>,
}

impl RosterSnapshot {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            loaded_at: Utc::now(),
            summary: RosterSummary::from_rows(&rows),
            rows,
        }
    }
}

/// One bulk children fetch, grouped in memory, instead of a round trip per
/// tutor. A failed children fetch leaves every tutor on its fallback row.
pub async fn load_roster<G>(gateway: &G) -> RosterSnapshot
where
    G: ScreeningGateway + ?Sized,
{
    let (users, children) = tokio::join!(gateway.fetch_users(), gateway.fetch_children());
    let users = or_empty(Endpoint::Users, users);

    let index = match children {
        Ok(children) => ChildIndex::from_children(children),
        Err(err) => {
            warn!(error = %err, "children fetch failed; tutors fall back to placeholder rows");
            ChildIndex::unavailable(err.to_string())
        }
    };

    let snapshot = RosterSnapshot::from_rows(join_rows(&users, &index));
    info!(
        tutors = snapshot.summary.tutor_count,
        children = snapshot.summary.child_count,
        "roster loaded"
    );
    snapshot
}

/// Full result collection; filtered views are derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub loaded_at: DateTime<Utc>,
    pub results: Vec<ScreeningResult>,
}

impl ResultsSnapshot {
    pub fn new(results: Vec<ScreeningResult>) -> Self {
        Self {
            loaded_at: Utc::now(),
            results,
        }
    }

    pub fn filtered(&self, filter: ResultFilter) -> FilteredResults {
        FilteredResults::new(&self.results, filter)
    }
}

pub async fn load_results<G>(gateway: &G) -> ResultsSnapshot
where
    G: ScreeningGateway + ?Sized,
{
    let results = or_empty(Endpoint::Results, gateway.fetch_results().await);
    ResultsSnapshot::new(results)
}

/// Position of a load in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

/// Hands out strictly increasing tickets.
#[derive(Debug, Default)]
pub struct LoadSequencer {
    issued: AtomicU64,
}

impl LoadSequencer {
    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

/// Whether a committed snapshot became the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// A newer load had already been committed.
    Stale,
}

/// Holds the latest snapshot of a view. Loads are never cancelled, so a late
/// answer from an older load must not replace the result of a newer one.
#[derive(Debug)]
pub struct SnapshotSlot<T> {
    sequencer: LoadSequencer,
    current: Mutex<Option<(LoadTicket, Arc<T>)>>,
}

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self {
            sequencer: LoadSequencer::default(),
            current: Mutex::new(None),
        }
    }
}

impl<T> SnapshotSlot<T> {
    pub fn begin(&self) -> LoadTicket {
        self.sequencer.begin()
    }

    /// Installs `snapshot` unless a load issued after `ticket` already landed.
    /// Returns the snapshot that is current afterwards.
    pub fn commit(&self, ticket: LoadTicket, snapshot: T) -> (Arc<T>, CommitOutcome) {
        let mut guard = self.current.lock().expect("snapshot slot poisoned");

        match guard.as_ref() {
            Some((held, current)) if *held > ticket => {
                debug!(ticket = ticket.0, held = held.0, "discarding stale snapshot");
                (Arc::clone(current), CommitOutcome::Stale)
            }
            _ => {
                let snapshot = Arc::new(snapshot);
                *guard = Some((ticket, Arc::clone(&snapshot)));
                (snapshot, CommitOutcome::Applied)
            }
        }
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.current
            .lock()
            .expect("snapshot slot poisoned")
            .as_ref()
            .map(|(_, snapshot)| Arc::clone(snapshot))
    }
}
