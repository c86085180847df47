pub mod classifier;
pub mod detail;
pub mod domain;
pub mod filter;
pub mod gateway;
pub mod join;
pub mod snapshot;
pub mod stats;

pub use classifier::{PresentationClass, RiskTier};
pub use detail::{load_row_detail, DetailTarget, ResultView, RowDetail};
pub use domain::{
    Child, ChildId, ModelInfo, Outcome, ScreeningResult, ServerStatistics, User, UserId,
};
pub use filter::{FilteredResults, OutcomeSelector, ResultFilter, TierSelector};
pub use gateway::{
    GatewayError, GatewayFixture, HttpScreeningGateway, InMemoryScreeningGateway,
    ScreeningGateway,
};
pub use join::{join_rows, ChildIndex, ChildResolver, RosterSummary, Row};
pub use snapshot::{
    load_dashboard, load_results, load_roster, DashboardSnapshot, ResultsSnapshot,
    RosterSnapshot, SnapshotSlot,
};
pub use stats::{aggregate, ResultAggregate, TierHistogram};
