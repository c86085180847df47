use crate::infra::GatewaySource;
use crate::report;
use crate::server;
use clap::{Args, Parser, Subcommand};
use screening_admin::config::AppConfig;
use screening_admin::error::AppError;
use screening_admin::screening::detail::{load_row_detail, DetailTarget};
use screening_admin::screening::domain::{ChildId, UserId};
use screening_admin::screening::filter::{OutcomeSelector, ResultFilter, TierSelector};
use screening_admin::screening::snapshot::{load_dashboard, load_results, load_roster};
use screening_admin::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "screening-admin",
    about = "Admin reporting over the screening results API",
    version
)]
struct Cli {
    /// Override SCREENING_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Serve users, children, and results from a JSON fixture instead of the API
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the view-model HTTP service (default command)
    Serve(ServeArgs),
    /// Print headline statistics and chart series
    Dashboard,
    /// Print the tutor/child roster
    Roster,
    /// Print screening results, optionally filtered
    Results(ResultsArgs),
    /// Print the results behind one roster row
    Detail(DetailArgs),
    /// Print server-side statistics and model metadata
    ModelInfo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
struct ResultsArgs {
    /// all, SÍ (or SI), NO
    #[arg(long, default_value = "all")]
    outcome: OutcomeSelector,
    /// all, low, medium, high
    #[arg(long, default_value = "all")]
    risk: TierSelector,
}

#[derive(Args, Debug)]
struct DetailArgs {
    #[arg(long)]
    tutor: String,
    /// Show only this child's results
    #[arg(long)]
    child: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(api_url) = cli.api_url {
        config.gateway = config.gateway.with_base_url(api_url)?;
    }

    telemetry::init(&config.telemetry)?;

    let source = match cli.fixture {
        Some(path) => GatewaySource::Fixture(path),
        None => GatewaySource::Remote(config.gateway.clone()),
    };
    let gateway = source.connect()?;

    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(config, args, gateway).await,
        Command::Dashboard => {
            let snapshot = load_dashboard(gateway.as_ref()).await;
            report::render_dashboard(&snapshot.view());
            Ok(())
        }
        Command::Roster => {
            let roster = load_roster(gateway.as_ref()).await;
            report::render_roster(&roster);
            Ok(())
        }
        Command::Results(args) => {
            let snapshot = load_results(gateway.as_ref()).await;
            let filtered = snapshot.filtered(ResultFilter::new(args.outcome, args.risk));
            report::render_results(&filtered);
            Ok(())
        }
        Command::Detail(args) => {
            let target = DetailTarget {
                tutor_id: UserId::new(args.tutor),
                child_id: args.child.map(ChildId::new),
            };
            let detail = load_row_detail(gateway.as_ref(), &target).await?;
            report::render_detail(&detail);
            Ok(())
        }
        Command::ModelInfo => {
            let statistics = gateway.fetch_statistics().await?;
            let model = gateway.fetch_model_info().await?;
            report::render_model_info(&statistics, &model);
            Ok(())
        }
    }
}
