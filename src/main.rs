use tokio::sync::mpsc;

use ctfindex::config::AppConfig;
use ctfindex::db;
use ctfindex::indexer::{Indexer, IndexerConfig};
use ctfindex::ingestion::feed::run_file_feed;
use ctfindex::ingestion::pipeline::run_pipeline;
use ctfindex::metrics::init_metrics;
use ctfindex::models::{DecodedEvent, QuestionState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let _metrics = init_metrics();

    let config = AppConfig::from_env()?;

    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database connected");
            Some(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set — catalog will not be persisted");
            None
        }
    };

    let Some(events_path) = config.events_path.clone() else {
        anyhow::bail!("EVENTS_PATH must point at a decoded-event JSONL feed");
    };

    let indexer = Indexer::new(IndexerConfig {
        collateral_token: config.collateral_token,
        resolution_timeout_secs: config.resolution_timeout_secs,
    });

    let (event_tx, event_rx) = mpsc::channel::<DecodedEvent>(1000);

    tracing::info!(path = %events_path, "Starting event feed");
    let feed = tokio::spawn(async move {
        if let Err(e) = run_file_feed(&events_path, event_tx).await {
            tracing::error!(error = %e, "event feed failed");
        }
    });

    let indexer = run_pipeline(event_rx, indexer, pool).await;
    feed.await?;

    let catalog = indexer.catalog();
    let count_state = |state: QuestionState| {
        catalog.questions().filter(|q| q.state == state).count()
    };
    tracing::info!(
        questions = catalog.question_count(),
        resolved = count_state(QuestionState::Resolved),
        pending = count_state(QuestionState::Pending),
        unresolvable = count_state(QuestionState::Unresolvable),
        assets = catalog.asset_count(),
        faults = indexer.resolver().faults().len(),
        "indexing complete"
    );

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
