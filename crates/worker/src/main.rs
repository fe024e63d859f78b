use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stockchat_core::ingest::{reports::file_infos, PollPolicy, ReportIngestor};
use stockchat_core::llm::openai::OpenAiClient;
use stockchat_core::storage::reports::PgReportRepository;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "stockchat_worker")]
struct Args {
    /// Research report documents to upload and extract.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Validate the file list without uploading or writing to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockchat_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if args.dry_run {
        let files = file_infos(&args.files)?;
        for file in &files {
            anyhow::ensure!(file.path.is_file(), "not a readable file: {}", file.path.display());
        }
        tracing::info!(dry_run = true, files = files.len(), "report ingestion (dry-run)");
        return Ok(());
    }

    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    stockchat_core::storage::migrate(&pool).await?;

    let llm = OpenAiClient::from_settings(&settings)?;
    let reports = PgReportRepository::new(pool, settings.report_fetch_limit);
    let ingestor = ReportIngestor::new(Arc::new(llm), Arc::new(reports), PollPolicy::from_env()?);

    match ingestor.ingest(&args.files).await {
        Ok(saved) => {
            for report in &saved {
                tracing::info!(
                    company = %report.company,
                    sector = %report.sector,
                    recommendation = %report.recommendation,
                    "stored research report"
                );
            }
            tracing::info!(files = args.files.len(), saved = saved.len(), "report ingestion finished");
            Ok(())
        }
        Err(err) => {
            let err = anyhow::Error::new(err).context("report ingestion failed");
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(files = args.files.len(), error = %format!("{err:#}"), "report ingestion failed");
            Err(err)
        }
    }
}

fn init_sentry(settings: &stockchat_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
