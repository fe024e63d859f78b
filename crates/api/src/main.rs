use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockchat_core::chat::{ChatOptions, ChatService};
use stockchat_core::config::Settings;
use stockchat_core::domain::chat::ChatMessage;
use stockchat_core::domain::fundamentals::FundamentalDataBundle;
use stockchat_core::domain::news::NewsInsights;
use stockchat_core::domain::report::{ReportFilter, StockResearchReport};
use stockchat_core::error::{ChatError, FetchError, IngestError, PersistenceError, SectionError};
use stockchat_core::ingest::{PollPolicy, ReportIngestor};
use stockchat_core::llm::openai::OpenAiClient;
use stockchat_core::llm::LlmClient;
use stockchat_core::sources::fmp::FmpClient;
use stockchat_core::sources::news::PolygonNewsClient;
use stockchat_core::storage::reports::{
    PgReportRepository, ReportRepository, UnavailableReportRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let reports: Arc<dyn ReportRepository> = match connect_database(&settings).await {
        Some(pool) => Arc::new(PgReportRepository::new(pool, settings.report_fetch_limit)),
        None => Arc::new(UnavailableReportRepository::new("database is not connected")),
    };

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_settings(&settings)?);
    let chat = ChatService::new(
        llm.clone(),
        Arc::new(FmpClient::from_settings(&settings)?),
        Arc::new(PolygonNewsClient::from_settings(&settings)?),
        reports.clone(),
        ChatOptions::from_settings(&settings),
    );
    let ingestor = ReportIngestor::new(llm, reports, PollPolicy::from_env()?);

    let state = AppState {
        chat,
        ingestor: Arc::new(ingestor),
        report_reference_date: settings.report_reference_date,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Report endpoints answer 503 when this returns `None`; chat keeps working.
async fn connect_database(settings: &Settings) -> Option<PgPool> {
    let db_url = match settings.require_database_url() {
        Ok(url) => url,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            return None;
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
            return None;
        }
    };

    match stockchat_core::storage::migrate(&pool).await {
        Ok(()) => Some(pool),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
            None
        }
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/chat", post(chat))
        .route("/chat/query", post(chat_query))
        .route("/fundamentals/:ticker", get(get_fundamentals))
        .route("/news/:ticker", get(get_news))
        .route("/reports", get(list_reports))
        .route("/reports/upload", post(upload_reports))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    chat: ChatService,
    ingestor: Arc<ReportIngestor>,
    report_reference_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(alias = "message")]
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    file_paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct UploadReply {
    saved: usize,
    reports: Vec<StockResearchReport>,
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    date: Option<NaiveDate>,
    sector: Option<String>,
    company_name: Option<String>,
    ticker: Option<String>,
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, StatusCode> {
    let message = state
        .chat
        .chat(&req.messages)
        .await
        .map_err(|e| reject(chat_status(&e), e))?;
    Ok(Json(ChatReply { message }))
}

async fn chat_query(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, StatusCode> {
    let message = state
        .chat
        .answer_user_query(&req.messages)
        .await
        .map_err(|e| reject(chat_status(&e), e))?;
    Ok(Json(ChatReply { message }))
}

async fn get_fundamentals(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<FundamentalDataBundle>, StatusCode> {
    let bundle = state
        .chat
        .fetch_fundamentals(&ticker)
        .await
        .map_err(|e| reject(fetch_status(&e), e))?;
    Ok(Json(bundle))
}

async fn get_news(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<NewsInsights>, StatusCode> {
    let insights = state
        .chat
        .fetch_news_insights(&ticker)
        .await
        .map_err(|e| reject(fetch_status(&e), e))?;
    Ok(Json(insights))
}

async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<StockResearchReport>>, StatusCode> {
    let filter = ReportFilter {
        date: query.date.unwrap_or(state.report_reference_date),
        sector: query.sector,
        company_name: query.company_name,
        ticker: query.ticker,
    };
    let reports = state
        .chat
        .list_reports(&filter)
        .await
        .map_err(|e| reject(persistence_status(&e), e))?;
    Ok(Json(reports))
}

async fn upload_reports(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadReply>, StatusCode> {
    let reports = state
        .ingestor
        .ingest(&req.file_paths)
        .await
        .map_err(|e| reject(ingest_status(&e), e))?;
    Ok(Json(UploadReply {
        saved: reports.len(),
        reports,
    }))
}

fn chat_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::EmptyConversation => StatusCode::BAD_REQUEST,
        ChatError::Classification(_) | ChatError::Completion(_) => StatusCode::BAD_GATEWAY,
        ChatError::Section { source, .. } => match source {
            SectionError::Persistence(e) => persistence_status(e),
            SectionError::Fetch(_) => StatusCode::BAD_GATEWAY,
            SectionError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

fn fetch_status(_err: &FetchError) -> StatusCode {
    StatusCode::BAD_GATEWAY
}

fn persistence_status(err: &PersistenceError) -> StatusCode {
    match err {
        PersistenceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PersistenceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ingest_status(err: &IngestError) -> StatusCode {
    match err {
        IngestError::NoFiles | IngestError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        IngestError::Persistence(e) => persistence_status(e),
        IngestError::Upload { .. }
        | IngestError::FileProcessingFailed { .. }
        | IngestError::FileNotReady { .. }
        | IngestError::Completion(_)
        | IngestError::MalformedResponse { .. }
        | IngestError::ModelReportedError(_)
        | IngestError::InvalidReport { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn reject<E>(status: StatusCode, err: E) -> StatusCode
where
    E: std::error::Error + Send + Sync + 'static,
{
    let err = anyhow::Error::new(err);
    if status.is_server_error() {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(%status, error = %format!("{err:#}"), "request failed");
    } else {
        tracing::warn!(%status, error = %err, "request rejected");
    }
    status
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
