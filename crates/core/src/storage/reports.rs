use crate::domain::report::{ReportFilter, StockResearchReport};
use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ReportRepository: Send + Sync {
    async fn save(&self, report: &StockResearchReport) -> Result<(), PersistenceError>;

    /// Saves reports in order and stops at the first failure; reports saved before it stay
    /// saved. Transactional stores override this to save every report or none of them.
    async fn save_batch(&self, reports: &[StockResearchReport]) -> Result<u64, PersistenceError> {
        let mut saved = 0;
        for report in reports {
            self.save(report).await?;
            saved += 1;
        }
        Ok(saved)
    }

    async fn fetch(&self, filter: &ReportFilter) -> Result<Vec<StockResearchReport>, PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct PgReportRepository {
    pool: sqlx::PgPool,
    fetch_limit: i64,
}

impl PgReportRepository {
    pub fn new(pool: sqlx::PgPool, fetch_limit: i64) -> Self {
        Self { pool, fetch_limit }
    }
}

type ReportRow = (
    String,
    String,
    String,
    Option<f64>,
    String,
    Vec<f64>,
    Option<f64>,
    Option<f64>,
);

const INSERT_REPORT: &str = "INSERT INTO stock_research_reports \
     (id, company, sector, recommendation, target_price, news_summary, revenue_projections, cagr, ebitda, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";

async fn insert_report<'e, E>(executor: E, report: &StockResearchReport) -> Result<(), PersistenceError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let created_at: DateTime<Utc> = Utc::now();
    sqlx::query(INSERT_REPORT)
        .persistent(false)
        .bind(Uuid::new_v4())
        .bind(report.company.trim())
        .bind(report.sector.trim())
        .bind(report.recommendation.trim())
        .bind(report.target_price)
        .bind(&report.news_summary)
        .bind(&report.revenue_projections)
        .bind(report.cagr)
        .bind(report.ebitda)
        .bind(created_at)
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl ReportRepository for PgReportRepository {
    async fn save(&self, report: &StockResearchReport) -> Result<(), PersistenceError> {
        insert_report(&self.pool, report).await
    }

    async fn save_batch(&self, reports: &[StockResearchReport]) -> Result<u64, PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let mut saved: u64 = 0;
        for report in reports {
            insert_report(&mut *tx, report).await?;
            saved += 1;
        }
        tx.commit().await?;
        Ok(saved)
    }

    async fn fetch(&self, filter: &ReportFilter) -> Result<Vec<StockResearchReport>, PersistenceError> {
        let rows = sqlx::query_as::<_, ReportRow>(
            "SELECT company, sector, recommendation, target_price, news_summary, revenue_projections, cagr, ebitda \
             FROM stock_research_reports \
             WHERE created_at >= $1::date \
               AND (($2::text IS NULL AND $3::text IS NULL AND $4::text IS NULL) \
                    OR sector ILIKE '%' || $2 || '%' ESCAPE '\\' \
                    OR company ILIKE '%' || $3 || '%' ESCAPE '\\' \
                    OR company ILIKE '%' || $4 || '%' ESCAPE '\\') \
             ORDER BY created_at DESC \
             LIMIT $5",
        )
        .persistent(false)
        .bind(filter.date)
        .bind(filter.sector().map(escape_like))
        .bind(filter.company_name().map(escape_like))
        .bind(filter.ticker().map(escape_like))
        .bind(self.fetch_limit)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            date = %filter.date,
            sector = ?filter.sector(),
            company_name = ?filter.company_name(),
            ticker = ?filter.ticker(),
            rows = rows.len(),
            "fetched stock research reports"
        );

        Ok(rows
            .into_iter()
            .map(
                |(company, sector, recommendation, target_price, news_summary, revenue_projections, cagr, ebitda)| {
                    StockResearchReport {
                        company,
                        sector,
                        recommendation,
                        target_price,
                        news_summary,
                        revenue_projections,
                        cagr,
                        ebitda,
                    }
                },
            )
            .collect())
    }
}

/// Escapes `LIKE` wildcards so user criteria match literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Stand-in used when no database is configured; every call fails with `Unavailable`.
#[derive(Debug, Clone)]
pub struct UnavailableReportRepository {
    reason: String,
}

impl UnavailableReportRepository {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl ReportRepository for UnavailableReportRepository {
    async fn save(&self, _report: &StockResearchReport) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable(self.reason.clone()))
    }

    async fn save_batch(&self, _reports: &[StockResearchReport]) -> Result<u64, PersistenceError> {
        Err(PersistenceError::Unavailable(self.reason.clone()))
    }

    async fn fetch(&self, _filter: &ReportFilter) -> Result<Vec<StockResearchReport>, PersistenceError> {
        Err(PersistenceError::Unavailable(self.reason.clone()))
    }
}
