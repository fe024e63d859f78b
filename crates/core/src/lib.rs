pub mod chat;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod sources;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub mod config {
    use anyhow::Context;
    use chrono::NaiveDate;

    const DEFAULT_REPORT_REFERENCE_DATE: &str = "2024-08-28";
    const DEFAULT_REPORT_FETCH_LIMIT: i64 = 20;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub openai_api_key: Option<String>,
        pub fmp_api_key: Option<String>,
        pub news_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub report_reference_date: NaiveDate,
        pub report_fetch_limit: i64,
        pub trade_fundamentals_enabled: bool,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let report_reference_date = std::env::var("REPORT_REFERENCE_DATE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REPORT_REFERENCE_DATE.to_string());
            let report_reference_date =
                NaiveDate::parse_from_str(report_reference_date.trim(), "%Y-%m-%d")
                    .with_context(|| {
                        format!("REPORT_REFERENCE_DATE must be YYYY-MM-DD (got {report_reference_date})")
                    })?;

            let report_fetch_limit = std::env::var("REPORT_FETCH_LIMIT")
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(DEFAULT_REPORT_FETCH_LIMIT);
            anyhow::ensure!(report_fetch_limit >= 1, "REPORT_FETCH_LIMIT must be >= 1");

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                fmp_api_key: std::env::var("FMP_API_KEY").ok(),
                news_api_key: std::env::var("NEWS_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                report_reference_date,
                report_fetch_limit,
                trade_fundamentals_enabled: parse_flag(
                    std::env::var("TRADE_FUNDAMENTALS_ENABLED").ok().as_deref(),
                ),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_fmp_api_key(&self) -> anyhow::Result<&str> {
            self.fmp_api_key.as_deref().context("FMP_API_KEY is required")
        }

        pub fn require_news_api_key(&self) -> anyhow::Result<&str> {
            self.news_api_key
                .as_deref()
                .context("NEWS_API_KEY is required")
        }
    }

    fn parse_flag(value: Option<&str>) -> bool {
        matches!(
            value.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
            Some("1" | "true" | "yes" | "on")
        )
    }

}
