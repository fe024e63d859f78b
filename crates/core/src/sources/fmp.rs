use crate::config::Settings;
use crate::domain::fundamentals::{
    BalanceSheet, CashFlowStatement, FinancialRatios, IncomeStatement, Period,
};
use crate::error::FetchError;
use crate::sources::FinancialDataClient;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::time::Duration;

const PROVIDER: &str = "fmp";
const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct FmpConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl FmpConfig {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_fmp_api_key()?.to_string();
        let base_url =
            std::env::var("FMP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("FMP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            base_url,
            timeout_secs,
        })
    }
}

/// Financial Modeling Prep statements API.
#[derive(Debug, Clone)]
pub struct FmpClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FmpClient {
    pub fn new(config: FmpConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build fmp http client")?;

        Ok(Self {
            http,
            api_key: config.api_key,
            base_url: config.base_url,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(FmpConfig::from_settings(settings)?)
    }

    fn url(&self, endpoint: &str, ticker: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint,
            ticker.trim().to_ascii_uppercase()
        )
    }

    async fn fetch_statement<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<T>, FetchError> {
        let res = self
            .http
            .get(self.url(endpoint, ticker))
            .query(&[("period", period.as_str()), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                provider: PROVIDER,
                detail: format!("{endpoint}: {}", e.without_url()),
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| FetchError::Transport {
            provider: PROVIDER,
            detail: format!("{endpoint}: failed to read response: {}", e.without_url()),
        })?;
        if !status.is_success() {
            return Err(FetchError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body: text,
            });
        }

        decode_statements(endpoint, &text)
    }
}

fn decode_statements<T: DeserializeOwned>(
    endpoint: &'static str,
    text: &str,
) -> Result<Vec<T>, FetchError> {
    serde_json::from_str::<Vec<T>>(text).map_err(|e| FetchError::Decode {
        provider: PROVIDER,
        detail: format!("{endpoint}: {e}"),
    })
}

#[async_trait::async_trait]
impl FinancialDataClient for FmpClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_income_statement(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<IncomeStatement>, FetchError> {
        self.fetch_statement("income-statement", ticker, period).await
    }

    async fn fetch_balance_sheet(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<BalanceSheet>, FetchError> {
        self.fetch_statement("balance-sheet-statement", ticker, period)
            .await
    }

    async fn fetch_cash_flow(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<CashFlowStatement>, FetchError> {
        self.fetch_statement("cash-flow-statement", ticker, period)
            .await
    }

    async fn fetch_financial_ratios(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<FinancialRatios>, FetchError> {
        let mut ratios: Vec<FinancialRatios> =
            self.fetch_statement("ratios", ticker, period).await?;
        for r in &mut ratios {
            r.round_values();
        }
        Ok(ratios)
    }
}
