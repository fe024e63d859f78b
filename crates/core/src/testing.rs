//! In-memory collaborators for unit tests.

use crate::domain::chat::ChatMessage;
use crate::domain::fundamentals::{
    BalanceSheet, CashFlowStatement, FinancialRatios, IncomeStatement, Period,
};
use crate::domain::news::{NewsInsight, NewsInsights};
use crate::domain::report::{ReportFilter, StockResearchReport};
use crate::error::{FetchError, PersistenceError};
use crate::llm::error::CompletionError;
use crate::llm::{ChatCompletion, FileStatus, LlmClient, UploadedFile};
use crate::sources::{FinancialDataClient, NewsClient};
use crate::storage::reports::ReportRepository;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

/// Scripted language model. Replies are consumed in order by `complete` and
/// `complete_with_files`; file statuses are consumed per id, the last one repeating.
#[derive(Default)]
pub struct FakeLlm {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    file_requests: Mutex<Vec<(String, Vec<String>)>>,
    uploads: Mutex<Vec<(String, String)>>,
    statuses: Mutex<HashMap<String, VecDeque<FileStatus>>>,
    status_checks: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn reply_err(self, stage: &'static str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(CompletionError::new("fake", stage, "scripted failure")));
        self
    }

    pub fn file_statuses(self, file_id: &str, statuses: Vec<FileStatus>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(file_id.to_string(), statuses.into());
        self
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn file_requests(&self) -> Vec<(String, Vec<String>)> {
        self.file_requests.lock().unwrap().clone()
    }

    /// `(name, purpose)` per upload.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn status_checks(&self) -> Vec<String> {
        self.status_checks.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Result<ChatCompletion, CompletionError> {
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::new("fake", "script", "no scripted reply left")));
        next.map(|text| ChatCompletion::from_message(ChatMessage::assistant(text)))
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn complete(&self, conversation: &[ChatMessage]) -> Result<ChatCompletion, CompletionError> {
        self.requests.lock().unwrap().push(conversation.to_vec());
        self.next_reply()
    }

    async fn complete_with_files(
        &self,
        prompt: &str,
        file_ids: &[String],
    ) -> Result<ChatCompletion, CompletionError> {
        self.file_requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), file_ids.to_vec()));
        self.next_reply()
    }

    async fn upload_file(
        &self,
        name: &str,
        _path: &Path,
        purpose: &str,
    ) -> Result<UploadedFile, CompletionError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((name.to_string(), purpose.to_string()));
        Ok(UploadedFile {
            id: format!("file-{}", uploads.len()),
            filename: Some(name.to_string()),
            status: FileStatus::Uploaded,
        })
    }

    async fn file_status(&self, file_id: &str) -> Result<UploadedFile, CompletionError> {
        self.status_checks.lock().unwrap().push(file_id.to_string());
        let mut statuses = self.statuses.lock().unwrap();
        let status = match statuses.get_mut(file_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(FileStatus::Processed),
            Some(queue) => queue.front().copied().unwrap_or(FileStatus::Processed),
            None => FileStatus::Processed,
        };
        Ok(UploadedFile {
            id: file_id.to_string(),
            filename: None,
            status,
        })
    }
}

/// One statement of each kind for a single ticker.
pub struct FakeFinancials {
    ticker: String,
    failing_on: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl FakeFinancials {
    pub fn with_sample_data(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            failing_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `kind` is one of `income_statement`, `balance_sheet`, `cash_flow`, `financial_ratios`.
    pub fn failing_on(mut self, kind: &'static str) -> Self {
        self.failing_on = Some(kind);
        self
    }

    /// `kind:TICKER:period` per call, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &'static str, ticker: &str, period: Period) -> Result<(), FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{kind}:{ticker}:{}", period.as_str()));
        if self.failing_on == Some(kind) {
            return Err(FetchError::Transport {
                provider: "fake_financials",
                detail: format!("{kind} unavailable"),
            });
        }
        Ok(())
    }

    fn symbol(&self) -> Option<String> {
        Some(self.ticker.clone())
    }
}

#[async_trait::async_trait]
impl FinancialDataClient for FakeFinancials {
    fn provider_name(&self) -> &'static str {
        "fake_financials"
    }

    async fn fetch_income_statement(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<IncomeStatement>, FetchError> {
        self.record("income_statement", ticker, period)?;
        Ok(vec![IncomeStatement {
            date: Some("2023-09-30".to_string()),
            symbol: self.symbol(),
            revenue: Some(383_285_000_000.0),
            net_income: Some(96_995_000_000.0),
            ..IncomeStatement::default()
        }])
    }

    async fn fetch_balance_sheet(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<BalanceSheet>, FetchError> {
        self.record("balance_sheet", ticker, period)?;
        let mut extra = serde_json::Map::new();
        extra.insert("longTermDebt".to_string(), serde_json::json!(95_281_000_000.0));
        Ok(vec![BalanceSheet {
            date: Some("2023-09-30".to_string()),
            symbol: self.symbol(),
            total_assets: Some(352_583_000_000.0),
            extra,
            ..BalanceSheet::default()
        }])
    }

    async fn fetch_cash_flow(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<CashFlowStatement>, FetchError> {
        self.record("cash_flow", ticker, period)?;
        Ok(vec![CashFlowStatement {
            date: Some("2023-09-30".to_string()),
            symbol: self.symbol(),
            ..CashFlowStatement::default()
        }])
    }

    async fn fetch_financial_ratios(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<FinancialRatios>, FetchError> {
        self.record("financial_ratios", ticker, period)?;
        Ok(vec![FinancialRatios {
            date: Some("2023-09-30".to_string()),
            symbol: self.symbol(),
            current_ratio: Some(0.988),
            ..FinancialRatios::default()
        }])
    }
}

pub struct FakeNews {
    ticker: String,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeNews {
    pub fn with_sample_data(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            failing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NewsClient for FakeNews {
    fn provider_name(&self) -> &'static str {
        "fake_news"
    }

    async fn fetch_insights(&self, ticker: &str) -> Result<NewsInsights, FetchError> {
        self.calls.lock().unwrap().push(ticker.to_string());
        if self.failing {
            return Err(FetchError::Status {
                provider: "fake_news",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(NewsInsights {
            ticker: self.ticker.clone(),
            articles: vec![NewsInsight {
                title: format!("{} beats estimates", self.ticker),
                publisher: Some("Newswire".to_string()),
                published_utc: Some("2024-08-27T13:00:00Z".to_string()),
                description: None,
                article_url: None,
                sentiment: Some("positive".to_string()),
                sentiment_reasoning: Some("earnings beat".to_string()),
            }],
        })
    }
}

/// Report store backed by a vector; `fetch` applies `ReportFilter::matches`.
#[derive(Default)]
pub struct InMemoryReports {
    reports: Mutex<Vec<StockResearchReport>>,
    fetches: Mutex<Vec<ReportFilter>>,
    failing: bool,
}

impl InMemoryReports {
    pub fn with_reports(reports: Vec<StockResearchReport>) -> Self {
        Self {
            reports: Mutex::new(reports),
            ..Self::default()
        }
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn stored(&self) -> Vec<StockResearchReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<ReportFilter> {
        self.fetches.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing {
            return Err(PersistenceError::Unavailable("test repository".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportRepository for InMemoryReports {
    async fn save(&self, report: &StockResearchReport) -> Result<(), PersistenceError> {
        self.check()?;
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn fetch(&self, filter: &ReportFilter) -> Result<Vec<StockResearchReport>, PersistenceError> {
        self.fetches.lock().unwrap().push(filter.clone());
        self.check()?;
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
