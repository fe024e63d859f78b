use crate::domain::fundamentals::{FundamentalKind, Period};
use crate::domain::query::{InfoType, ParsedUserQuery};
use crate::domain::report::ReportFilter;
use crate::error::{ChatError, SectionError};
use crate::sources::{FinancialDataClient, NewsClient};
use crate::storage::reports::ReportRepository;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const OUT_OF_DOMAIN_MESSAGE: &str =
    "This chatbot is built for investment and finance related queries only.";

const ANALYST_GUIDELINES: &str = "You are an investment research analyst. Based on the provided data, \
answer the user query as directly and concisely as possible. Use no more than 70 words and avoid \
unnecessary financial jargon. Highlight relevant figures only if they directly answer the query.
Guidelines:
1. Address only the information requested in the user query (e.g., revenue, profit, market trends).
2. Avoid extra commentary unless specified by the user query.
3. If historical data is included, summarize trends briefly if they provide context to the answer.
4. Avoid recommendations unless directly asked.";

/// Opening block of every composed prompt.
pub fn main_instruction(utterance: &str, now: NaiveDateTime) -> String {
    format!(
        "For context, today's date and time is {}. The user question is: {utterance}\n\n{ANALYST_GUIDELINES}",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Renders datasource results into prompt sections.
///
/// Each builder fetches exactly one source. A failure is logged with the builder's operation
/// name and returned; nothing is substituted for the missing data.
pub struct SectionAssembler<'a> {
    financials: &'a dyn FinancialDataClient,
    news: &'a dyn NewsClient,
    reports: &'a dyn ReportRepository,
    report_reference_date: NaiveDate,
    period: Period,
}

impl<'a> SectionAssembler<'a> {
    pub fn new(
        financials: &'a dyn FinancialDataClient,
        news: &'a dyn NewsClient,
        reports: &'a dyn ReportRepository,
        report_reference_date: NaiveDate,
    ) -> Self {
        Self {
            financials,
            news,
            reports,
            report_reference_date,
            period: Period::Annual,
        }
    }

    pub async fn fundamentals_section(
        &self,
        ticker: &str,
        kind: FundamentalKind,
    ) -> Result<String, SectionError> {
        let data = self
            .fetch_fundamentals_json(ticker, kind)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    operation = "build_fundamentals_section",
                    ticker,
                    section = %kind.info_type(),
                    error = %err,
                    "prompt section failed"
                )
            })?;
        Ok(format!("Here's the {} data.\n\nData: {data}", kind.label()))
    }

    async fn fetch_fundamentals_json(
        &self,
        ticker: &str,
        kind: FundamentalKind,
    ) -> Result<String, SectionError> {
        let client = self.financials;
        let period = self.period;
        match kind {
            FundamentalKind::IncomeStatement => {
                to_json(&client.fetch_income_statement(ticker, period).await?)
            }
            FundamentalKind::BalanceSheet => {
                to_json(&client.fetch_balance_sheet(ticker, period).await?)
            }
            FundamentalKind::CashflowStatement => {
                to_json(&client.fetch_cash_flow(ticker, period).await?)
            }
            FundamentalKind::FinancialRatios => {
                to_json(&client.fetch_financial_ratios(ticker, period).await?)
            }
        }
    }

    pub async fn news_section(&self, ticker: &str) -> Result<String, SectionError> {
        let summary = self
            .news
            .fetch_insights(ticker)
            .await
            .map_err(SectionError::from)
            .and_then(|insights| to_json(&insights))
            .inspect_err(|err| log_failure("build_news_section", ticker, err))?;
        Ok(format!(
            "Here's the latest news summary related to {ticker}. Analyze the news and explain how it \
might impact the company's stock performance or the broader market.\n\nNews Summary: {summary}"
        ))
    }

    /// Stored reports loosely matching the query's sector, company name and ticker.
    pub async fn research_reports_section(
        &self,
        query: &ParsedUserQuery,
    ) -> Result<String, SectionError> {
        let filter = ReportFilter {
            date: self.report_reference_date,
            sector: query.sector.clone(),
            company_name: query.company_name.clone(),
            ticker: query.ticker.clone(),
        };
        let ticker = query.ticker().unwrap_or_default();
        let reports = self
            .reports
            .fetch(&filter)
            .await
            .map_err(SectionError::from)
            .and_then(|found| to_json(&found))
            .inspect_err(|err| log_failure("build_research_reports_section", ticker, err))?;
        Ok(format!(
            "Here's a summary of the stock research reports in JSON format: {reports}. Analyze these \
reports and identify any key insights, trends, or risks related to the companies' performances. \
Highlight areas of growth, stability, or concern."
        ))
    }

    /// Builds the section for one info type, tagging a failure with that type.
    pub async fn section(
        &self,
        info_type: InfoType,
        ticker: &str,
        query: &ParsedUserQuery,
    ) -> Result<String, ChatError> {
        let built = match info_type {
            InfoType::IncomeStatement => {
                self.fundamentals_section(ticker, FundamentalKind::IncomeStatement).await
            }
            InfoType::CashflowStatement => {
                self.fundamentals_section(ticker, FundamentalKind::CashflowStatement).await
            }
            InfoType::FinancialRatios => {
                self.fundamentals_section(ticker, FundamentalKind::FinancialRatios).await
            }
            InfoType::BalanceSheet => {
                self.fundamentals_section(ticker, FundamentalKind::BalanceSheet).await
            }
            InfoType::News => self.news_section(ticker).await,
            InfoType::StockReport => self.research_reports_section(query).await,
        };
        built.map_err(|source| ChatError::Section {
            section: info_type,
            source,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, SectionError> {
    Ok(serde_json::to_string(value)?)
}

fn log_failure(operation: &'static str, ticker: &str, err: &SectionError) {
    tracing::error!(operation, ticker, error = %err, "prompt section failed");
}
