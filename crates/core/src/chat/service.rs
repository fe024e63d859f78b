use crate::chat::classifier;
use crate::chat::prompts::SectionAssembler;
use crate::chat::router::{IntentRouter, RoutedPrompt, RouterOptions};
use crate::config::Settings;
use crate::domain::chat::ChatMessage;
use crate::domain::fundamentals::{FundamentalDataBundle, Period};
use crate::domain::news::NewsInsights;
use crate::domain::report::{ReportFilter, StockResearchReport};
use crate::error::{ChatError, FetchError, PersistenceError};
use crate::llm::error::CompletionError;
use crate::llm::LlmClient;
use crate::sources::{self, FinancialDataClient, NewsClient};
use crate::storage::reports::ReportRepository;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    /// Lower bound on report age used by the research-report section.
    pub report_reference_date: NaiveDate,
    pub trade_fundamentals: bool,
}

impl ChatOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            report_reference_date: settings.report_reference_date,
            trade_fundamentals: settings.trade_fundamentals_enabled,
        }
    }
}

/// Entry point for chat turns and the direct datasource lookups.
#[derive(Clone)]
pub struct ChatService {
    llm: Arc<dyn LlmClient>,
    financials: Arc<dyn FinancialDataClient>,
    news: Arc<dyn NewsClient>,
    reports: Arc<dyn ReportRepository>,
    options: ChatOptions,
}

impl ChatService {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        financials: Arc<dyn FinancialDataClient>,
        news: Arc<dyn NewsClient>,
        reports: Arc<dyn ReportRepository>,
        options: ChatOptions,
    ) -> Self {
        Self {
            llm,
            financials,
            news,
            reports,
            options,
        }
    }

    /// Forwards the conversation unchanged.
    pub async fn chat(&self, conversation: &[ChatMessage]) -> Result<ChatMessage, ChatError> {
        if conversation.is_empty() {
            return Err(ChatError::EmptyConversation);
        }
        Ok(self.invoke(conversation).await?)
    }

    pub async fn answer_user_query(
        &self,
        conversation: &[ChatMessage],
    ) -> Result<ChatMessage, ChatError> {
        self.answer_user_query_at(conversation, chrono::Local::now().naive_local())
            .await
    }

    /// Classifies the last turn, composes a prompt for it, and completes it after the earlier
    /// turns. An OTHER turn is answered locally without a completion call.
    pub async fn answer_user_query_at(
        &self,
        conversation: &[ChatMessage],
        now: NaiveDateTime,
    ) -> Result<ChatMessage, ChatError> {
        let Some((latest, history)) = conversation.split_last() else {
            return Err(ChatError::EmptyConversation);
        };

        let query = classifier::classify(self.llm.as_ref(), &latest.content).await?;
        tracing::info!(intent = %query.intent, ticker = ?query.ticker(), info_type = ?query.info_type, "classified user query");

        let assembler = SectionAssembler::new(
            self.financials.as_ref(),
            self.news.as_ref(),
            self.reports.as_ref(),
            self.options.report_reference_date,
        );
        let router = IntentRouter::new(
            assembler,
            RouterOptions {
                trade_fundamentals: self.options.trade_fundamentals,
            },
        );

        match router.route(&query, &latest.content, now).await? {
            RoutedPrompt::OutOfDomain(message) => Ok(ChatMessage::assistant(message)),
            RoutedPrompt::Compose(prompt) => {
                let mut turns = history.to_vec();
                turns.push(ChatMessage::user(prompt));
                Ok(self.invoke(&turns).await?)
            }
        }
    }

    pub async fn fetch_fundamentals(&self, ticker: &str) -> Result<FundamentalDataBundle, FetchError> {
        sources::fetch_fundamentals(self.financials.as_ref(), ticker, Period::Annual)
            .await
            .inspect_err(|err| tracing::error!(operation = "fetch_fundamentals", ticker, error = %err, "fundamentals lookup failed"))
    }

    pub async fn fetch_news_insights(&self, ticker: &str) -> Result<NewsInsights, FetchError> {
        self.news
            .fetch_insights(ticker)
            .await
            .inspect_err(|err| tracing::error!(operation = "fetch_news_insights", ticker, error = %err, "news lookup failed"))
    }

    pub async fn list_reports(
        &self,
        filter: &ReportFilter,
    ) -> Result<Vec<StockResearchReport>, PersistenceError> {
        self.reports.fetch(filter).await
    }

    async fn invoke(&self, conversation: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        self.llm
            .complete(conversation)
            .await?
            .into_top_message(self.llm.provider_name())
    }
}
