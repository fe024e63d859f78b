use crate::chat::prompts::{main_instruction, SectionAssembler, OUT_OF_DOMAIN_MESSAGE};
use crate::domain::query::{InfoType, Intent, ParsedUserQuery};
use crate::error::ChatError;
use chrono::NaiveDateTime;

const SECTION_SEPARATOR: &str = "\n\n";

/// Outcome of routing one classified turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedPrompt {
    /// Send this prompt as the new user turn.
    Compose(String),
    /// Answer directly; no completion call follows.
    OutOfDomain(&'static str),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Prepend the four fundamentals sections to BUY/SELL prompts.
    pub trade_fundamentals: bool,
}

/// Stateless dispatch from intent to flow.
pub struct IntentRouter<'a> {
    assembler: SectionAssembler<'a>,
    options: RouterOptions,
}

impl<'a> IntentRouter<'a> {
    pub fn new(assembler: SectionAssembler<'a>, options: RouterOptions) -> Self {
        Self { assembler, options }
    }

    pub async fn route(
        &self,
        query: &ParsedUserQuery,
        utterance: &str,
        now: NaiveDateTime,
    ) -> Result<RoutedPrompt, ChatError> {
        let prompt = match query.intent {
            Intent::Buy | Intent::Sell => self.trade_flow(query, utterance, now).await?,
            Intent::Research => self.research_flow(query, utterance, now).await?,
            Intent::Other => return Ok(RoutedPrompt::OutOfDomain(OUT_OF_DOMAIN_MESSAGE)),
        };
        Ok(RoutedPrompt::Compose(prompt))
    }

    async fn trade_flow(
        &self,
        query: &ParsedUserQuery,
        utterance: &str,
        now: NaiveDateTime,
    ) -> Result<String, ChatError> {
        let mut parts = vec![main_instruction(utterance, now)];
        if let Some(ticker) = query.ticker() {
            if self.options.trade_fundamentals {
                for info_type in [
                    InfoType::IncomeStatement,
                    InfoType::CashflowStatement,
                    InfoType::FinancialRatios,
                    InfoType::BalanceSheet,
                ] {
                    parts.push(self.assembler.section(info_type, ticker, query).await?);
                }
            }
            parts.push(self.assembler.section(InfoType::News, ticker, query).await?);
        }
        tracing::debug!(intent = %query.intent, ticker = ?query.ticker(), sections = parts.len() - 1, "composed trade prompt");
        Ok(parts.join(SECTION_SEPARATOR))
    }

    async fn research_flow(
        &self,
        query: &ParsedUserQuery,
        utterance: &str,
        now: NaiveDateTime,
    ) -> Result<String, ChatError> {
        let mut parts = vec![main_instruction(utterance, now)];
        if let Some(ticker) = query.ticker() {
            // BTreeSet iteration is canonical section order.
            for info_type in query.info_types() {
                parts.push(self.assembler.section(info_type, ticker, query).await?);
            }
        }
        tracing::debug!(intent = %query.intent, ticker = ?query.ticker(), sections = parts.len() - 1, "composed research prompt");
        Ok(parts.join(SECTION_SEPARATOR))
    }
}
