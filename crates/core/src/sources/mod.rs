pub mod fmp;
pub mod news;

use crate::domain::fundamentals::{
    BalanceSheet, CashFlowStatement, FinancialRatios, FundamentalDataBundle, IncomeStatement,
    Period,
};
use crate::domain::news::NewsInsights;
use crate::error::FetchError;

#[async_trait::async_trait]
pub trait FinancialDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_income_statement(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<IncomeStatement>, FetchError>;

    async fn fetch_balance_sheet(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<BalanceSheet>, FetchError>;

    async fn fetch_cash_flow(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<CashFlowStatement>, FetchError>;

    async fn fetch_financial_ratios(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<FinancialRatios>, FetchError>;
}

#[async_trait::async_trait]
pub trait NewsClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_insights(&self, ticker: &str) -> Result<NewsInsights, FetchError>;
}

/// Fetches the four statement kinds one after another; the first failure wins.
pub async fn fetch_fundamentals(
    client: &dyn FinancialDataClient,
    ticker: &str,
    period: Period,
) -> Result<FundamentalDataBundle, FetchError> {
    let income_statement = client.fetch_income_statement(ticker, period).await?;
    let balance_sheet = client.fetch_balance_sheet(ticker, period).await?;
    let cash_flow = client.fetch_cash_flow(ticker, period).await?;
    let financial_ratios = client.fetch_financial_ratios(ticker, period).await?;

    Ok(FundamentalDataBundle {
        income_statement,
        balance_sheet,
        cash_flow,
        financial_ratios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFinancials;

    #[tokio::test]
    async fn bundle_collects_all_four_kinds() {
        let fin = FakeFinancials::with_sample_data("AAPL");
        let bundle = fetch_fundamentals(&fin, "AAPL", Period::Annual).await.unwrap();
        assert_eq!(bundle.income_statement.len(), 1);
        assert_eq!(bundle.balance_sheet.len(), 1);
        assert_eq!(bundle.cash_flow.len(), 1);
        assert_eq!(bundle.financial_ratios.len(), 1);
        assert_eq!(
            fin.calls(),
            vec![
                "income_statement:AAPL:annual",
                "balance_sheet:AAPL:annual",
                "cash_flow:AAPL:annual",
                "financial_ratios:AAPL:annual",
            ]
        );
    }

    #[tokio::test]
    async fn bundle_fails_on_first_transport_error() {
        let fin = FakeFinancials::with_sample_data("AAPL").failing_on("balance_sheet");
        let err = fetch_fundamentals(&fin, "AAPL", Period::Annual).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(fin.calls().len(), 2);
    }
}
