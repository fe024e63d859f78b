use crate::domain::query::InfoType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Annual,
    Quarter,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Annual => "annual",
            Period::Quarter => "quarter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundamentalKind {
    IncomeStatement,
    BalanceSheet,
    CashflowStatement,
    FinancialRatios,
}

impl FundamentalKind {
    /// Human wording used inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            FundamentalKind::IncomeStatement => "income statement",
            FundamentalKind::BalanceSheet => "balance sheet",
            FundamentalKind::CashflowStatement => "cash flow statement",
            FundamentalKind::FinancialRatios => "financial ratio",
        }
    }

    pub fn info_type(&self) -> InfoType {
        match self {
            FundamentalKind::IncomeStatement => InfoType::IncomeStatement,
            FundamentalKind::BalanceSheet => InfoType::BalanceSheet,
            FundamentalKind::CashflowStatement => InfoType::CashflowStatement,
            FundamentalKind::FinancialRatios => InfoType::FinancialRatios,
        }
    }

    pub fn from_info_type(info_type: InfoType) -> Option<Self> {
        match info_type {
            InfoType::IncomeStatement => Some(FundamentalKind::IncomeStatement),
            InfoType::CashflowStatement => Some(FundamentalKind::CashflowStatement),
            InfoType::FinancialRatios => Some(FundamentalKind::FinancialRatios),
            InfoType::BalanceSheet => Some(FundamentalKind::BalanceSheet),
            InfoType::News | InfoType::StockReport => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_of_revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_and_development_expenses: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_expenses: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_before_tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_tax_expense: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    #[serde(default, rename = "epsdiluted", skip_serializing_if = "Option::is_none")]
    pub eps_diluted: Option<f64>,
    /// Provider fields without a typed counterpart, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_and_cash_equivalents: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_current_assets: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_assets: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_current_liabilities: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_liabilities: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_stockholders_equity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<f64>,
    /// Provider fields without a typed counterpart, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowStatement {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_based_compensation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_cash_flow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_expenditure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividends_paid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_stock_repurchased: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_change_in_cash: Option<f64>,
    /// Provider fields without a typed counterpart, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRatios {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_profit_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_profit_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_profit_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_on_assets: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_on_equity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_equity_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_coverage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_earnings_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_to_book_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    /// Provider fields without a typed counterpart, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

const RATIO_DECIMALS: i32 = 4;

impl FinancialRatios {
    pub fn round_values(&mut self) {
        for value in [
            &mut self.current_ratio,
            &mut self.quick_ratio,
            &mut self.gross_profit_margin,
            &mut self.operating_profit_margin,
            &mut self.net_profit_margin,
            &mut self.return_on_assets,
            &mut self.return_on_equity,
            &mut self.debt_equity_ratio,
            &mut self.interest_coverage,
            &mut self.price_earnings_ratio,
            &mut self.price_to_book_ratio,
            &mut self.dividend_yield,
        ] {
            if let Some(v) = value.as_mut() {
                *v = round_to(*v, RATIO_DECIMALS);
            }
        }
        for value in self.extra.values_mut() {
            let rounded = value
                .as_f64()
                .filter(|_| value.is_f64())
                .and_then(|v| serde_json::Number::from_f64(round_to(v, RATIO_DECIMALS)));
            if let Some(n) = rounded {
                *value = serde_json::Value::Number(n);
            }
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// All four statement kinds for one ticker and period. Parts are fetched independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalDataBundle {
    pub income_statement: Vec<IncomeStatement>,
    pub balance_sheet: Vec<BalanceSheet>,
    pub cash_flow: Vec<CashFlowStatement>,
    pub financial_ratios: Vec<FinancialRatios>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_provider_income_statement_shape() {
        let v = json!({
            "date": "2023-09-30",
            "symbol": "AAPL",
            "reportedCurrency": "USD",
            "calendarYear": "2023",
            "period": "FY",
            "revenue": 383285000000.0,
            "netIncome": 96995000000.0,
            "epsdiluted": 6.13,
            "link": "https://example.invalid/10-k"
        });
        let parsed: IncomeStatement = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.symbol.as_deref(), Some("AAPL"));
        assert_eq!(parsed.revenue, Some(383285000000.0));
        assert_eq!(parsed.eps_diluted, Some(6.13));
        assert_eq!(parsed.gross_profit, None);
    }

    #[test]
    fn untyped_provider_fields_survive_a_round_trip() {
        let v = json!({
            "date": "2023-09-30",
            "symbol": "AAPL",
            "totalAssets": 352583000000.0,
            "longTermDebt": 95281000000.0,
            "inventory": 6331000000.0,
            "goodwillAndIntangibleAssets": 0
        });
        let parsed: BalanceSheet = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.total_assets, Some(352583000000.0));
        assert_eq!(parsed.extra.get("longTermDebt"), Some(&json!(95281000000.0)));
        assert!(!parsed.extra.contains_key("totalAssets"));

        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["longTermDebt"], json!(95281000000.0));
        assert_eq!(back["inventory"], json!(6331000000.0));
        assert_eq!(back["goodwillAndIntangibleAssets"], json!(0));
    }

    #[test]
    fn ratio_rounding_covers_untyped_ratios() {
        let mut ratios: FinancialRatios = serde_json::from_value(json!({
            "symbol": "AAPL",
            "assetTurnover": 1.087_337_8,
            "daysOfSalesOutstanding": 58
        }))
        .unwrap();
        ratios.round_values();
        assert_eq!(ratios.extra["assetTurnover"], json!(1.0873));
        assert_eq!(ratios.extra["daysOfSalesOutstanding"], json!(58));
    }

    #[test]
    fn ratio_rounding_keeps_four_decimals() {
        let mut ratios = FinancialRatios {
            current_ratio: Some(0.988_034_5),
            return_on_equity: Some(1.560_780_9),
            dividend_yield: None,
            ..FinancialRatios::default()
        };
        ratios.round_values();
        assert_eq!(ratios.current_ratio, Some(0.988));
        assert_eq!(ratios.return_on_equity, Some(1.5608));
        assert_eq!(ratios.dividend_yield, None);
    }

    #[test]
    fn fundamental_kinds_map_to_info_types_and_back() {
        for kind in [
            FundamentalKind::IncomeStatement,
            FundamentalKind::BalanceSheet,
            FundamentalKind::CashflowStatement,
            FundamentalKind::FinancialRatios,
        ] {
            assert_eq!(FundamentalKind::from_info_type(kind.info_type()), Some(kind));
        }
        assert_eq!(FundamentalKind::from_info_type(InfoType::News), None);
    }
}
