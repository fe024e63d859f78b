use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Classified purpose of a user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Buy,
    Sell,
    Research,
    Other,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Buy => "BUY",
            Intent::Sell => "SELL",
            Intent::Research => "RESEARCH",
            Intent::Other => "OTHER",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownIntent(pub String);

impl fmt::Display for UnknownIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown intent {:?}", self.0)
    }
}

impl std::error::Error for UnknownIntent {}

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Intent::Buy),
            "SELL" => Ok(Intent::Sell),
            "RESEARCH" => Ok(Intent::Research),
            "OTHER" => Ok(Intent::Other),
            _ => Err(UnknownIntent(s.to_string())),
        }
    }
}

/// Kind of data a RESEARCH query asks for.
///
/// Declaration order is the canonical section order in an assembled prompt, and `Ord`
/// follows it, so a `BTreeSet<InfoType>` iterates in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoType {
    IncomeStatement,
    CashflowStatement,
    FinancialRatios,
    BalanceSheet,
    News,
    StockReport,
}

impl InfoType {
    pub const CANONICAL_ORDER: [InfoType; 6] = [
        InfoType::IncomeStatement,
        InfoType::CashflowStatement,
        InfoType::FinancialRatios,
        InfoType::BalanceSheet,
        InfoType::News,
        InfoType::StockReport,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            InfoType::IncomeStatement => "income_statement",
            InfoType::CashflowStatement => "cashflow_statement",
            InfoType::FinancialRatios => "financial_ratios",
            InfoType::BalanceSheet => "balance_sheet",
            InfoType::News => "news",
            InfoType::StockReport => "stock_report",
        }
    }

    /// Every info type whose keyword occurs anywhere in `text`.
    ///
    /// Matching is by substring, so `"income_statement, news"` and
    /// `"news and income_statement"` select the same set.
    pub fn matched_in(text: &str) -> BTreeSet<InfoType> {
        let text = text.to_ascii_lowercase();
        Self::CANONICAL_ORDER
            .into_iter()
            .filter(|t| text.contains(t.keyword()))
            .collect()
    }
}

impl fmt::Display for InfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Structured reading of one user utterance. Built once per turn by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedUserQuery {
    pub intent: Intent,
    pub ticker: Option<String>,
    pub company_name: Option<String>,
    pub amount: Option<String>,
    pub sector: Option<String>,
    pub horizon: Option<String>,
    pub info_type: Option<String>,
    pub news_reference: Option<String>,
}

impl ParsedUserQuery {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            ticker: None,
            company_name: None,
            amount: None,
            sector: None,
            horizon: None,
            info_type: None,
            news_reference: None,
        }
    }

    pub fn ticker(&self) -> Option<&str> {
        self.ticker.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn info_types(&self) -> BTreeSet<InfoType> {
        self.info_type
            .as_deref()
            .map(InfoType::matched_in)
            .unwrap_or_default()
    }
}
