use crate::domain::query::{Intent, ParsedUserQuery};
use crate::domain::report::StockResearchReport;
use anyhow::{bail, ensure};
use serde::{Deserialize, Deserializer};

/// Classifier reply: `{"data": {...}, "error": null}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmUserQueryEnvelope {
    #[serde(default)]
    pub data: Option<LlmUserQuery>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmUserQuery {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub amount: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub horizon: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub info_type: Option<String>,
    #[serde(default)]
    pub news: Option<String>,
}

impl LlmUserQueryEnvelope {
    /// The model's own error message, if it set a non-blank one.
    pub fn reported_error(&self) -> Option<&str> {
        self.error.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

impl LlmUserQuery {
    pub fn validate_and_into_query(self) -> anyhow::Result<ParsedUserQuery> {
        let Some(raw_intent) = clean(self.intent) else {
            bail!("intent is missing");
        };
        let intent = raw_intent.parse::<Intent>()?;

        Ok(ParsedUserQuery {
            intent,
            ticker: clean(self.ticker).map(|t| t.to_ascii_uppercase()),
            company_name: clean(self.company_name),
            amount: clean(self.amount),
            sector: clean(self.sector),
            horizon: clean(self.horizon),
            info_type: clean(self.info_type),
            news_reference: clean(self.news),
        })
    }
}

/// Report extraction reply: `{"data": [...], "err": null}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmStockReportBatch {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<LlmStockReport>,
    #[serde(default, alias = "error")]
    pub err: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmStockReport {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub news_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_numbers")]
    pub revenue_projections: Vec<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cagr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ebitda: Option<f64>,
}

impl LlmStockReportBatch {
    pub fn reported_error(&self) -> Option<&str> {
        self.err.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

impl LlmStockReport {
    pub fn validate_and_into_report(self) -> anyhow::Result<StockResearchReport> {
        let company = clean(self.company).unwrap_or_default();
        ensure!(!company.is_empty(), "company must be non-empty");
        ensure!(
            !is_placeholder(&company),
            "company must be a real name (got {company})"
        );

        Ok(StockResearchReport {
            company,
            sector: clean(self.sector).unwrap_or_default(),
            recommendation: clean(self.recommendation).unwrap_or_default(),
            target_price: self.target_price,
            news_summary: clean(self.news_summary).unwrap_or_default(),
            revenue_projections: self.revenue_projections,
            cagr: self.cagr,
            ebitda: self.ebitda,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn is_placeholder(s: &str) -> bool {
    matches!(s.to_ascii_uppercase().as_str(), "N/A" | "NA" | "NULL" | "NONE")
}

/// Numbers, numeric strings, `null`, and placeholders such as `"N/A"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    fn into_number(self) -> Result<Option<f64>, String> {
        match self {
            NumberLike::Number(n) => Ok(Some(n)),
            NumberLike::Text(s) => {
                let s = s.trim().trim_end_matches('%').replace(',', "");
                if s.is_empty() || is_placeholder(&s) {
                    return Ok(None);
                }
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|_| format!("expected a number, got {s:?}"))
            }
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(v) => v.into_number().map_err(serde::de::Error::custom),
    }
}

fn lenient_numbers<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<NumberLike>>::deserialize(deserializer)?.unwrap_or_default();
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if let Some(n) = v.into_number().map_err(serde::de::Error::custom)? {
            out.push(n);
        }
    }
    Ok(out)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Models sometimes answer `info_type` with a list and `amount` with a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextLike {
    Text(String),
    List(Vec<String>),
    Number(f64),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TextLike>::deserialize(deserializer)? {
        None => None,
        Some(TextLike::Text(s)) => Some(s),
        Some(TextLike::List(items)) => Some(items.join(", ")),
        Some(TextLike::Number(n)) => Some(n.to_string()),
    })
}
