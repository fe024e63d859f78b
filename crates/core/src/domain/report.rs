use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Research report extracted from an uploaded document. Never mutated after it is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockResearchReport {
    pub company: String,
    pub sector: String,
    pub recommendation: String,
    pub target_price: Option<f64>,
    pub news_summary: String,
    pub revenue_projections: Vec<f64>,
    pub cagr: Option<f64>,
    pub ebitda: Option<f64>,
}

/// Loose lookup of stored reports.
///
/// `date` is a lower bound on when the report was stored. Empty text criteria are ignored;
/// any remaining criterion matching is enough for a report to be returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub date: NaiveDate,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
}

impl ReportFilter {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            sector: None,
            company_name: None,
            ticker: None,
        }
    }

    pub fn sector(&self) -> Option<&str> {
        non_blank(self.sector.as_deref())
    }

    pub fn company_name(&self) -> Option<&str> {
        non_blank(self.company_name.as_deref())
    }

    pub fn ticker(&self) -> Option<&str> {
        non_blank(self.ticker.as_deref())
    }

    /// In-process form of the repository predicate on text fields.
    pub fn matches(&self, report: &StockResearchReport) -> bool {
        let criteria = [
            (self.sector(), report.sector.as_str()),
            (self.company_name(), report.company.as_str()),
            (self.ticker(), report.company.as_str()),
        ];
        if criteria.iter().all(|(needle, _)| needle.is_none()) {
            return true;
        }
        criteria.iter().any(|(needle, haystack)| {
            needle.is_some_and(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
