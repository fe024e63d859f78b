use serde::{Deserialize, Serialize};

/// Recent coverage of one ticker, reduced to what the model needs to judge impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsInsights {
    pub ticker: String,
    pub articles: Vec<NewsInsight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsInsight {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_reasoning: Option<String>,
}
