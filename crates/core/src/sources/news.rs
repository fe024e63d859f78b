use crate::config::Settings;
use crate::domain::news::{NewsInsight, NewsInsights};
use crate::error::FetchError;
use crate::sources::NewsClient;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;

const PROVIDER: &str = "polygon_news";
const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
const NEWS_PATH: &str = "/v2/reference/news";
const DEFAULT_ARTICLE_LIMIT: u32 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: String,
    pub base_url: String,
    pub article_limit: u32,
    pub timeout_secs: u64,
}

impl NewsConfig {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_news_api_key()?.to_string();
        let base_url =
            std::env::var("NEWS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let article_limit = std::env::var("NEWS_ARTICLE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_ARTICLE_LIMIT);
        anyhow::ensure!(article_limit >= 1, "NEWS_ARTICLE_LIMIT must be >= 1");
        let timeout_secs = std::env::var("NEWS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            base_url,
            article_limit,
            timeout_secs,
        })
    }
}

/// Ticker news with per-ticker sentiment insights.
#[derive(Debug, Clone)]
pub struct PolygonNewsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    article_limit: u32,
}

impl PolygonNewsClient {
    pub fn new(config: NewsConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build news http client")?;

        Ok(Self {
            http,
            api_key: config.api_key,
            base_url: config.base_url,
            article_limit: config.article_limit,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(NewsConfig::from_settings(settings)?)
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), NEWS_PATH)
    }

    fn headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|e| {
            FetchError::Transport {
                provider: PROVIDER,
                detail: format!("invalid api key header: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl NewsClient for PolygonNewsClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_insights(&self, ticker: &str) -> Result<NewsInsights, FetchError> {
        let ticker = ticker.trim().to_ascii_uppercase();
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .query(&[
                ("ticker", ticker.clone()),
                ("limit", self.article_limit.to_string()),
                ("order", "desc".to_string()),
                ("sort", "published_utc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                provider: PROVIDER,
                detail: e.to_string(),
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| FetchError::Transport {
            provider: PROVIDER,
            detail: format!("failed to read response: {e}"),
        })?;
        if !status.is_success() {
            return Err(FetchError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed = serde_json::from_str::<NewsResponse>(&text).map_err(|e| FetchError::Decode {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;
        Ok(parsed.into_insights(&ticker))
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    title: String,
    #[serde(default)]
    publisher: Option<Publisher>,
    #[serde(default)]
    published_utc: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    article_url: Option<String>,
    #[serde(default)]
    insights: Vec<TickerInsight>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerInsight {
    ticker: String,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    sentiment_reasoning: Option<String>,
}

impl NewsResponse {
    fn into_insights(self, ticker: &str) -> NewsInsights {
        let articles = self
            .results
            .into_iter()
            .map(|article| {
                // Articles often cover several tickers; keep the insight for ours.
                let insight = article
                    .insights
                    .into_iter()
                    .find(|i| i.ticker.eq_ignore_ascii_case(ticker));
                let (sentiment, sentiment_reasoning) = match insight {
                    Some(i) => (i.sentiment, i.sentiment_reasoning),
                    None => (None, None),
                };
                NewsInsight {
                    title: article.title,
                    publisher: article.publisher.and_then(|p| p.name),
                    published_utc: article.published_utc,
                    description: article.description,
                    article_url: article.article_url,
                    sentiment,
                    sentiment_reasoning,
                }
            })
            .collect();

        NewsInsights {
            ticker: ticker.to_string(),
            articles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_only_the_requested_ticker_insight() {
        let v = json!({
            "status": "OK",
            "results": [
                {
                    "title": "Apple and Microsoft rally",
                    "publisher": {"name": "Benzinga"},
                    "published_utc": "2024-08-27T14:00:00Z",
                    "description": "Megacaps lead the market higher.",
                    "article_url": "https://news.test/1",
                    "insights": [
                        {"ticker": "MSFT", "sentiment": "neutral", "sentiment_reasoning": "mentioned"},
                        {"ticker": "AAPL", "sentiment": "positive", "sentiment_reasoning": "strong iPhone demand"}
                    ]
                },
                {"title": "No insight article"}
            ]
        });
        let parsed: NewsResponse = serde_json::from_value(v).unwrap();
        let insights = parsed.into_insights("AAPL");
        assert_eq!(insights.ticker, "AAPL");
        assert_eq!(insights.articles.len(), 2);
        assert_eq!(insights.articles[0].sentiment.as_deref(), Some("positive"));
        assert_eq!(insights.articles[0].publisher.as_deref(), Some("Benzinga"));
        assert_eq!(insights.articles[1].sentiment, None);
    }

    #[test]
    fn missing_results_decode_as_empty() {
        let parsed: NewsResponse = serde_json::from_value(json!({"status": "OK"})).unwrap();
        assert!(parsed.into_insights("TSLA").articles.is_empty());
    }
}
