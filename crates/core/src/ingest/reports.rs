use crate::domain::contract::LlmStockReportBatch;
use crate::domain::report::StockResearchReport;
use crate::error::IngestError;
use crate::llm::{json, FileStatus, LlmClient};
use crate::storage::reports::ReportRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const UPLOAD_PURPOSE: &str = "assistants";
const DEFAULT_POLL_ATTEMPTS: u32 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const MAX_BACKOFF_FACTOR: u32 = 8;

/// How long to wait for the provider to finish processing an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub initial_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_POLL_ATTEMPTS,
            initial_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl PollPolicy {
    pub fn from_env() -> anyhow::Result<Self> {
        let attempts = std::env::var("FILE_READY_POLL_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POLL_ATTEMPTS);
        anyhow::ensure!(attempts >= 1, "FILE_READY_POLL_ATTEMPTS must be >= 1");
        let interval_ms = std::env::var("FILE_READY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Ok(Self {
            attempts,
            initial_interval: Duration::from_millis(interval_ms),
        })
    }

    /// Wait before status check number `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(MAX_BACKOFF_FACTOR)
            .min(MAX_BACKOFF_FACTOR);
        self.initial_interval * factor
    }
}

/// A local document queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
}

/// Resolves upload names from paths. Fails on an empty list or a path without a file name.
pub fn file_infos(paths: &[PathBuf]) -> Result<Vec<FileInfo>, IngestError> {
    if paths.is_empty() {
        return Err(IngestError::NoFiles);
    }
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| IngestError::InvalidPath(path.display().to_string()))?;
            Ok(FileInfo {
                name: name.to_string(),
                path: path.clone(),
            })
        })
        .collect()
}

/// Uploads research documents, has the model extract one report per document, and stores
/// the batch.
///
/// The batch is all-or-nothing: every record is validated before anything is written, and
/// the repository saves the batch as a unit.
pub struct ReportIngestor {
    llm: Arc<dyn LlmClient>,
    reports: Arc<dyn ReportRepository>,
    poll: PollPolicy,
}

impl ReportIngestor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        reports: Arc<dyn ReportRepository>,
        poll: PollPolicy,
    ) -> Self {
        Self { llm, reports, poll }
    }

    pub async fn ingest(&self, paths: &[PathBuf]) -> Result<Vec<StockResearchReport>, IngestError> {
        let files = file_infos(paths)?;

        let mut file_ids = Vec::with_capacity(files.len());
        for file in &files {
            let id = self.upload(&file.name, &file.path).await?;
            file_ids.push(id);
        }

        for id in &file_ids {
            self.wait_until_ready(id).await?;
        }

        let reply = self
            .llm
            .complete_with_files(&extraction_prompt(&file_ids), &file_ids)
            .await?
            .into_top_message(self.llm.provider_name())?;

        let reports = parse_extraction(&reply.content)?;
        if reports.is_empty() {
            return Err(IngestError::MalformedResponse {
                detail: format!("no reports extracted from {} files", files.len()),
                raw_output: reply.content,
            });
        }
        let saved = self.reports.save_batch(&reports).await?;
        tracing::info!(files = files.len(), saved, "ingested stock research reports");
        Ok(reports)
    }

    async fn upload(&self, name: &str, path: &Path) -> Result<String, IngestError> {
        let uploaded = self
            .llm
            .upload_file(name, path, UPLOAD_PURPOSE)
            .await
            .map_err(|source| IngestError::Upload {
                file: name.to_string(),
                source,
            })?;
        tracing::debug!(file = name, file_id = %uploaded.id, "uploaded research document");
        Ok(uploaded.id)
    }

    async fn wait_until_ready(&self, file_id: &str) -> Result<(), IngestError> {
        for attempt in 1..=self.poll.attempts {
            tokio::time::sleep(self.poll.backoff(attempt)).await;
            let file = self.llm.file_status(file_id).await?;
            match file.status {
                FileStatus::Processed => return Ok(()),
                FileStatus::Error => {
                    return Err(IngestError::FileProcessingFailed {
                        file_id: file_id.to_string(),
                        status: file.status.as_str().to_string(),
                    })
                }
                FileStatus::Uploaded | FileStatus::Unknown => {
                    tracing::debug!(file_id, attempt, status = file.status.as_str(), "file not ready yet");
                }
            }
        }
        Err(IngestError::FileNotReady {
            file_id: file_id.to_string(),
            attempts: self.poll.attempts,
        })
    }
}

pub fn extraction_prompt(file_ids: &[String]) -> String {
    format!(
        "You have been provided with files containing stock research reports on publicly listed companies. \
Analyze each file thoroughly and extract one report object per file. Follow these instructions strictly:

1. Extract only verified, factual information stated in the reports. Do not infer or assume details.
2. Fill these fields for every report:
   - company: name of the company (usually in the title or company information section)
   - sector: industry sector (near the company name or at the top of the report)
   - recommendation: analyst recommendation such as Buy, Hold or Sell (usually on the first pages)
   - target_price: target price as a number (commonly next to the recommendation)
   - revenue_projections: revenue projections for future fiscal years as numbers (financial projections, \"Net Sales\" or \"Revenue\" rows)
   - cagr: compound annual growth rate as a number (financial projections)
   - ebitda: earnings before interest, taxes, depreciation and amortization as a number (financial section)
   - news_summary: summary of key company news or updates from the narrative sections
3. Cross-check every field. If a value is missing, use null.
4. Respond with JSON only, without explanations, in exactly this format:
{{
  \"data\": [
    {{\"company\": \"\", \"sector\": \"\", \"recommendation\": \"\", \"target_price\": 0.0, \"revenue_projections\": [0.0], \"cagr\": 0.0, \"ebitda\": 0.0, \"news_summary\": \"\"}}
  ],
  \"err\": null
}}
Set \"err\" to a short message only if extraction fails.
5. Only process these file ids: {}",
        file_ids.join(", ")
    )
}

/// Decodes and validates every record of an extraction reply.
pub fn parse_extraction(raw: &str) -> Result<Vec<StockResearchReport>, IngestError> {
    let batch: LlmStockReportBatch =
        json::decode_reply(raw).map_err(|e| IngestError::MalformedResponse {
            detail: format!("not valid JSON: {e}"),
            raw_output: raw.to_string(),
        })?;

    if let Some(message) = batch.reported_error() {
        return Err(IngestError::ModelReportedError(message.to_string()));
    }

    batch
        .data
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .validate_and_into_report()
                .map_err(|e| IngestError::InvalidReport {
                    index,
                    detail: format!("{e:#}"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLlm, InMemoryReports};
    use serde_json::json;

    const EXTRACTED: &str = r#"```json
{
  "data": [
    {"company": "Larsen & Toubro", "sector": "Infrastructure", "recommendation": "BUY", "target_price": 4150, "revenue_projections": [2210000, 2540000], "cagr": "13.5", "ebitda": null, "news_summary": "Order inflows up."}
  ],
  "err": null
}
```"#;

    fn fast_poll(attempts: u32) -> PollPolicy {
        PollPolicy {
            attempts,
            initial_interval: Duration::from_millis(1),
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/data/reports/{n}"))).collect()
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = PollPolicy {
            attempts: 10,
            initial_interval: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
        assert_eq!(policy.backoff(5), Duration::from_millis(800));
        assert_eq!(policy.backoff(40), Duration::from_millis(800));
    }

    #[test]
    fn file_infos_use_base_names() {
        let infos = file_infos(&paths(&["lt_q1.pdf"])).unwrap();
        assert_eq!(infos[0].name, "lt_q1.pdf");
        assert!(matches!(file_infos(&[]), Err(IngestError::NoFiles)));
        assert!(matches!(
            file_infos(&[PathBuf::from("/")]),
            Err(IngestError::InvalidPath(_))
        ));
    }

    #[test]
    fn prompt_lists_file_ids() {
        let prompt = extraction_prompt(&["file-1".to_string(), "file-2".to_string()]);
        assert!(prompt.ends_with("Only process these file ids: file-1, file-2"));
    }

    #[test]
    fn invalid_record_rejects_whole_batch() {
        let raw = json!({
            "data": [
                {"company": "Infosys", "sector": "IT"},
                {"company": "N/A"}
            ],
            "err": null
        })
        .to_string();
        assert!(matches!(
            parse_extraction(&raw),
            Err(IngestError::InvalidReport { index: 1, .. })
        ));
    }

    #[test]
    fn reported_error_is_surfaced() {
        let raw = json!({"data": null, "err": "unreadable scan"}).to_string();
        assert!(matches!(
            parse_extraction(&raw),
            Err(IngestError::ModelReportedError(ref m)) if m == "unreadable scan"
        ));
    }

    #[tokio::test]
    async fn ingests_after_files_are_processed() {
        let llm = Arc::new(
            FakeLlm::new()
                .file_statuses("file-1", vec![FileStatus::Uploaded, FileStatus::Processed])
                .reply(EXTRACTED),
        );
        let reports = Arc::new(InMemoryReports::default());
        let ingestor = ReportIngestor::new(llm.clone(), reports.clone(), fast_poll(3));

        let saved = ingestor.ingest(&paths(&["lt_q1.pdf"])).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].company, "Larsen & Toubro");
        assert_eq!(saved[0].cagr, Some(13.5));
        assert_eq!(reports.stored(), saved);

        assert_eq!(llm.uploads(), vec![("lt_q1.pdf".to_string(), "assistants".to_string())]);
        assert_eq!(llm.status_checks(), vec!["file-1", "file-1"]);
        let file_requests = llm.file_requests();
        assert_eq!(file_requests.len(), 1);
        assert_eq!(file_requests[0].1, vec!["file-1".to_string()]);
        assert!(file_requests[0].0.contains("file-1"));
    }

    #[tokio::test]
    async fn processing_error_fails_before_extraction() {
        let llm = Arc::new(
            FakeLlm::new()
                .file_statuses("file-1", vec![FileStatus::Error])
                .reply(EXTRACTED),
        );
        let reports = Arc::new(InMemoryReports::default());
        let ingestor = ReportIngestor::new(llm.clone(), reports.clone(), fast_poll(3));

        let err = ingestor.ingest(&paths(&["scan.pdf"])).await.unwrap_err();
        assert!(matches!(err, IngestError::FileProcessingFailed { .. }));
        assert!(llm.file_requests().is_empty());
        assert!(reports.stored().is_empty());
    }

    #[tokio::test]
    async fn exhausted_polls_fail_with_not_ready() {
        let llm = Arc::new(FakeLlm::new().file_statuses("file-1", vec![FileStatus::Uploaded]));
        let reports = Arc::new(InMemoryReports::default());
        let ingestor = ReportIngestor::new(llm.clone(), reports, fast_poll(2));

        let err = ingestor.ingest(&paths(&["slow.pdf"])).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::FileNotReady { attempts: 2, .. }
        ));
        assert_eq!(llm.status_checks().len(), 2);
    }

    #[tokio::test]
    async fn repository_failure_surfaces_as_persistence_error() {
        let llm = Arc::new(
            FakeLlm::new()
                .file_statuses("file-1", vec![FileStatus::Processed])
                .reply(EXTRACTED),
        );
        let reports = Arc::new(InMemoryReports::default().failing());
        let ingestor = ReportIngestor::new(llm, reports, fast_poll(1));

        let err = ingestor.ingest(&paths(&["lt_q1.pdf"])).await.unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
    }

    #[tokio::test]
    async fn empty_extraction_is_rejected_without_saving() {
        let llm = Arc::new(
            FakeLlm::new()
                .file_statuses("file-1", vec![FileStatus::Processed])
                .reply(r#"{"data": [], "err": null}"#),
        );
        let reports = Arc::new(InMemoryReports::default());
        let ingestor = ReportIngestor::new(llm.clone(), reports.clone(), fast_poll(1));

        let err = ingestor.ingest(&paths(&["cover_page.pdf"])).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::MalformedResponse { ref raw_output, .. } if raw_output.contains("\"data\": []")
        ));
        assert_eq!(llm.file_requests().len(), 1);
        assert!(reports.stored().is_empty());
    }
}
