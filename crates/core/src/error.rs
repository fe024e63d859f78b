use crate::domain::query::InfoType;
use crate::llm::error::CompletionError;
use thiserror::Error;

/// The classifier reply could not be turned into a `ParsedUserQuery`.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier reply is malformed: {detail}")]
    MalformedResponse { detail: String, raw_output: String },

    #[error("classifier reported an error: {0}")]
    ModelReportedError(String),
}

/// A datasource call failed. Never converted into an empty result.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{provider} request failed: {detail}")]
    Transport {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} response could not be decoded: {detail}")]
    Decode {
        provider: &'static str,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("report repository query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("report repository unavailable: {0}")]
    Unavailable(String),
}

/// Why one prompt section could not be built.
#[derive(Debug, Error)]
pub enum SectionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("failed to encode section data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure of one user-facing chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("conversation is empty")]
    EmptyConversation,

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("failed to build {section} section: {source}")]
    Section {
        section: InfoType,
        #[source]
        source: SectionError,
    },
}

/// Failure of a document ingestion batch. Nothing is persisted when any step fails.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no files to ingest")]
    NoFiles,

    #[error("path has no file name: {0}")]
    InvalidPath(String),

    #[error("upload of {file} failed: {source}")]
    Upload {
        file: String,
        #[source]
        source: CompletionError,
    },

    #[error("provider failed to process file {file_id} (status={status})")]
    FileProcessingFailed { file_id: String, status: String },

    #[error("file {file_id} not ready after {attempts} status checks")]
    FileNotReady { file_id: String, attempts: u32 },

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("report extraction reply is malformed: {detail}")]
    MalformedResponse { detail: String, raw_output: String },

    #[error("report extraction reported an error: {0}")]
    ModelReportedError(String),

    #[error("extracted report #{index} is invalid: {detail}")]
    InvalidReport { index: usize, detail: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
