pub mod reports;

pub use reports::{PollPolicy, ReportIngestor};
