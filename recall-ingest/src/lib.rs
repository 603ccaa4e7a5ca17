//! recall-ingest: review-log CSV ingestion into `recall_core::ReviewEvent`s.

pub mod review_log;

pub use review_log::{IngestReport, parse_review_log, parse_review_log_reader};
