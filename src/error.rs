use std::io;

use thiserror::Error;

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to query the metrics: {0}")]
    Query(String),

    #[error("Failed to encode the samples: {0}")]
    Encoding(#[source] io::Error),

    #[error("Failed to build the e-mail message: {0}")]
    MalformedEnvelope(String),

    #[error("Failed to send the e-mail: {0}")]
    Send(String),
}
