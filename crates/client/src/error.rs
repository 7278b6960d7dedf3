use fanout_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("job `{job}` got an unexpected result: {detail}")]
    UnexpectedResult { job: &'static str, detail: String },

    #[error("invalid job parameters: {0}")]
    InvalidJob(String),
}
