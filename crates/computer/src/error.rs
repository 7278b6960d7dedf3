use fanout_wire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputerError {
    #[error("failed to build execution pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Wire(#[from] WireError),
}
