use thiserror::Error;

/// API misuse that is not the outcome of a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("A request is already in flight on this orchestrator")]
    RequestInFlight,

    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

impl OrchestratorError {
    /// Log the error and return self, for use at the point it is raised.
    pub fn log(self) -> Self {
        match &self {
            Self::RequestInFlight => {
                tracing::error!("Request rejected: another request is in flight")
            }
            Self::NoRuntime(msg) => tracing::error!("No async runtime: {}", msg),
        }
        self
    }
}
