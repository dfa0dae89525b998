use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("Could not initialise the accrual oracle client: {0}")]
    Initialization(String),
    #[error("The accrual oracle could not be reached: {0}")]
    Unreachable(String),
    #[error("The accrual oracle sent a malformed response: {0}")]
    MalformedResponse(String),
}
