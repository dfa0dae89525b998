use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use loyalty_engine::{LedgerApiError, OracleError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(String),
    #[error("{0}")]
    InvalidOrderNumber(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Insufficient funds for this withdrawal")]
    InsufficientFunds,
    #[error("Invalid withdrawal amount. {0}")]
    InvalidAmount(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<LedgerApiError> for ServerError {
    fn from(e: LedgerApiError) -> Self {
        match e {
            LedgerApiError::InvalidOrderNumber(e) => Self::InvalidOrderNumber(e.to_string()),
            LedgerApiError::OrderUploadedByAnotherUser(_) => Self::Conflict(e.to_string()),
            LedgerApiError::WithdrawalAlreadyExists(_) => Self::Conflict(e.to_string()),
            LedgerApiError::InsufficientFunds => Self::InsufficientFunds,
            LedgerApiError::NonPositiveAmount => Self::InvalidAmount(e.to_string()),
            LedgerApiError::DatabaseError(msg) => {
                error!("💻️ Database error while handling a request. {msg}");
                Self::BackendError("Database error".to_string())
            },
        }
    }
}

impl From<OracleError> for ServerError {
    fn from(e: OracleError) -> Self {
        Self::InitializeError(format!("Could not create the accrual system client. {e}"))
    }
}
