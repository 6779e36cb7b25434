use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Server error code MongoDB reports for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClienteleError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Customer not found")]
    NotFound,

    #[error("Member number already exists")]
    Conflict,

    #[error("Internal Server Error")]
    DatabaseError,
}

impl ClienteleError {
    pub fn missing_fields() -> Self {
        Self::BadRequest("Missing required fields".to_owned())
    }

    pub fn missing_id() -> Self {
        Self::BadRequest("Missing customer id".to_owned())
    }
}

/// Body of every error response: `{"error": "<message>"}`
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
}

impl ResponseError for ClienteleError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorEnvelope {
            error: self.to_string(),
        })
    }
}

/// Driver details are logged here and never reach the response body
impl From<mongodb::error::Error> for ClienteleError {
    fn from(e: mongodb::error::Error) -> ClienteleError {
        use mongodb::error::{ErrorKind, WriteFailure};

        let duplicate_key = match e.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(failure)) => failure.code == DUPLICATE_KEY,
            ErrorKind::Command(failure) => failure.code == DUPLICATE_KEY,
            _ => false,
        };
        if duplicate_key {
            warn!(err = ?e, "unique index violation");
            return ClienteleError::Conflict;
        }

        error!(err = ?e, "MongoDB error occurred");
        ClienteleError::DatabaseError
    }
}
