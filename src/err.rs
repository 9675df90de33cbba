use axum::extract::multipart::MultipartError;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::pages;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    InvalidPayload { message: String },
    #[error("{kind}: {message}")]
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let shown = match &self {
            Error::InternalError { kind, message } => {
                log::error!("{} while handling request: {}", kind, message);
                "Something went wrong. Please try again later.".to_string()
            }
            other => other.to_string(),
        };
        match pages::error_page(status, &shown) {
            Ok(page) => (status, Html(page)).into_response(),
            Err(err) => {
                log::error!("Could not render error page: {}", err);
                (status, shown).into_response()
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::InternalError {
            kind: "IOError",
            message: io.to_string(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::InternalError {
            kind: "DatabaseError",
            message: err.to_string(),
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "HashError",
            message: err.to_string(),
        }
    }
}

impl From<tera::Error> for Error {
    fn from(err: tera::Error) -> Self {
        Self::InternalError {
            kind: "TemplateError",
            message: format!("{:?}", err),
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Self::InvalidPayload {
            message: format!("Malformed form submission: {}", err),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError {
            kind: "Unknown",
            message: err.to_string(),
        }
    }
}
