use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::delivery::{DeliveryError, ValidatorError},
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Plain-text error response with a diagnostic report for the logging layer.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: String,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<DeliveryError> for HttpError {
    fn from(error: DeliveryError) -> Self {
        const SOURCE: &str = "infra::http::delivery_error_to_http_error";
        match &error {
            DeliveryError::NotAvailable => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Feeds are not available on this site.",
                &error,
            ),
            DeliveryError::CategoriesDisabled => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Category feeds are not available on this site.",
                &error,
            ),
            DeliveryError::UnknownCategory { category } => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                format!("There is no feed for category `{category}`."),
                &error,
            ),
            DeliveryError::CollectionNotFound { key, firehose: false } => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                format!("The collection `{key}` does not exist."),
                &error,
            ),
            DeliveryError::CollectionNotFound { firehose: true, .. } => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "The feed is misconfigured.",
                &error,
            ),
            DeliveryError::Source(_) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &error,
            ),
        }
    }
}

impl From<ValidatorError> for HttpError {
    fn from(error: ValidatorError) -> Self {
        let public_message = match &error {
            ValidatorError::MalformedEntityTag { .. } => "Malformed If-None-Match header.",
            ValidatorError::MalformedDate { .. } => "Malformed If-Modified-Since header.",
        };
        HttpError::from_error(
            "infra::http::validator_error_to_http_error",
            StatusCode::BAD_REQUEST,
            public_message,
            &error,
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: impl Into<HttpError>) -> StatusCode {
        error.into().into_response().status()
    }

    #[test]
    fn delivery_errors_map_to_statuses() {
        assert_eq!(
            status_of(DeliveryError::NotAvailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(DeliveryError::CategoriesDisabled),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DeliveryError::UnknownCategory {
                category: "x".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DeliveryError::CollectionNotFound {
                key: "travel".to_string(),
                firehose: false
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DeliveryError::CollectionNotFound {
                key: "articles".to_string(),
                firehose: true
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn malformed_validators_are_bad_requests_with_a_report() {
        let response = HttpError::from(ValidatorError::MalformedDate {
            value: "soon".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert!(report.messages[0].contains("soon"));
    }
}
