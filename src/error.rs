use std::time::Duration;

use miette::Diagnostic;
use oauth2::{HttpClientError, RequestTokenError, basic::BasicErrorResponse};
use reqwest::StatusCode;
use thiserror::Error;
use tracing_error::SpanTrace;

/// Error returned by the OAuth2 client-credentials exchange.
pub type OAuth2Error = RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>;

/// Errors that can occur when interacting with the Xero API.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// The request never produced a response (connection refused, timeout, broken body stream).
    #[error("error sending request: {0}")]
    #[diagnostic(
        code(xero_access::transport),
        help("Check your network connection and Xero API availability")
    )]
    Transport(#[source] reqwest::Error),

    /// The API answered with a status other than `200 OK`.
    #[error("api responded with {status} for {url}: {body}")]
    #[diagnostic(
        code(xero_access::api),
        help("The response body carries the diagnostic text returned by Xero")
    )]
    Api {
        status: StatusCode,
        url: String,
        body: String,
        span_trace: SpanTrace,
    },

    /// The API answered `200 OK` without a body.
    #[error("received an empty response from {url}")]
    #[diagnostic(code(xero_access::empty_response))]
    EmptyResponse { url: String },

    /// A legacy `/Date(...)/` value could not be converted.
    #[error("malformed legacy timestamp {input:?}: {reason}")]
    #[diagnostic(
        code(xero_access::malformed_timestamp),
        help("Expected the form /Date(<millis>[+|-]<offset>)/")
    )]
    MalformedTimestamp { input: String, reason: String },

    /// The operation was aborted through its cancellation token.
    #[error("request cancelled")]
    #[diagnostic(code(xero_access::cancelled))]
    Cancelled,

    /// The server kept answering 429 after the configured number of retries.
    #[error("rate limit exceeded after {attempts} retries: retry after {retry_after:?}")]
    #[diagnostic(
        code(xero_access::rate_limit_exceeded),
        help("The Xero API rate limit has been exceeded. Wait and retry, or raise the retry budget.")
    )]
    RateLimitExceeded {
        retry_after: Option<Duration>,
        attempts: u32,
        url: String,
        response_body: Option<String>,
    },

    #[error("endpoint {path:?} could not be parsed as a URL")]
    #[diagnostic(
        code(xero_access::invalid_endpoint),
        help("Check that the base URL and path are correctly formatted")
    )]
    InvalidEndpoint {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {name:?}")]
    #[diagnostic(code(xero_access::invalid_header))]
    InvalidHeader { name: String },

    #[error("error encoding request body: {0}")]
    #[diagnostic(code(xero_access::serialization_error))]
    Serialization(#[source] serde_json::Error),

    #[error("error decoding response: {0}")]
    #[diagnostic(
        code(xero_access::deserialization_error),
        help("The API returned data in an unexpected format")
    )]
    DeserializationError(#[source] serde_json::Error, Option<String>),

    #[error("object not found: {entity} ({identifier})")]
    #[diagnostic(
        code(xero_access::not_found),
        help("Verify that the {entity} exists and that you have permission to access it")
    )]
    NotFound { entity: String, identifier: String },

    /// An update was requested for a record that carries no identifier.
    #[error("{entity} update requires the first record to carry an identifier")]
    #[diagnostic(code(xero_access::missing_identifier))]
    MissingIdentifier { entity: String },

    #[error("oauth2 error: {0:?}")]
    #[diagnostic(
        code(xero_access::oauth2_error),
        help("Verify your OAuth2 configuration and credentials")
    )]
    OAuth2(Box<OAuth2Error>),
}

impl Error {
    pub(crate) fn api(status: StatusCode, url: String, body: String) -> Self {
        Self::Api {
            status,
            url,
            body,
            span_trace: SpanTrace::capture(),
        }
    }

    pub(crate) fn malformed_timestamp(input: &str, reason: impl ToString) -> Self {
        Self::MalformedTimestamp {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The URL of the request that failed, when known.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Transport(e) => e.url().map(url::Url::as_str),
            Self::Api { url, .. }
            | Self::EmptyResponse { url }
            | Self::RateLimitExceeded { url, .. } => Some(url),
            _ => None,
        }
    }

    /// The HTTP status returned by the API, when a response was received.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(e) => e.status(),
            Self::Api { status, .. } => Some(*status),
            Self::EmptyResponse { .. } => Some(StatusCode::OK),
            Self::RateLimitExceeded { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            _ => None,
        }
    }

    /// The raw response body, when one was captured.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body),
            Self::RateLimitExceeded { response_body, .. }
            | Self::DeserializationError(_, response_body) => response_body.as_deref(),
            _ => None,
        }
    }

    /// The span trace captured where the error was raised.
    #[must_use]
    pub fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            Self::Api { span_trace, .. } => Some(span_trace),
            _ => None,
        }
    }
}

impl From<OAuth2Error> for Error {
    fn from(e: OAuth2Error) -> Self {
        Self::OAuth2(Box::new(e))
    }
}

/// Type alias for results from this crate.
///
/// This is already a Miette diagnostic result due to the implementation of
/// the Diagnostic trait for the Error type.
pub type Result<O> = std::result::Result<O, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status_and_body() {
        let error = Error::api(
            StatusCode::BAD_REQUEST,
            "https://api.xero.com/api.xro/2.0/Invoices".to_string(),
            "{\"Message\":\"A validation exception occurred\"}".to_string(),
        );

        assert_eq!(error.status_code(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(
            error.url(),
            Some("https://api.xero.com/api.xro/2.0/Invoices")
        );
        assert!(
            error
                .response_body()
                .is_some_and(|body| body.contains("validation exception"))
        );
        assert!(error.span_trace().is_some());
        assert!(error.to_string().contains("400"));
    }

    #[test]
    fn cancellation_has_no_response_context() {
        let error = Error::Cancelled;
        assert_eq!(error.status_code(), None);
        assert_eq!(error.url(), None);
        assert_eq!(error.response_body(), None);
    }
}
