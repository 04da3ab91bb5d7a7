//! Sentry integration for xero-access errors.
//!
//! Only available when the `sentry` feature is enabled.
//!
//! ```toml
//! [dependencies]
//! xero-access = { version = "0.1", features = ["sentry"] }
//! ```

use std::collections::BTreeMap;

use sentry_core::{Breadcrumb, protocol::Value};

use crate::error::Error;

/// Captures the context of a failed call as a Sentry breadcrumb, so the API
/// call history leading up to a report is visible.
impl<'a> From<&'a Error> for Breadcrumb {
    fn from(error: &'a Error) -> Self {
        let mut data = BTreeMap::new();
        if let Some(url) = error.url() {
            data.insert("url".to_string(), Value::from(url));
        }
        if let Some(status) = error.status_code() {
            data.insert("status_code".to_string(), Value::from(status.as_u16()));
        }

        let category = match error {
            Error::Transport(_) => "http.request",
            Error::Api { .. } | Error::EmptyResponse { .. } | Error::DeserializationError(..) => {
                "http.response"
            }
            Error::RateLimitExceeded {
                retry_after,
                attempts,
                ..
            } => {
                data.insert("attempts".to_string(), Value::from(*attempts));
                if let Some(retry) = retry_after {
                    data.insert("retry_after_secs".to_string(), Value::from(retry.as_secs()));
                }
                "xero.rate_limit"
            }
            Error::NotFound { entity, .. } | Error::MissingIdentifier { entity } => {
                data.insert("entity".to_string(), Value::from(entity.as_str()));
                "xero.entity"
            }
            Error::MalformedTimestamp { input, .. } => {
                data.insert("input".to_string(), Value::from(input.as_str()));
                "xero.decode"
            }
            Error::OAuth2(_) => "auth",
            Error::Cancelled => "xero.cancelled",
            Error::InvalidEndpoint { .. } | Error::InvalidHeader { .. } | Error::Serialization(_) => {
                "xero.request"
            }
        };

        Breadcrumb {
            ty: "error".to_string(),
            category: Some(category.to_string()),
            message: Some(error.to_string()),
            data,
            level: sentry_core::Level::Error,
            ..Default::default()
        }
    }
}

/// Extracts the error's context for use as Sentry extras.
///
/// ```ignore
/// use sentry::configure_scope;
/// use xero_access::sentry_integration::error_to_sentry_context;
///
/// if let Err(e) = client.entities::<Invoices>().find_all(&Filters::new()).await {
///     configure_scope(|scope| {
///         for (key, value) in error_to_sentry_context(&e) {
///             scope.set_extra(&key, value);
///         }
///     });
/// }
/// ```
pub fn error_to_sentry_context(error: &Error) -> BTreeMap<String, Value> {
    let mut context = BTreeMap::new();

    if let Some(span_trace) = error.span_trace() {
        context.insert(
            "xero.span_trace".to_string(),
            Value::from(format!("{span_trace}")),
        );
    }

    if let Some(url) = error.url() {
        context.insert("xero.url".to_string(), Value::from(url));
    }

    if let Some(status) = error.status_code() {
        context.insert("xero.status_code".to_string(), Value::from(status.as_u16()));
    }

    if let Some(body) = error.response_body() {
        // Truncate for Sentry
        let truncated: String = if body.chars().count() > 500 {
            format!("{}...", body.chars().take(500).collect::<String>())
        } else {
            body.to_string()
        };
        context.insert("xero.response_body".to_string(), Value::from(truncated));
    }

    context
}
