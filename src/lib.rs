//! # xero-access
//!
//! A rate-limited, throttling-aware access layer for the Xero accounting API.
//!
//! Every request made through a [`Client`] is:
//!
//! - held back while its tenant has already sent 60 requests in the last
//!   rolling minute,
//! - retried after the server-supplied `Retry-After` delay when Xero answers
//!   `429 Too Many Requests`,
//! - classified into an [`Error`] kind carrying the response body when it fails.
//!
//! Entity collections share one find/create/update/remove contract through
//! [`Entities`], and legacy `/Date(...)/` timestamps in responses are rewritten
//! to RFC 3339 on decode.
//!
//! ```no_run
//! # async fn example() -> xero_access::Result<()> {
//! use oauth2::AccessToken;
//! use xero_access::{Client, ClientConfig, Filters, Invoices};
//!
//! let client = Client::new(
//!     AccessToken::new("token".to_string()),
//!     "ed0b6f5b-2c8b-4c9b-9f2f-4bb1d0a6e2a1",
//!     ClientConfig::from_env(),
//! )?;
//! let invoices = client
//!     .entities::<Invoices>()
//!     .find_all(&Filters::new().with_where("Status==\"AUTHORISED\""))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Sentry Integration
//!
//! Errors include async span traces that capture the call stack at the point
//! of error creation. Set up tracing with `ErrorLayer` so they are captured:
//!
//! ```ignore
//! use tracing_subscriber::prelude::*;
//! use tracing_error::ErrorLayer;
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(ErrorLayer::default())
//!     .with(sentry::integrations::tracing::layer())
//!     .init();
//! ```
//!
//! With the `sentry` feature enabled, errors also convert into breadcrumbs.

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate tracing;

pub mod backoff;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod entities;
pub mod error;
pub mod oauth;
pub mod rate_limit;
pub mod tenant;
pub mod utils;

#[cfg(feature = "sentry")]
pub mod sentry_integration;

pub use client::{Client, Headers};
pub use config::{BackoffConfig, ClientConfig, RateLimitConfig};
pub use endpoints::QueryParameters;
pub use entities::{
    Collection, Entities, Filters, WritableCollection,
    bank_transaction::{BankAccount, BankTransaction, BankTransactions},
    contact::{Contact, Contacts},
    invoice::{Invoice, Invoices},
    line_item::{LineAmountType, LineItem},
    report::{Report, ReportKind, Reports},
};
pub use error::{Error, Result};
pub use oauth::KeyPair;
pub use rate_limit::{RateLimitInfo, RateLimiter};
pub use tenant::TenantId;

// Re-export SpanTrace for users who want to access it
pub use tracing_error::SpanTrace;
