use std::marker::PhantomData;

use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Client,
    client::Headers,
    endpoints::QueryParameters,
    error::{Error, Result},
};

pub mod bank_transaction;
pub mod contact;
pub mod invoice;
pub mod line_item;
pub mod report;

const APPLICATION_JSON: &str = "application/json";

/// A wire collection such as `{"Invoices": [...]}` that the uniform
/// find/create/update/remove contract operates on.
pub trait Collection: Serialize + DeserializeOwned + Send + Sync {
    type Record;

    /// Path below the API root, e.g. `Invoices`.
    const PATH: &'static str;

    /// Singular name used in errors and logs.
    const ENTITY: &'static str;

    fn records(&self) -> &[Self::Record];

    /// The identifier the API addresses `record` by, if it has one.
    fn identifier(record: &Self::Record) -> Option<String>;

    /// Rewrites legacy `/Date(...)/` fields after decoding.
    fn normalize_timestamps(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A collection the API also accepts writes for: `create`, `update` and
/// `remove` are only available on these.
///
/// Reports are read-only:
///
/// ```compile_fail
/// # async fn example(client: xero_access::Client) {
/// let reports = xero_access::Reports::default();
/// client.entities::<xero_access::Reports>().create(&reports).await;
/// # }
/// ```
pub trait WritableCollection: Collection {}

/// Filters for collection reads.
///
/// Everything except `modified_since` ends up in the query string;
/// `modified_since` is sent as `If-Modified-Since`.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub where_clause: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
    pub modified_since: Option<OffsetDateTime>,
    pub extra: QueryParameters,
}

impl Filters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_modified_since(mut self, since: OffsetDateTime) -> Self {
        self.modified_since = Some(since);
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn query(&self) -> QueryParameters {
        let mut query = self.extra.clone();
        if let Some(clause) = &self.where_clause {
            query.insert("where".to_string(), clause.clone());
        }
        if let Some(order) = &self.order {
            query.insert("order".to_string(), order.clone());
        }
        if let Some(page) = self.page {
            query.insert("page".to_string(), page.to_string());
        }
        query
    }

    pub fn headers(&self) -> Result<Headers> {
        let mut headers = read_headers();
        if let Some(since) = self.modified_since {
            let formatted = since
                .to_offset(time::UtcOffset::UTC)
                .format(&Rfc3339)
                .map_err(|_| Error::InvalidHeader {
                    name: "If-Modified-Since".to_string(),
                })?;
            headers.insert("If-Modified-Since".to_string(), formatted);
        }
        Ok(headers)
    }
}

fn read_headers() -> Headers {
    Headers::from([("Accept".to_string(), APPLICATION_JSON.to_string())])
}

fn write_headers() -> Headers {
    Headers::from([
        ("Accept".to_string(), APPLICATION_JSON.to_string()),
        ("Content-Type".to_string(), APPLICATION_JSON.to_string()),
    ])
}

/// Decodes a collection response and normalizes its timestamps.
pub(crate) fn decode<C: Collection>(bytes: &[u8]) -> Result<C> {
    let mut collection: C = serde_json::from_slice(bytes).map_err(|e| {
        let text = String::from_utf8_lossy(bytes).into_owned();
        error!(entity = C::ENTITY, "failed to deserialize response: {}", e);
        Error::DeserializationError(e, Some(text))
    })?;
    collection.normalize_timestamps()?;
    Ok(collection)
}

/// The uniform operation set for one collection type.
///
/// Every operation is a single request through the client and inherits its
/// rate limiting, throttling retries and error classification.
#[derive(Debug)]
pub struct Entities<'a, C> {
    client: &'a Client,
    _collection: PhantomData<fn() -> C>,
}

impl<'a, C: Collection> Entities<'a, C> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            _collection: PhantomData,
        }
    }

    /// Retrieve a single resource. `identifier` may be the unique ID or an
    /// alternate key such as an invoice number.
    #[instrument(skip(self), fields(entity = C::ENTITY))]
    pub async fn find(&self, identifier: &str) -> Result<C> {
        let url = self.client.endpoint(C::PATH, Some(identifier), None)?;
        let bytes = self
            .client
            .execute(Method::GET, url, &read_headers(), None)
            .await?;
        let collection: C = decode(&bytes)?;
        if collection.records().is_empty() {
            return Err(Error::NotFound {
                entity: C::ENTITY.to_string(),
                identifier: identifier.to_string(),
            });
        }
        Ok(collection)
    }

    /// Retrieve the collection matching `filters`.
    #[instrument(skip(self), fields(entity = C::ENTITY))]
    pub async fn find_all(&self, filters: &Filters) -> Result<C> {
        let bytes = self
            .client
            .find(C::PATH, &filters.headers()?, &filters.query())
            .await?;
        decode(&bytes)
    }

    /// Retrieve resources modified after `since`.
    #[instrument(skip(self, filters), fields(entity = C::ENTITY))]
    pub async fn find_modified_since(&self, since: OffsetDateTime, filters: &Filters) -> Result<C> {
        let filters = filters.clone().with_modified_since(since);
        self.find_all(&filters).await
    }
}

impl<C: WritableCollection> Entities<'_, C> {
    /// Create the records in `collection`. Sending the same collection twice
    /// creates the resources twice.
    #[instrument(skip(self, collection), fields(entity = C::ENTITY))]
    pub async fn create(&self, collection: &C) -> Result<C> {
        let body = serde_json::to_vec(collection).map_err(Error::Serialization)?;
        let bytes = self.client.create(C::PATH, &write_headers(), &body).await?;
        decode(&bytes)
    }

    /// Update the resource identified by the first record. The API honours only
    /// that identifier, so callers should send one record per call.
    #[instrument(skip(self, collection), fields(entity = C::ENTITY))]
    pub async fn update(&self, collection: &C) -> Result<C> {
        let identifier = collection
            .records()
            .first()
            .and_then(C::identifier)
            .ok_or_else(|| Error::MissingIdentifier {
                entity: C::ENTITY.to_string(),
            })?;
        let url = self.client.endpoint(C::PATH, Some(&identifier), None)?;
        let body = serde_json::to_vec(collection).map_err(Error::Serialization)?;
        let bytes = self
            .client
            .execute(Method::POST, url, &write_headers(), Some(&body))
            .await?;
        decode(&bytes)
    }

    /// Delete the resource addressed by `identifier`.
    #[instrument(skip(self), fields(entity = C::ENTITY))]
    pub async fn remove(&self, identifier: &str) -> Result<C> {
        let url = self.client.endpoint(C::PATH, Some(identifier), None)?;
        let bytes = self
            .client
            .execute(Method::DELETE, url, &read_headers(), None)
            .await?;
        decode(&bytes)
    }
}
