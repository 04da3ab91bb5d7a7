use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use oauth2::AccessToken;
use parking_lot::RwLock;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backoff::{self, Backoff, Throttle};
use crate::config::ClientConfig;
use crate::endpoints::{self, QueryParameters};
use crate::entities::{Collection, Entities};
use crate::error::{Error, Result};
use crate::oauth::{self, KeyPair};
use crate::rate_limit::{HEADER_RATE_LIMIT_PROBLEM, RateLimitInfo, RateLimiter};
use crate::tenant::TenantId;

const HEADER_TENANT_ID: HeaderName = HeaderName::from_static("xero-tenant-id");

/// Operation-specific headers such as `Accept` or `If-Modified-Since`.
pub type Headers = BTreeMap<String, String>;

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    user_agent: HeaderValue,
    access_token: RwLock<AccessToken>,
    limiter: RateLimiter,
    backoff: Backoff,
}

/// This is the client that is used for interacting with the Xero API. It attaches
/// the bearer credential and the tenant to every request, keeps each tenant under
/// the per-minute budget and retries throttled requests.
///
/// Cloning is cheap. Clones share the transport and the rate registry, so handles
/// for several tenants (see [`Client::with_tenant`]) are tracked independently but
/// through one registry.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    tenant: TenantId,
    cancel: CancellationToken,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("tenant", &self.tenant)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for `tenant` using a bearer token supplied by the caller.
    pub fn new(
        access_token: AccessToken,
        tenant: impl Into<TenantId>,
        config: ClientConfig,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(Error::Transport)?;
        let user_agent =
            HeaderValue::from_str(&config.user_agent).map_err(|_| Error::InvalidHeader {
                name: header::USER_AGENT.to_string(),
            })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: endpoints::parse_base(&config.base_url)?,
                user_agent,
                access_token: RwLock::new(access_token),
                limiter: RateLimiter::new(config.rate_limit),
                backoff: Backoff::new(config.backoff),
            }),
            tenant: tenant.into(),
            cancel: CancellationToken::new(),
        })
    }

    /// Obtains a token through the client-credentials grant and creates a client with it.
    #[instrument(skip(key_pair, config))]
    pub async fn from_client_credentials(
        key_pair: KeyPair,
        scopes: &[String],
        tenant: TenantId,
        config: ClientConfig,
    ) -> Result<Self> {
        let token = oauth::client_credentials_token(key_pair, scopes).await?;
        Self::new(token, tenant, config)
    }

    /// Replaces the bearer token used for subsequent requests on every clone.
    pub fn set_access_token(&self, access_token: AccessToken) {
        *self.inner.access_token.write() = access_token;
    }

    /// Sets the tenant for this handle.
    pub fn set_tenant(&mut self, tenant: impl Into<TenantId>) {
        self.tenant = tenant.into();
        trace!(tenant = %self.tenant, "updating tenant id");
    }

    /// A handle for another tenant sharing this client's transport and rate registry.
    #[must_use]
    pub fn with_tenant(&self, tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: tenant.into(),
            ..self.clone()
        }
    }

    /// A handle whose requests abort with [`Error::Cancelled`] once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Access a collection through the uniform find/create/update/remove contract.
    #[must_use]
    pub fn entities<C: Collection>(&self) -> Entities<'_, C> {
        Entities::new(self)
    }

    /// Perform an authenticated `GET` against `path` with `query` encoded into the URL.
    #[instrument(skip(self, headers, query), fields(tenant = %self.tenant))]
    pub async fn find(
        &self,
        path: &str,
        headers: &Headers,
        query: &QueryParameters,
    ) -> Result<Vec<u8>> {
        let url = self.endpoint(path, None, Some(query))?;
        self.execute(Method::GET, url, headers, None).await
    }

    /// Perform an authenticated `PUT` creating the resources in `body`.
    #[instrument(skip(self, headers, body), fields(tenant = %self.tenant))]
    pub async fn create(&self, path: &str, headers: &Headers, body: &[u8]) -> Result<Vec<u8>> {
        let url = self.endpoint(path, None, None)?;
        self.execute(Method::PUT, url, headers, Some(body)).await
    }

    /// Perform an authenticated `POST` updating the resource at `path`.
    #[instrument(skip(self, headers, body), fields(tenant = %self.tenant))]
    pub async fn update(&self, path: &str, headers: &Headers, body: &[u8]) -> Result<Vec<u8>> {
        let url = self.endpoint(path, None, None)?;
        self.execute(Method::POST, url, headers, Some(body)).await
    }

    /// Perform an authenticated `DELETE` against `path`.
    #[instrument(skip(self, headers), fields(tenant = %self.tenant))]
    pub async fn remove(&self, path: &str, headers: &Headers) -> Result<Vec<u8>> {
        let url = self.endpoint(path, None, None)?;
        self.execute(Method::DELETE, url, headers, None).await
    }

    /// The URL for `path` below the API root, with `identifier` appended as one
    /// encoded segment.
    pub(crate) fn endpoint(
        &self,
        path: &str,
        identifier: Option<&str>,
        query: Option<&QueryParameters>,
    ) -> Result<Url> {
        endpoints::resolve(&self.inner.base_url, path, identifier, query)
    }

    #[instrument(skip_all, fields(tenant = %self.tenant, %method, %url))]
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: Url,
        headers: &Headers,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut retries = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let delay = self.inner.limiter.delay_for(&self.tenant, Instant::now());
            if !delay.is_zero() {
                debug!(?delay, "request window full, delaying");
                backoff::sleep_unless_cancelled(delay, &self.cancel).await?;
            }

            // Built after the gate: the token may be replaced while waiting.
            let request = self.build_request(method.clone(), url.clone(), headers, body)?;

            trace!(%method, %url, "sending request");
            let sent = tokio::select! {
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                sent = self.inner.http.execute(request) => sent,
            };
            self.inner.limiter.record(&self.tenant, Instant::now());
            let response = sent.map_err(Error::Transport)?;

            let status = response.status();
            debug!(%status, %url, "received response");
            RateLimitInfo::from_response_headers(response.headers()).log_if_near_limit();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let problem = response
                    .headers()
                    .get(HEADER_RATE_LIMIT_PROBLEM)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                match self.inner.backoff.on_throttled(response.headers(), retries) {
                    Throttle::Retry(wait) => {
                        warn!(?problem, ?wait, retries, "rate limited, retrying");
                        backoff::sleep_unless_cancelled(wait, &self.cancel).await?;
                        retries += 1;
                        continue;
                    }
                    Throttle::Exhausted(wait) => {
                        warn!(?problem, retries, "rate limited, retries exhausted");
                        let response_body = response.text().await.ok();
                        return Err(Error::RateLimitExceeded {
                            retry_after: Some(wait),
                            attempts: retries,
                            url: url.to_string(),
                            response_body,
                        });
                    }
                    Throttle::Unhandled => {
                        warn!(?problem, "rate limited without Retry-After");
                    }
                }
            }

            return Self::classify(response).await;
        }
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        headers: &Headers,
        body: Option<&[u8]>,
    ) -> Result<reqwest::Request> {
        let mut header_map = HeaderMap::with_capacity(headers.len() + 3);
        header_map.insert(header::USER_AGENT, self.inner.user_agent.clone());
        header_map.insert(
            HEADER_TENANT_ID,
            HeaderValue::from_str(self.tenant.as_str()).map_err(|_| Error::InvalidHeader {
                name: HEADER_TENANT_ID.to_string(),
            })?,
        );
        for (name, value) in headers {
            let invalid = || Error::InvalidHeader { name: name.clone() };
            header_map.insert(
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?,
                HeaderValue::from_str(value).map_err(|_| invalid())?,
            );
        }

        let token = self.inner.access_token.read().secret().clone();
        let mut builder = self
            .inner
            .http
            .request(method, url)
            .bearer_auth(token)
            .headers(header_map);
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }
        builder.build().map_err(Error::Transport)
    }

    async fn classify(response: reqwest::Response) -> Result<Vec<u8>> {
        let status = response.status();
        let url = response.url().to_string();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %url, "unexpected response status");
            return Err(Error::api(status, url, body));
        }

        let body = response.bytes().await.map_err(Error::Transport)?;
        debug!("response body size: {} bytes", body.len());
        if body.is_empty() {
            return Err(Error::EmptyResponse { url });
        }
        trace!(body = %String::from_utf8_lossy(&body), "response body");
        Ok(body.to_vec())
    }
}
