//! Bearer credentials for the access layer.
//!
//! Token lifecycle stays with the caller: this module only performs the
//! client-credentials exchange. A refreshed token is handed to the client
//! with [`Client::set_access_token`](crate::Client::set_access_token).

use oauth2::{AccessToken, ClientId, ClientSecret, Scope, TokenResponse, TokenUrl, basic::BasicClient};

use crate::error::{Error, Result};

pub const XERO_TOKEN_URL: &str = "https://identity.xero.com/connect/token";

/// Stores the OAuth 2 client ID and client secret.
#[derive(Debug, Clone)]
pub struct KeyPair(pub(crate) ClientId, pub(crate) Option<ClientSecret>);

impl KeyPair {
    /// Creates a new `KeyPair` from the provided `client_id` and `client_secret` strings.
    #[must_use]
    pub fn new(client_id: String, client_secret: Option<String>) -> Self {
        Self(ClientId::new(client_id), client_secret.map(ClientSecret::new))
    }

    /// Creates a new `KeyPair` from `XERO_CLIENT_ID` and `XERO_CLIENT_SECRET`
    /// environment variables. Returns `None` when `XERO_CLIENT_ID` is unset.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("XERO_CLIENT_ID").ok()?;
        Some(Self::new(client_id, std::env::var("XERO_CLIENT_SECRET").ok()))
    }
}

/// Exchanges the key pair for an access token using the client-credentials grant.
#[instrument(skip(key_pair))]
pub async fn client_credentials_token(key_pair: KeyPair, scopes: &[String]) -> Result<AccessToken> {
    let token_url = TokenUrl::new(XERO_TOKEN_URL.to_string()).map_err(|source| {
        Error::InvalidEndpoint {
            path: XERO_TOKEN_URL.to_string(),
            source,
        }
    })?;

    let KeyPair(client_id, client_secret) = key_pair;
    let client = BasicClient::new(client_id).set_token_uri(token_url);
    let client = match client_secret {
        Some(secret) => client.set_client_secret(secret),
        None => client,
    };

    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(Error::Transport)?;

    let token = client
        .exchange_client_credentials()
        .add_scopes(scopes.iter().cloned().map(Scope::new))
        .request_async(&http_client)
        .await?;

    debug!(expires_in = ?token.expires_in(), "obtained access token");
    Ok(token.access_token().clone())
}
