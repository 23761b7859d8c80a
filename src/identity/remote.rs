//! Identity backed by a hosted secure-token endpoint.
//!
//! A refresh exchanges the long-lived refresh token for a new ID token:
//! `POST <token-url>?key=<api-key>` with a form body
//! `grant_type=refresh_token&refresh_token=<token>`. The response carries
//! `id_token`, a rotated `refresh_token` and `user_id`. Claims are read from
//! the JWT payload segment; the signature belongs to the provider and is not
//! re-checked here.

use super::{Claims, IdToken, Identity, IdentityError};
use base64ct::{Base64UrlUnpadded, Encoding};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tracing::{debug, instrument};
use url::Url;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct TokenEndpoint {
    url: Url,
    api_key: SecretString,
    timeout: Duration,
}

impl TokenEndpoint {
    #[must_use]
    pub fn new(url: Url, api_key: SecretString) -> Self {
        Self {
            url,
            api_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build an HTTP client preconfigured for this endpoint.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn client(&self) -> reqwest::Result<Client> {
        Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(self.timeout)
            .build()
    }

    fn refresh_url(&self) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        url
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

pub struct RemoteIdentity {
    client: Client,
    endpoint: Arc<TokenEndpoint>,
    refresh_token: Mutex<SecretString>,
    user_id: Mutex<Option<String>>,
    cached: Mutex<Option<IdToken>>,
}

impl RemoteIdentity {
    #[must_use]
    pub fn new(client: Client, endpoint: Arc<TokenEndpoint>, refresh_token: SecretString) -> Self {
        Self {
            client,
            endpoint,
            refresh_token: Mutex::new(refresh_token),
            user_id: Mutex::new(None),
            cached: Mutex::new(None),
        }
    }

    /// User id reported by the last successful refresh.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh(&self) -> Result<IdToken, IdentityError> {
        let refresh_token = self
            .refresh_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let response = self
            .client
            .post(self.endpoint.refresh_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: RefreshResponse = serde_json::from_slice(&response.bytes().await?)?;
        let claims = decode_claims(&body.id_token)?;
        let token = IdToken::new(SecretString::from(body.id_token), claims);

        if let Some(rotated) = body.refresh_token {
            *self
                .refresh_token
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = SecretString::from(rotated);
        }
        if body.user_id.is_some() {
            *self.user_id.lock().unwrap_or_else(PoisonError::into_inner) = body.user_id;
        }
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

        debug!(subject = token.claims().subject(), "id token refreshed");

        Ok(token)
    }
}

impl Identity for RemoteIdentity {
    #[instrument(skip(self))]
    async fn id_token(&self, force_refresh: bool) -> Result<IdToken, IdentityError> {
        if !force_refresh {
            let cached = self
                .cached
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(token) = cached {
                return Ok(token);
            }
        }
        self.refresh().await
    }
}

/// Decode the claims of a compact JWT (`header.payload.signature`).
///
/// # Errors
/// Returns an error if the token is not three segments, the payload is not
/// base64url, or it does not decode to a JSON object.
pub fn decode_claims(token: &str) -> Result<Claims, IdentityError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(IdentityError::TokenFormat);
    };

    let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('='))
        .map_err(|_| IdentityError::Base64)?;

    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => Ok(Claims::new(map)),
        _ => Err(IdentityError::ClaimsNotObject),
    }
}
