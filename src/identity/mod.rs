//! Identity provider seam consumed by the Claims Gate.
//!
//! Flow Overview: a provider notifies subscribers whenever the signed-in
//! identity changes (`Some(identity)` or `None`). An identity can produce an ID
//! token whose decoded claims carry the custom `admin` flag. Subscriptions are
//! released when the returned [`Subscription`] is dropped.

mod hub;
mod remote;

pub use hub::SessionHub;
pub use remote::{RemoteIdentity, TokenEndpoint, decode_claims};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, future::Future, sync::Arc};
use thiserror::Error;

/// Custom claim that marks an identity as an administrator.
pub const ADMIN_CLAIM: &str = "admin";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint rejected the refresh with status {status}")]
    Rejected { status: u16 },
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("token claims are not a json object")]
    ClaimsNotObject,
}

/// Key/value assertions embedded in a signed identity token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    #[must_use]
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// True only for the JSON boolean `true`; `"true"`, `1` and `null` do not count.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.0.get(ADMIN_CLAIM), Some(Value::Bool(true)))
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }
}

/// A decoded ID token. The raw value stays secret.
#[derive(Clone)]
pub struct IdToken {
    token: SecretString,
    claims: Claims,
}

impl IdToken {
    #[must_use]
    pub fn new(token: SecretString, claims: Claims) -> Self {
        Self { token, claims }
    }

    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    #[must_use]
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdToken")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}

/// A signed-in identity.
pub trait Identity: Send + Sync + 'static {
    /// Return an ID token. With `force_refresh` the provider is always asked
    /// for a fresh token and any cached one is ignored.
    fn id_token(
        &self,
        force_refresh: bool,
    ) -> impl Future<Output = Result<IdToken, IdentityError>> + Send;
}

/// Callback invoked on every identity-state change.
pub type Listener<I> = Box<dyn Fn(Option<Arc<I>>) + Send + Sync>;

/// Source of identity-state change notifications.
pub trait IdentityProvider {
    type Identity: Identity;

    /// Register `listener`; it stays registered until the returned
    /// [`Subscription`] is dropped.
    fn subscribe(&self, listener: Listener<Self::Identity>) -> Subscription;
}

/// Scoped registration returned by [`IdentityProvider::subscribe`].
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
