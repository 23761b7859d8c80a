//! Admin shell: the server-side mount point of the claims gate.
//!
//! Flow Overview: the edge gate has already checked the `is_admin` cookie by
//! the time this handler runs. The handler builds a per-request identity from
//! the bearer refresh token (none when the header is missing), mounts a
//! claims gate against it and waits for it to settle. Authorized requests get
//! the shell document; every denial becomes a redirect to `/`.

use crate::{
    gate::{ClaimsGate, Navigator, View, ADMIN_PREFIX, REDIRECT_TARGET},
    identity::{RemoteIdentity, SessionHub, TokenEndpoint},
};
use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Redirect, Response},
};
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared state for the admin shell.
#[derive(Clone, Debug)]
pub struct AdminState {
    client: Client,
    endpoint: Arc<TokenEndpoint>,
}

impl AdminState {
    /// # Errors
    /// Returns an error if the HTTP client for the token endpoint cannot be built.
    pub fn new(endpoint: TokenEndpoint) -> reqwest::Result<Self> {
        let client = endpoint.client()?;
        Ok(Self {
            client,
            endpoint: Arc::new(endpoint),
        })
    }

    fn identity(&self, refresh_token: SecretString) -> RemoteIdentity {
        RemoteIdentity::new(self.client.clone(), self.endpoint.clone(), refresh_token)
    }
}

/// Document rendered for authorized admins.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminShell {
    pub section: String,
    pub subject: Option<String>,
    pub email: Option<String>,
}

/// Captures the gate's redirect so the handler can turn it into a response.
#[derive(Clone, Default)]
struct PendingRedirect(Arc<Mutex<Option<String>>>);

impl PendingRedirect {
    fn target(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for PendingRedirect {
    fn navigate(&self, path: &str) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.to_string());
    }
}

pub async fn shell(
    Extension(state): Extension<Arc<AdminState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let identity = extract_bearer_token(&headers).map(|token| Arc::new(state.identity(token)));
    let provider = SessionHub::with_current(identity);
    let redirect = PendingRedirect::default();

    let mut gate = ClaimsGate::mount(&provider, redirect.clone());
    gate.settle().await;

    let section = section(uri.path());
    let view = gate.render(|claims| AdminShell {
        section,
        subject: claims.subject().map(ToString::to_string),
        email: claims.email().map(ToString::to_string),
    });

    match view {
        View::Content(shell) => (StatusCode::OK, Json(shell)).into_response(),
        View::Loading | View::Nothing => {
            let target = redirect
                .target()
                .unwrap_or_else(|| REDIRECT_TARGET.to_string());
            Redirect::temporary(&target).into_response()
        }
    }
}

fn section(path: &str) -> String {
    path.strip_prefix(ADMIN_PREFIX)
        .unwrap_or(path)
        .trim_matches('/')
        .to_string()
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<SecretString> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(SecretString::from(token.to_string()))
    }
}
