//! Shared fixtures: a fake secure-token endpoint and request helpers.

#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use gatehouse::{api::AdminState, identity::TokenEndpoint};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::{net::TcpListener, task::JoinHandle};
use url::Url;

pub const API_KEY: &str = "test-api-key";

/// Refresh tokens understood by the fake endpoint.
pub const ADMIN_REFRESH: &str = "refresh-admin";
pub const USER_REFRESH: &str = "refresh-user";
pub const BROKEN_REFRESH: &str = "refresh-broken";
pub const GARBLED_REFRESH: &str = "refresh-garbled";

pub fn jwt(claims: &Value) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

#[derive(Clone, Default)]
struct Counters {
    hits: Arc<AtomicUsize>,
    seen: Arc<std::sync::Mutex<Vec<String>>>,
}

async fn token(
    State(counters): State<Counters>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    counters.hits.fetch_add(1, Ordering::SeqCst);

    if query.get("key").map(String::as_str) != Some(API_KEY) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if form.get("grant_type").map(String::as_str) != Some("refresh_token") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let refresh = form.get("refresh_token").cloned().unwrap_or_default();
    if let Ok(mut seen) = counters.seen.lock() {
        seen.push(refresh.clone());
    }

    // Rotated tokens keep their role so repeated refreshes stay stable.
    let role = refresh.split('#').next().unwrap_or_default().to_string();
    let rotated = format!("{role}#{}", counters.hits.load(Ordering::SeqCst));

    let claims = match role.as_str() {
        ADMIN_REFRESH => json!({"sub": "uid-admin", "email": "admin@example.com", "admin": true}),
        USER_REFRESH => json!({"sub": "uid-user", "email": "user@example.com", "admin": false}),
        GARBLED_REFRESH => {
            return Json(json!({"id_token": "not-a-jwt", "user_id": "uid-x"})).into_response();
        }
        BROKEN_REFRESH => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };

    Json(json!({
        "id_token": jwt(&claims),
        "refresh_token": rotated,
        "user_id": claims["sub"],
        "expires_in": "3600",
    }))
    .into_response()
}

/// A running fake token endpoint.
pub struct TokenServer {
    pub addr: SocketAddr,
    counters: Counters,
    handle: JoinHandle<()>,
}

impl TokenServer {
    pub async fn start() -> Result<Self> {
        let counters = Counters::default();
        let app = Router::new()
            .route("/v1/token", post(token))
            .with_state(counters.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind fake token endpoint")?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            counters,
            handle,
        })
    }

    pub fn url(&self) -> Result<Url> {
        Url::parse(&format!("http://{}/v1/token", self.addr)).context("invalid token url")
    }

    pub fn endpoint(&self) -> Result<TokenEndpoint> {
        Ok(
            TokenEndpoint::new(self.url()?, SecretString::from(API_KEY.to_string()))
                .with_timeout_seconds(5),
        )
    }

    pub fn admin_state(&self) -> Result<AdminState> {
        AdminState::new(self.endpoint()?).context("failed to build admin state")
    }

    pub fn hits(&self) -> usize {
        self.counters.hits.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.counters
            .seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl Drop for TokenServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An admin state whose token endpoint is never reachable.
pub fn offline_admin_state() -> Result<AdminState> {
    let url = Url::parse("http://127.0.0.1:9/v1/token")?;
    AdminState::new(TokenEndpoint::new(url, SecretString::from(API_KEY.to_string())))
        .context("failed to build admin state")
}
