//! Both gates end to end, against a fake secure-token endpoint over HTTP.

mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, COOKIE, LOCATION},
        Request, StatusCode,
    },
    response::Response,
};
use common::{TokenServer, ADMIN_REFRESH, BROKEN_REFRESH, GARBLED_REFRESH, USER_REFRESH};
use gatehouse::{
    api::{router, AdminShell},
    gate::{ClaimsGate, GateState, View},
    identity::{decode_claims, Identity, IdentityError, RemoteIdentity, SessionHub},
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;

async fn send(
    server: &TokenServer,
    path: &str,
    cookie: Option<&str>,
    refresh: Option<&str>,
) -> Result<Response> {
    let app = router(server.admin_state()?);
    let mut request = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    if let Some(refresh) = refresh {
        request = request.header(AUTHORIZATION, format!("Bearer {refresh}"));
    }
    Ok(app.oneshot(request.body(Body::empty())?).await?)
}

fn assert_redirect_home(response: &Response) {
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/")
    );
}

fn remote(server: &TokenServer, refresh: &str) -> Result<RemoteIdentity> {
    let endpoint = Arc::new(server.endpoint()?);
    Ok(RemoteIdentity::new(
        endpoint.client()?,
        endpoint,
        SecretString::from(refresh.to_string()),
    ))
}

#[tokio::test]
async fn admin_cookie_and_admin_claim_render_shell() -> Result<()> {
    let server = TokenServer::start().await?;
    let response = send(
        &server,
        "/admin/settings",
        Some("is_admin=true"),
        Some(ADMIN_REFRESH),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let shell: AdminShell = serde_json::from_slice(&body)?;
    assert_eq!(
        shell,
        AdminShell {
            section: "settings".to_string(),
            subject: Some("uid-admin".to_string()),
            email: Some("admin@example.com".to_string()),
        }
    );
    assert_eq!(server.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn admin_cookie_without_admin_claim_redirects() -> Result<()> {
    let server = TokenServer::start().await?;
    let response = send(
        &server,
        "/admin/settings",
        Some("is_admin=true"),
        Some(USER_REFRESH),
    )
    .await?;

    assert_redirect_home(&response);
    assert_eq!(server.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn refresh_failures_redirect() -> Result<()> {
    let server = TokenServer::start().await?;
    for refresh in [BROKEN_REFRESH, GARBLED_REFRESH, "unknown"] {
        let response = send(&server, "/admin", Some("is_admin=true"), Some(refresh)).await?;
        assert_redirect_home(&response);
    }
    Ok(())
}

#[tokio::test]
async fn edge_gate_runs_before_any_refresh() -> Result<()> {
    let server = TokenServer::start().await?;
    let response = send(&server, "/admin/settings", None, Some(ADMIN_REFRESH)).await?;

    assert_redirect_home(&response);
    assert_eq!(server.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn remote_identity_force_refresh_bypasses_cache() -> Result<()> {
    let server = TokenServer::start().await?;
    let identity = remote(&server, ADMIN_REFRESH)?;

    let first = identity.id_token(true).await?;
    assert!(first.claims().is_admin());
    assert_eq!(&decode_claims(first.token().expose_secret())?, first.claims());
    assert_eq!(identity.user_id().as_deref(), Some("uid-admin"));

    let cached = identity.id_token(false).await?;
    assert_eq!(cached.claims(), first.claims());
    assert_eq!(server.hits(), 1);

    identity.id_token(true).await?;
    assert_eq!(server.hits(), 2);

    // The second refresh used the rotated token from the first response.
    let seen = server.seen_refresh_tokens();
    assert_eq!(seen.first().map(String::as_str), Some(ADMIN_REFRESH));
    assert_eq!(seen.get(1).map(String::as_str), Some("refresh-admin#1"));
    Ok(())
}

#[tokio::test]
async fn remote_identity_reports_rejections() -> Result<()> {
    let server = TokenServer::start().await?;
    let identity = remote(&server, BROKEN_REFRESH)?;
    let result = identity.id_token(true).await;
    assert!(matches!(result, Err(IdentityError::Rejected { status: 500 })));

    let identity = remote(&server, GARBLED_REFRESH)?;
    let result = identity.id_token(true).await;
    assert!(matches!(result, Err(IdentityError::TokenFormat)));
    Ok(())
}

#[tokio::test]
async fn claims_gate_over_remote_identity() -> Result<()> {
    let server = TokenServer::start().await?;
    let provider = SessionHub::with_current(Some(Arc::new(remote(&server, ADMIN_REFRESH)?)));

    let redirects = Arc::new(AtomicUsize::new(0));
    let counter = redirects.clone();
    let mut gate = ClaimsGate::mount(&provider, move |_: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(gate.settle().await, GateState::Authorized);
    assert_eq!(
        gate.render(|claims| claims.subject().map(ToString::to_string)),
        View::Content(Some("uid-admin".to_string()))
    );
    assert_eq!(redirects.load(Ordering::SeqCst), 0);

    drop(gate);
    assert_eq!(provider.listener_count(), 0);
    Ok(())
}
