//! Request-intercepting cookie check for `/admin/*`.
//!
//! Flow Overview: non-admin paths forward untouched. Admin paths forward only
//! when the `is_admin` cookie is exactly `"true"`; everything else gets a
//! temporary redirect to `/`. The gate reads cookies and never writes them.
//!
//! Security boundaries: the cookie is set by client code and carries no
//! signature, so this is a fast path only. The claims gate is the
//! authoritative check.

use super::{ADMIN_COOKIE, ADMIN_COOKIE_VALUE, ADMIN_PREFIX, REDIRECT_TARGET};
use axum::{
    extract::Request,
    http::{header::COOKIE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EdgeDecision {
    Forward,
    Redirect,
}

/// `/admin` itself or anything below `/admin/`.
#[must_use]
pub fn is_admin_path(path: &str) -> bool {
    path.strip_prefix(ADMIN_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Value of the first `is_admin` cookie across all `Cookie` headers.
#[must_use]
pub fn admin_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == ADMIN_COOKIE).then(|| val.trim())
        })
}

/// Pure decision over the request path and the `is_admin` cookie value.
#[must_use]
pub fn evaluate(path: &str, cookie: Option<&str>) -> EdgeDecision {
    if !is_admin_path(path) || cookie == Some(ADMIN_COOKIE_VALUE) {
        EdgeDecision::Forward
    } else {
        EdgeDecision::Redirect
    }
}

#[must_use]
pub fn decide(path: &str, headers: &HeaderMap) -> EdgeDecision {
    evaluate(path, admin_cookie(headers))
}

/// axum middleware applying [`decide`] to every request it wraps.
pub async fn edge_gate(request: Request, next: Next) -> Response {
    let decision = decide(request.uri().path(), request.headers());
    match decision {
        EdgeDecision::Forward => next.run(request).await,
        EdgeDecision::Redirect => {
            debug!(path = request.uri().path(), "admin cookie missing, redirecting");
            Redirect::temporary(REDIRECT_TARGET).into_response()
        }
    }
}
