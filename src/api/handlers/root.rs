use axum::{http::StatusCode, response::IntoResponse};

// Public landing page; never gated.
pub async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    )
}
