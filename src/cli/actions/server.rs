use crate::{api, identity::TokenEndpoint};
use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub token_url: String,
    pub api_key: SecretString,
    pub token_timeout_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token endpoint is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let token_url = Url::parse(&args.token_url)
        .with_context(|| format!("Invalid token URL: {}", args.token_url))?;

    let endpoint = TokenEndpoint::new(token_url, args.api_key)
        .with_timeout_seconds(args.token_timeout_seconds);

    debug!("Token endpoint: {:?}", endpoint);

    let admin_state =
        api::AdminState::new(endpoint).context("Failed to build token endpoint client")?;

    api::new(args.port, admin_state).await
}
