//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{identity, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let identity_opts = identity::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        token_url: identity_opts.token_url,
        api_key: identity_opts.api_key,
        token_timeout_seconds: identity_opts.timeout_seconds,
    }))
}
