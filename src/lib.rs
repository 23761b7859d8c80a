//! # Gatehouse (admin route authorization)
//!
//! `gatehouse` protects an admin area behind two independent checks that must
//! both pass for a user to keep access across a navigation.
//!
//! ## Edge Gate
//!
//! Runs on every request under `/admin/*` before any handler. It trusts the
//! boolean `is_admin` cookie written by the login flow: exactly `"true"`
//! forwards, anything else redirects to `/`. It never writes cookies.
//!
//! > **Warning:** the cookie is client-settable and unsigned. It is a fast
//! > path, not a security boundary.
//!
//! ## Claims Gate
//!
//! Runs once the admin shell mounts. It waits for the first identity-state
//! event, force-refreshes the identity token and requires the custom claim
//! `admin: true`. Missing sessions, missing claims and refresh failures all end
//! in the same redirect to `/`; only the logs tell them apart.

pub mod api;
pub mod cli;
pub mod gate;
pub mod identity;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
