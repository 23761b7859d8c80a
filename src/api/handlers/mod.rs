//! HTTP handlers for the public landing page, health and the admin shell.

pub mod admin;
pub mod health;
pub mod root;
