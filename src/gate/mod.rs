//! Admin authorization gates.
//!
//! The two gates are independent and conjunctive: the edge gate runs before any
//! admin handler, the claims gate after the admin shell mounts. Either one
//! denying access ends in a redirect to [`REDIRECT_TARGET`].

pub mod claims;
pub mod edge;

pub use claims::{authorize, ClaimsGate, Denial, GateState, Navigator, View};
pub use edge::{admin_cookie, decide, edge_gate, evaluate, is_admin_path, EdgeDecision};

/// Path prefix guarded by both gates.
pub const ADMIN_PREFIX: &str = "/admin";

/// Cookie written by the login flow when the session authenticated as admin.
pub const ADMIN_COOKIE: &str = "is_admin";

/// The only cookie value the edge gate accepts.
pub const ADMIN_COOKIE_VALUE: &str = "true";

/// Where every denial goes, whatever the reason.
pub const REDIRECT_TARGET: &str = "/";
