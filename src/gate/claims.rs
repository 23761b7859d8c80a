//! Post-mount verification of the `admin` claim.
//!
//! Flow Overview:
//! - `mount` subscribes to identity-state changes; the subscription lives as
//!   long as the gate.
//! - `settle` waits for the first event. No identity denies. A present
//!   identity gets its token force-refreshed and must carry `admin: true`.
//! - The gate leaves `Verifying` exactly once. Later events are ignored.
//! - Every denial navigates to `/` once; the reason only shows up in logs.
//!
//! Dropping a gate while `settle` is pending drops the pending refresh with
//! it, so a late result is never applied. Dropping only the `settle` future
//! keeps the received event; the next `settle` verifies it again.

use super::REDIRECT_TARGET;
use crate::identity::{Claims, Identity, IdentityError, IdentityProvider, Subscription};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateState {
    Verifying,
    Authorized,
    Unauthorized,
}

#[derive(Debug, Error)]
pub enum Denial {
    #[error("no signed-in identity")]
    NoSession,
    #[error("identity lacks the admin claim")]
    MissingClaim { subject: Option<String> },
    #[error("identity verification failed: {0}")]
    VerificationFailure(#[from] IdentityError),
}

/// What the gate lets its owner show.
#[derive(Debug, Eq, PartialEq)]
pub enum View<T> {
    /// Still verifying; show a loading indicator.
    Loading,
    /// Denied; show nothing while the redirect is in flight.
    Nothing,
    Content(T),
}

/// Receiver of the denial redirect.
pub trait Navigator {
    fn navigate(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str),
{
    fn navigate(&self, path: &str) {
        self(path);
    }
}

/// Force-refresh `identity`'s token and require `admin: true`.
///
/// # Errors
/// Returns [`Denial::VerificationFailure`] if the refresh fails and
/// [`Denial::MissingClaim`] if the claim is absent or not `true`.
pub async fn authorize<I: Identity>(identity: &I) -> Result<Claims, Denial> {
    let claims = identity.id_token(true).await?.into_claims();
    if claims.is_admin() {
        Ok(claims)
    } else {
        Err(Denial::MissingClaim {
            subject: claims.subject().map(ToString::to_string),
        })
    }
}

pub struct ClaimsGate<I, N> {
    state: GateState,
    claims: Option<Claims>,
    events: mpsc::UnboundedReceiver<Option<Arc<I>>>,
    // Outer `Some` once the first event arrived, inner is the identity.
    first_event: Option<Option<Arc<I>>>,
    navigator: N,
    _subscription: Subscription,
}

impl<I, N> ClaimsGate<I, N>
where
    I: Identity,
    N: Navigator,
{
    /// Subscribe to `provider` and start in [`GateState::Verifying`].
    pub fn mount<P>(provider: &P, navigator: N) -> Self
    where
        P: IdentityProvider<Identity = I>,
    {
        let (tx, events) = mpsc::unbounded_channel();
        let subscription = provider.subscribe(Box::new(move |identity| {
            // The receiver is closed once the gate settles or unmounts.
            let _ = tx.send(identity);
        }));

        Self {
            state: GateState::Verifying,
            claims: None,
            events,
            first_event: None,
            navigator,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Claims of the verified identity, only once authorized.
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Wait for the first identity event and leave `Verifying`.
    ///
    /// Calling it again after the gate settled returns the terminal state
    /// without touching the provider or the navigator. A call cancelled
    /// mid-refresh can be retried; the retry refreshes the same identity.
    pub async fn settle(&mut self) -> GateState {
        if self.state != GateState::Verifying {
            return self.state;
        }

        if self.first_event.is_none() {
            // A closed channel means the provider dropped us; treat it as signed out.
            let event = self.events.recv().await.flatten();
            self.events.close();
            self.first_event = Some(event);
        }

        let outcome = match self.first_event.clone().flatten() {
            Some(identity) => authorize(identity.as_ref()).await,
            None => Err(Denial::NoSession),
        };
        self.apply(outcome);

        self.state
    }

    fn apply(&mut self, outcome: Result<Claims, Denial>) {
        match outcome {
            Ok(claims) => {
                info!(subject = claims.subject(), "admin claim verified");
                self.claims = Some(claims);
                self.state = GateState::Authorized;
            }
            Err(denial) => {
                match &denial {
                    Denial::NoSession => info!("no signed-in identity, leaving admin area"),
                    Denial::MissingClaim { subject } => {
                        warn!(subject = subject.as_deref(), "identity is not an admin");
                    }
                    Denial::VerificationFailure(err) => {
                        error!("failed to verify admin claim: {err}");
                    }
                }
                self.state = GateState::Unauthorized;
                self.navigator.navigate(REDIRECT_TARGET);
            }
        }
    }

    /// Build the protected content only when authorized.
    pub fn render<T>(&self, children: impl FnOnce(&Claims) -> T) -> View<T> {
        match (self.state, &self.claims) {
            (GateState::Verifying, _) => View::Loading,
            (GateState::Authorized, Some(claims)) => View::Content(children(claims)),
            (GateState::Authorized | GateState::Unauthorized, _) => View::Nothing,
        }
    }
}
