//! Middleware layers for the decision pipeline
//!
//! Three layers compose the pipeline, in request order:
//! session (cookie to record), CSRF guard (mutating requests only), and the
//! authorization gate (classify + decide). The router applies them so the
//! session layer is outermost and the gate innermost; ordering is part of
//! the contract, since a CSRF failure must block even an authenticated
//! request, so the guard runs before the gate.

pub mod csrf;
pub mod gate;
pub mod session;

pub use csrf::{CsrfLayer, CsrfMiddleware};
pub use gate::{outcome_response, redirect_to_login, GateLayer, GateMiddleware};
pub use session::{SessionLayer, SessionMiddleware};
