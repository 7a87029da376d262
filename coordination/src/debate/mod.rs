//! Round 2 debate: a fixed challenge/response exchange.
//!
//! # Exchange Flow
//!
//! ```text
//! Idle → Challenge → Response → Done
//!   │        │           │
//!   └────────┴───────────┴──→ Aborted (cancellation)
//! ```
//!
//! A failed turn still advances the exchange; it is recorded with its
//! error and whatever text arrived before the failure.

pub mod plan;
pub mod state;

pub use plan::{DebatePairing, DebatePlan};
pub use state::{
    DebateExchange, DebatePhase, DebateTransition, DebateTurn, TransitionError, TurnKind,
};
