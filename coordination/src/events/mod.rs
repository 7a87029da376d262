//! Event-driven progress reporting for a roundtable run
//!
//! # Architecture
//!
//! 1. **Event Types** (`types.rs`): one variant per progress event a
//!    live client understands, plus the stamped `EventEnvelope`.
//!
//! 2. **Event Bus** (`bus.rs`): Tokio broadcast-based pub/sub, one bus
//!    per run, any number of subscribers.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Pipeline   │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │ (UI, logger) │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{
    drain, drain_sink, EventBus, EventFilter, FilteredReceiver, SharedEventBus, DEFAULT_CAPACITY,
};
pub use types::{EventEnvelope, RoundtableEvent};
