//! Per-run event bus.
//!
//! Provides pub/sub messaging over a Tokio broadcast channel. Each run
//! owns its own bus, so independent runs never share event state.
//! Ordering within a run is the publish order; `sequence` makes it
//! explicit for consumers.
//!
//! Broadcast subscribers share a bounded ring and can lag. A run's
//! primary consumer takes a lossless sink instead, which buffers every
//! event until read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;
use uuid::Uuid;

use super::types::{EventEnvelope, RoundtableEvent};

/// Default channel capacity for broadcast
pub const DEFAULT_CAPACITY: usize = 1024;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Event bus with broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    run_id: Uuid,
    sequence: AtomicU64,
    sinks: Mutex<Vec<mpsc::UnboundedSender<EventEnvelope>>>,
}

impl EventBus {
    /// Create a bus for a new run with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus whose lagging subscribers keep up to `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            run_id: Uuid::new_v4(),
            sequence: AtomicU64::new(0),
            sinks: Mutex::new(Vec::new()),
        }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stamp and broadcast an event.
    ///
    /// Having no subscribers is not an error. Sinks receive every event;
    /// broadcast subscribers that fall behind the ring lose the oldest.
    pub fn publish(&self, event: RoundtableEvent) {
        // Sequence stamping and sink delivery share the lock so sinks see
        // events in sequence order.
        let mut sinks = self.sinks.lock().unwrap_or_else(|e| e.into_inner());
        let envelope = EventEnvelope {
            run_id: self.run_id,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            event,
            timestamp: Utc::now(),
        };
        let event_type = envelope.event_type();

        sinks.retain(|sink| sink.send(envelope.clone()).is_ok());
        drop(sinks);

        match self.sender.send(envelope) {
            Ok(receivers) => trace!(event_type, receivers, "Event published"),
            Err(_) => trace!(event_type, "Event published (no receivers)"),
        }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Subscribe with unbounded buffering. The receiver yields `None`
    /// once [`close_sinks`](Self::close_sinks) runs and it is drained.
    pub fn subscribe_lossless(&self) -> mpsc::UnboundedReceiver<EventEnvelope> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sender);
        receiver
    }

    /// Detach every lossless sink, ending their streams after the
    /// events already buffered.
    pub fn close_sinks(&self) {
        self.sinks.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Subscribe, yielding only events that match `filter`
    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of events published so far
    pub fn published(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only these event types, when set
    pub event_types: Option<Vec<String>>,
    /// Drop incremental chunk events
    pub skip_chunks: bool,
}

impl EventFilter {
    /// Create a new empty filter (matches all events)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by event types
    pub fn types(mut self, event_types: Vec<&str>) -> Self {
        self.event_types = Some(event_types.into_iter().map(String::from).collect());
        self
    }

    /// Drop `*_chunk` events
    pub fn without_chunks(mut self) -> Self {
        self.skip_chunks = true;
        self
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &RoundtableEvent) -> bool {
        if self.skip_chunks && event.is_chunk() {
            return false;
        }

        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| t == event.event_type()) {
                return false;
            }
        }

        true
    }
}

/// Filtered event receiver that only yields matching events
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<EventEnvelope>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn new(receiver: broadcast::Receiver<EventEnvelope>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<EventEnvelope, broadcast::error::RecvError> {
        loop {
            let envelope = self.receiver.recv().await?;
            if self.filter.matches(&envelope.event) {
                return Ok(envelope);
            }
        }
    }
}

/// Drain everything currently buffered in `receiver`, skipping over lag.
pub fn drain(receiver: &mut broadcast::Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(envelope) => events.push(envelope),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

/// Drain everything currently buffered in a lossless sink.
pub fn drain_sink(receiver: &mut mpsc::UnboundedReceiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    while let Ok(envelope) = receiver.try_recv() {
        events.push(envelope);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::ParticipantId;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(RoundtableEvent::status("initialization", "hello"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "status");
        assert_eq!(received.run_id, bus.run_id());
        assert_eq!(received.sequence, 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new().shared();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(RoundtableEvent::DebateComplete {
            message: "done".into(),
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1, e2);
    }

    #[test]
    fn test_publish_without_receivers_is_ok() {
        let bus = EventBus::new();
        bus.publish(RoundtableEvent::status("complete", "done"));
        bus.publish(RoundtableEvent::status("complete", "done"));
        assert_eq!(bus.published(), 2);
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::new()
            .types(vec!["message_chunk", "agent_error"])
            .without_chunks();

        let chunk = RoundtableEvent::MessageChunk {
            agent: ParticipantId::Director,
            content: "x".into(),
        };
        let error = RoundtableEvent::AgentError {
            agent: ParticipantId::Director,
            error: "boom".into(),
        };
        let status = RoundtableEvent::status("round1_start", "go");

        assert!(!filter.matches(&chunk));
        assert!(filter.matches(&error));
        assert!(!filter.matches(&status));
    }

    #[tokio::test]
    async fn test_filtered_receiver_skips_chunks() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_filtered(EventFilter::new().without_chunks());

        bus.publish(RoundtableEvent::SynthesisChunk {
            content: "partial".into(),
        });
        bus.publish(RoundtableEvent::SynthesisComplete {
            optimized_prompt: "full".into(),
            character_count: 4,
        });

        let next = rx.recv().await.unwrap();
        assert_eq!(next.event_type(), "synthesis_complete");
        assert_eq!(next.sequence, 1);
    }

    #[tokio::test]
    async fn test_sink_keeps_what_the_ring_drops() {
        let bus = EventBus::with_capacity(4);
        let mut ring = bus.subscribe();
        let mut sink = bus.subscribe_lossless();

        for i in 0..20 {
            bus.publish(RoundtableEvent::SynthesisChunk {
                content: i.to_string(),
            });
        }
        bus.close_sinks();

        assert!(matches!(
            ring.recv().await,
            Err(broadcast::error::RecvError::Lagged(16))
        ));

        let mut sequences = Vec::new();
        while let Some(envelope) = sink.recv().await {
            sequences.push(envelope.sequence);
        }
        assert_eq!(sequences, (0..20).collect::<Vec<u64>>());
    }

    #[test]
    fn test_dropped_sink_is_pruned() {
        let bus = EventBus::new();
        let sink = bus.subscribe_lossless();
        drop(sink);
        bus.publish(RoundtableEvent::status("complete", "done"));
        assert!(bus.sinks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_separate_buses_are_independent() {
        let a = EventBus::new();
        let b = EventBus::new();
        let mut rx_a = a.subscribe();
        b.publish(RoundtableEvent::status("complete", "b only"));
        assert!(drain(&mut rx_a).is_empty());
        assert_ne!(a.run_id(), b.run_id());
    }
}
