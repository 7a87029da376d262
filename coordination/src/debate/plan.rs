//! Who debates whom.
//!
//! The default plan is a single exchange between the first two roster
//! participants. A plan may list more pairings; each one runs as its own
//! challenge/response exchange, in order.

use serde::{Deserialize, Serialize};

use crate::roster::{roster, ParticipantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebatePairing {
    pub challenger: ParticipantId,
    pub responder: ParticipantId,
}

impl DebatePairing {
    pub fn new(challenger: ParticipantId, responder: ParticipantId) -> Self {
        Self {
            challenger,
            responder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebatePlan {
    pub pairings: Vec<DebatePairing>,
}

impl DebatePlan {
    pub fn new(pairings: Vec<DebatePairing>) -> Self {
        Self { pairings }
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }
}

impl Default for DebatePlan {
    /// First roster participant challenges the second.
    fn default() -> Self {
        let members = roster();
        Self::new(vec![DebatePairing::new(members[0].id, members[1].id)])
    }
}
