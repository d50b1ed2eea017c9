//! Events queued by the engine for its host.
//!
//! The engine never talks to renderers or the network directly. State
//! transitions push [`EngineEvent`]s onto an outbox that the host drains
//! after each call with `FillerEngine::drain_events`. Only transitions
//! produce events; a call that changes nothing queues nothing.

use crate::id::PatternId;
use crate::mode::Mode;
use crate::sync::SyncPayload;
use crate::volume::Bounds;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The host cell should be redrawn / its state re-read.
    Refresh,
    /// Push this payload to every observer.
    Sync(SyncPayload),
    /// Create the visual boundary for a newly initialized volume.
    MarkersCreated { bounds: Bounds },
    /// Remove the visual boundary.
    MarkersRemoved,
    /// The active pattern changed.
    PatternChanged { from: PatternId, to: PatternId },
    /// The active pattern reported completion.
    JobCompleted { pattern: PatternId },
    /// An external trigger changed the mode.
    ModeChanged { from: Mode, to: Mode },
}

impl EngineEvent {
    pub fn is_sync(&self) -> bool {
        matches!(self, EngineEvent::Sync(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_events_are_recognized() {
        let payload = SyncPayload {
            bounds: None,
            pattern_id: PatternId::NONE,
            done: true,
        };
        assert!(EngineEvent::Sync(payload).is_sync());
        assert!(!EngineEvent::Refresh.is_sync());
    }
}
