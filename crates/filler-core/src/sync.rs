//! The minimal state mirrored to observers.
//!
//! Observers (remote renderers) never run patterns. They receive a
//! [`SyncPayload`] whenever the authoritative engine changes in a way they
//! can see, and a full description on (re)connect, and rebuild the rest
//! (the resolved pattern handle, boundary markers) locally.

use serde::{Deserialize, Serialize};

use crate::id::PatternId;
use crate::serialize::{DeserializeError, SerializeError};
use crate::volume::Bounds;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Volume bounds, absent while uninitialized.
    pub bounds: Option<Bounds>,
    pub pattern_id: PatternId,
    pub done: bool,
}

impl SyncPayload {
    /// Encode for the transport.
    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode bytes received from the transport.
    pub fn decode(data: &[u8]) -> Result<Self, DeserializeError> {
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
    }
}
