//! Persistence of engine state.
//!
//! [`FillerState`] is the key-value record a host stores with the machine:
//! supply slots, volume bounds (only when initialized), `done`, and the mode
//! ordinal. The byte form is `bitcode` with a versioned header so a host can
//! detect foreign or future data before applying it.

use crate::item::ItemStack;
use crate::volume::Bounds;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a filler state snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xF111_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Engine tick at the time of the save.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

/// The persisted form of a filler engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillerState {
    /// Every supply slot in flat order.
    pub slots: Vec<Option<ItemStack>>,
    /// Present only if the volume was initialized.
    pub volume: Option<Bounds>,
    pub done: bool,
    /// Mode ordinal. Unknown values load as `Mode::Unknown`.
    pub last_mode: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateSnapshot {
    header: SnapshotHeader,
    state: FillerState,
}

/// Encode a state with a header stamped at `tick`.
pub fn encode_state(state: &FillerState, tick: u64) -> Result<Vec<u8>, SerializeError> {
    let snapshot = StateSnapshot {
        header: SnapshotHeader::new(tick),
        state: state.clone(),
    };
    bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode and validate a state produced by [`encode_state`].
pub fn decode_state(data: &[u8]) -> Result<(SnapshotHeader, FillerState), DeserializeError> {
    let snapshot: StateSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok((snapshot.header, snapshot.state))
}
