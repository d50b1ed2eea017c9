//! The pattern strategy contract and the registry the engine consults.
//!
//! A pattern is an opaque, shared algorithm identified by a stable
//! [`PatternId`]. Each call to [`FillerPattern::iterate`] performs one
//! bounded unit of work inside the volume and reports whether the whole job
//! is complete. Patterns keep no per-job state between calls; progress is
//! read back from the world on the next call.
//!
//! Pattern instances are owned by the registry and shared with engines as
//! [`SharedPattern`] handles. Engines persist and sync only the id.

use std::fmt;
use std::sync::Arc;

use crate::fixed::Ticks;
use crate::id::PatternId;
use crate::item::ItemStack;
use crate::supply::MaterialSupply;
use crate::volume::Bounds;
use crate::world::WorldCells;

/// Everything a pattern may touch during one step.
pub struct PatternContext<'a> {
    /// The box being transformed.
    pub bounds: &'a Bounds,
    /// Cell access for reads and writes.
    pub world: &'a mut dyn WorldCells,
    /// Tick of the engine invoking the pattern.
    pub tick: Ticks,
}

/// One bounded unit of transformation work per call.
pub trait FillerPattern: fmt::Debug + Send + Sync {
    /// Stable id. Must never be [`PatternId::NONE`].
    fn id(&self) -> PatternId;

    /// Human-readable name for logs and debugging.
    fn name(&self) -> &str;

    /// Perform one unit of work. `stack` is the first non-empty consumable
    /// stack, if any; a pattern that places material shrinks it. Returns
    /// `true` once nothing remains to be done.
    fn iterate(&self, ctx: &mut PatternContext<'_>, stack: Option<&mut ItemStack>) -> bool;
}

/// Registry-owned pattern handle.
pub type SharedPattern = Arc<dyn FillerPattern>;

/// Same pattern, judged by id.
pub fn same_pattern(a: Option<&SharedPattern>, b: Option<&SharedPattern>) -> bool {
    a.map(|p| p.id()) == b.map(|p| p.id())
}

/// The external lookup that selects and resolves patterns.
pub trait PatternRegistry: fmt::Debug {
    /// Best match for the current supply contents, if any.
    fn find_matching(&self, supply: &MaterialSupply) -> Option<SharedPattern>;

    /// Resolve a persisted or synced id. `PatternId::NONE` resolves to `None`.
    fn resolve(&self, id: PatternId) -> Option<SharedPattern>;
}
