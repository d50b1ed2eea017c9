//! The axis-aligned box a filler job operates over.
//!
//! A [`Volume`] starts uninitialized and is initialized exactly once, either
//! from a live [`AreaSource`] (a marker the machine was placed next to) or
//! from persisted [`Bounds`]. Re-initialization requires an explicit
//! [`Volume::reset`].

use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Integer cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Inclusive bounds of a box. Well-formed bounds have `min <= max` on every
/// axis; [`Bounds::new`] enforces this, deserialized bounds may violate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min: CellPos,
    pub max: CellPos,
}

impl Bounds {
    /// Build bounds from explicit min/max corners.
    pub fn new(min: CellPos, max: CellPos) -> Result<Self, VolumeError> {
        let bounds = Self { min, max };
        if !bounds.is_well_formed() {
            return Err(VolumeError::InvertedBounds(bounds));
        }
        Ok(bounds)
    }

    /// Build bounds spanning two arbitrary opposite corners.
    pub fn from_corners(a: CellPos, b: CellPos) -> Self {
        Self {
            min: CellPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: CellPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn size_x(&self) -> u32 {
        self.min.x.abs_diff(self.max.x) + 1
    }

    pub fn size_y(&self) -> u32 {
        self.min.y.abs_diff(self.max.y) + 1
    }

    pub fn size_z(&self) -> u32 {
        self.min.z.abs_diff(self.max.z) + 1
    }

    /// Total number of cells in the box.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.size_x()) * u64::from(self.size_y()) * u64::from(self.size_z())
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Iterate every cell bottom layer first: `y` outermost, then `z`, then `x`.
    pub fn cells(&self) -> impl Iterator<Item = CellPos> + use<> {
        let Bounds { min, max } = *self;
        (min.y..=max.y).flat_map(move |y| {
            (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| CellPos::new(x, y, z)))
        })
    }

    /// Iterate every cell top layer first. Used by removal-style patterns.
    pub fn cells_top_down(&self) -> impl Iterator<Item = CellPos> + use<> {
        let Bounds { min, max } = *self;
        (min.y..=max.y).rev().flat_map(move |y| {
            (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| CellPos::new(x, y, z)))
        })
    }
}

// ---------------------------------------------------------------------------
// Area source
// ---------------------------------------------------------------------------

/// Something that can hand a box to the engine at initialization, such as a
/// set of placed markers.
pub trait AreaSource {
    /// The box this source describes, if it currently describes one.
    fn provide_area(&self) -> Option<Bounds>;

    /// Called once the engine has consumed the area. Markers typically
    /// remove themselves from the world here.
    fn detach(&mut self) {}
}

// ---------------------------------------------------------------------------
// Volume
// ---------------------------------------------------------------------------

/// Errors from explicit volume initialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VolumeError {
    #[error("volume is already initialized to {0:?}")]
    AlreadyInitialized(Bounds),
    #[error("bounds have min above max on some axis: {0:?}")]
    InvertedBounds(Bounds),
}

/// A bounding box with explicit initialized/uninitialized state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Volume {
    bounds: Option<Bounds>,
}

impl Volume {
    /// A fresh, uninitialized volume.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    /// Initialize from explicit bounds.
    pub fn initialize(&mut self, bounds: Bounds) -> Result<(), VolumeError> {
        if let Some(existing) = self.bounds {
            return Err(VolumeError::AlreadyInitialized(existing));
        }
        if !bounds.is_well_formed() {
            return Err(VolumeError::InvertedBounds(bounds));
        }
        debug!(?bounds, "volume initialized");
        self.bounds = Some(bounds);
        Ok(())
    }

    /// Initialize from a live area source and detach the source once
    /// consumed. Returns `Ok(false)` if the source describes no area.
    pub fn initialize_from_area(&mut self, source: &mut dyn AreaSource) -> Result<bool, VolumeError> {
        let Some(bounds) = source.provide_area() else {
            return Ok(false);
        };
        self.initialize(bounds)?;
        source.detach();
        Ok(true)
    }

    /// Restore persisted bounds, replacing any current state. Missing or
    /// malformed bounds leave the volume uninitialized. Returns whether the
    /// volume ended up initialized.
    pub fn restore(&mut self, bounds: Option<Bounds>) -> bool {
        self.bounds = bounds.filter(Bounds::is_well_formed);
        self.bounds.is_some()
    }

    /// Return to the uninitialized state, yielding the previous bounds.
    pub fn reset(&mut self) -> Option<Bounds> {
        self.bounds.take()
    }
}
