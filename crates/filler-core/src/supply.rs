//! Material supply: the slots feeding a filler job.
//!
//! The supply is two semantic containers behind one flat slot numbering:
//!
//! - **Grid** (`0..grid_len`) -- single structural items laid out as a
//!   pattern recipe. Only whitelisted materials are admitted, and only into
//!   empty slots.
//! - **Input** (`grid_len..len`) -- consumable stacks of any material, capped
//!   at `stack_limit` per slot.
//!
//! Which region a face of the machine reaches is decided by
//! [`side_to_region`] alone. The supply never recomputes patterns itself;
//! the engine wraps every mutation and recomputes afterwards.

use std::ops::Range;

use crate::id::MaterialId;
use crate::item::ItemStack;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sides and regions
// ---------------------------------------------------------------------------

/// A face of the machine, in ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Side {
    pub fn all() -> [Side; 6] {
        [
            Side::Down,
            Side::Up,
            Side::North,
            Side::South,
            Side::West,
            Side::East,
        ]
    }
}

/// The two slot regions of a supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Grid,
    Input,
}

/// The top face reaches the grid; every other face reaches the input.
pub fn side_to_region(side: Side) -> Region {
    match side {
        Side::Up => Region::Grid,
        _ => Region::Input,
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Shape and admission rules of a supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyLayout {
    pub grid_slots: usize,
    pub input_slots: usize,
    pub stack_limit: u32,
    /// Materials admitted to the grid region.
    pub grid_whitelist: Vec<MaterialId>,
}

impl Default for SupplyLayout {
    fn default() -> Self {
        Self {
            grid_slots: 9,
            input_slots: 27,
            stack_limit: 64,
            grid_whitelist: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupplyError {
    #[error("slot {slot} out of range (supply has {len} slots)")]
    SlotOutOfRange { slot: usize, len: usize },
    #[error("slot {slot} is not reachable from side {side:?}")]
    NotAccessible { slot: usize, side: Side },
    #[error("slot {slot} rejects {stack:?}")]
    Rejected { slot: usize, stack: ItemStack },
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// Ordered single-item slots with a placement whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRegion {
    slots: Vec<Option<MaterialId>>,
    whitelist: Vec<MaterialId>,
}

impl GridRegion {
    fn new(len: usize, whitelist: Vec<MaterialId>) -> Self {
        Self {
            slots: vec![None; len],
            whitelist,
        }
    }

    pub fn slots(&self) -> &[Option<MaterialId>] {
        &self.slots
    }

    pub fn admits(&self, index: usize, material: MaterialId) -> bool {
        matches!(self.slots.get(index), Some(None)) && self.whitelist.contains(&material)
    }
}

/// Ordered stackable slots with a per-slot cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRegion {
    slots: Vec<Option<ItemStack>>,
    stack_limit: u32,
}

impl InputRegion {
    fn new(len: usize, stack_limit: u32) -> Self {
        Self {
            slots: vec![None; len],
            stack_limit,
        }
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn stack_limit(&self) -> u32 {
        self.stack_limit
    }

    /// Index of the first non-empty stack, in slot order.
    pub fn first_non_empty(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| !s.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// Material supply
// ---------------------------------------------------------------------------

/// Grid and input regions addressed by one flat slot index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSupply {
    grid: GridRegion,
    input: InputRegion,
}

impl Default for MaterialSupply {
    fn default() -> Self {
        Self::new(&SupplyLayout::default())
    }
}

impl MaterialSupply {
    pub fn new(layout: &SupplyLayout) -> Self {
        Self {
            grid: GridRegion::new(layout.grid_slots, layout.grid_whitelist.clone()),
            input: InputRegion::new(layout.input_slots, layout.stack_limit),
        }
    }

    /// Total number of slots.
    pub fn len(&self) -> usize {
        self.grid.slots.len() + self.input.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.slots.iter().all(Option::is_none) && self.input.slots.iter().all(Option::is_none)
    }

    pub fn grid(&self) -> &GridRegion {
        &self.grid
    }

    pub fn input(&self) -> &InputRegion {
        &self.input
    }

    /// Flat slot range of a region.
    pub fn region_slots(&self, region: Region) -> Range<usize> {
        let grid_len = self.grid.slots.len();
        match region {
            Region::Grid => 0..grid_len,
            Region::Input => grid_len..self.len(),
        }
    }

    /// Slot range reachable from a face.
    pub fn accessible_slots(&self, side: Side) -> Range<usize> {
        self.region_slots(side_to_region(side))
    }

    fn locate(&self, slot: usize) -> Result<(Region, usize), SupplyError> {
        let grid_len = self.grid.slots.len();
        if slot < grid_len {
            Ok((Region::Grid, slot))
        } else if slot < self.len() {
            Ok((Region::Input, slot - grid_len))
        } else {
            Err(SupplyError::SlotOutOfRange {
                slot,
                len: self.len(),
            })
        }
    }

    /// Contents of a slot. Grid slots report a stack of one.
    pub fn get(&self, slot: usize) -> Option<ItemStack> {
        match self.locate(slot).ok()? {
            (Region::Grid, i) => self.grid.slots[i].map(|m| ItemStack::new(m, 1)),
            (Region::Input, i) => self.input.slots[i].clone(),
        }
    }

    /// Replace a slot's contents. Counts above the region's cap (one for the
    /// grid, `stack_limit` for the input) are dropped; the number dropped is
    /// returned. Empty stacks clear the slot.
    pub fn set(&mut self, slot: usize, stack: Option<ItemStack>) -> Result<u32, SupplyError> {
        let (region, i) = self.locate(slot)?;
        let mut stack = stack.filter(|s| !s.is_empty());
        let mut dropped = 0;
        match region {
            Region::Grid => {
                if let Some(s) = stack.as_mut() {
                    dropped = s.truncate(1);
                }
                self.grid.slots[i] = stack.map(|s| s.material);
            }
            Region::Input => {
                if let Some(s) = stack.as_mut() {
                    dropped = s.truncate(self.input.stack_limit);
                }
                self.input.slots[i] = stack;
            }
        }
        Ok(dropped)
    }

    /// Remove up to `amount` items from a slot. The slot is cleared when it
    /// runs out.
    pub fn decrease(&mut self, slot: usize, amount: u32) -> Result<Option<ItemStack>, SupplyError> {
        let (region, i) = self.locate(slot)?;
        if amount == 0 {
            return Ok(None);
        }
        let taken = match region {
            Region::Grid => self.grid.slots[i].take().map(|m| ItemStack::new(m, 1)),
            Region::Input => {
                let entry = &mut self.input.slots[i];
                let taken = entry.as_mut().map(|s| s.split(amount));
                if entry.as_ref().is_some_and(ItemStack::is_empty) {
                    *entry = None;
                }
                taken
            }
        };
        Ok(taken.filter(|s| !s.is_empty()))
    }

    /// Empty a slot entirely, returning what it held.
    pub fn take(&mut self, slot: usize) -> Result<Option<ItemStack>, SupplyError> {
        let (region, i) = self.locate(slot)?;
        Ok(match region {
            Region::Grid => self.grid.slots[i].take().map(|m| ItemStack::new(m, 1)),
            Region::Input => self.input.slots[i].take(),
        })
    }

    /// Whether `stack` may be placed into `slot`, regardless of face.
    pub fn is_valid_for_slot(&self, slot: usize, stack: &ItemStack) -> bool {
        match self.locate(slot) {
            Ok((Region::Grid, i)) => self.grid.admits(i, stack.material),
            Ok((Region::Input, _)) => true,
            Err(_) => false,
        }
    }

    pub fn can_insert(&self, slot: usize, stack: &ItemStack, side: Side) -> bool {
        self.accessible_slots(side).contains(&slot) && self.is_valid_for_slot(slot, stack)
    }

    /// Extraction is allowed from any slot a face reaches.
    pub fn can_extract(&self, slot: usize, side: Side) -> bool {
        self.accessible_slots(side).contains(&slot)
    }

    /// Insert through a face. Input slots merge with a stack of the same
    /// material up to the cap; the count that did not fit is returned.
    pub fn insert(&mut self, slot: usize, stack: ItemStack, side: Side) -> Result<u32, SupplyError> {
        if !self.accessible_slots(side).contains(&slot) {
            self.locate(slot)?;
            return Err(SupplyError::NotAccessible { slot, side });
        }
        if stack.is_empty() {
            return Ok(0);
        }
        if !self.is_valid_for_slot(slot, &stack) {
            return Err(SupplyError::Rejected { slot, stack });
        }
        match self.locate(slot)? {
            (Region::Grid, i) => {
                self.grid.slots[i] = Some(stack.material);
                Ok(stack.count - 1)
            }
            (Region::Input, i) => {
                let limit = self.input.stack_limit;
                let entry = &mut self.input.slots[i];
                if let Some(existing) = entry.as_mut() {
                    if existing.material != stack.material {
                        return Err(SupplyError::Rejected { slot, stack });
                    }
                    let moved = limit.saturating_sub(existing.count).min(stack.count);
                    existing.count += moved;
                    return Ok(stack.count - moved);
                }
                let moved = limit.min(stack.count);
                *entry = Some(ItemStack::new(stack.material, moved));
                Ok(stack.count - moved)
            }
        }
    }

    /// Flat index of the first input slot holding a non-empty stack.
    pub fn first_consumable(&self) -> Option<usize> {
        self.input
            .first_non_empty()
            .map(|i| i + self.grid.slots.len())
    }

    /// Mutable access to an input stack by flat index. Grid slots are never
    /// handed out mutably.
    pub fn consumable_mut(&mut self, slot: usize) -> Option<&mut ItemStack> {
        match self.locate(slot).ok()? {
            (Region::Input, i) => self.input.slots[i].as_mut(),
            (Region::Grid, _) => None,
        }
    }

    /// Clear a slot whose stack has run out. Returns whether it was cleared.
    pub fn clear_if_exhausted(&mut self, slot: usize) -> bool {
        if let Ok((Region::Input, i)) = self.locate(slot) {
            if self.input.slots[i].as_ref().is_some_and(ItemStack::is_empty) {
                self.input.slots[i] = None;
                return true;
            }
        }
        false
    }

    /// Every slot in flat order, for persistence.
    pub fn to_slots(&self) -> Vec<Option<ItemStack>> {
        (0..self.len()).map(|slot| self.get(slot)).collect()
    }

    /// Replace every slot from a flat list. Extra entries are ignored and
    /// missing entries leave slots empty. Counts are capped as in [`set`].
    ///
    /// [`set`]: MaterialSupply::set
    pub fn restore_slots(&mut self, slots: &[Option<ItemStack>]) {
        self.grid.slots.fill(None);
        self.input.slots.fill(None);
        let (grid, input) = slots.split_at(self.grid.slots.len().min(slots.len()));

        for (entry, stack) in self.grid.slots.iter_mut().zip(grid) {
            *entry = stack.as_ref().filter(|s| !s.is_empty()).map(|s| s.material);
        }
        let limit = self.input.stack_limit;
        for (entry, stack) in self.input.slots.iter_mut().zip(input) {
            *entry = stack.clone().filter(|s| !s.is_empty()).map(|mut s| {
                s.truncate(limit);
                s
            });
        }
    }
}
