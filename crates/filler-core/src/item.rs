use crate::id::MaterialId;
use serde::{Deserialize, Serialize};

/// A stack of one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: MaterialId,
    pub count: u32,
}

impl ItemStack {
    pub fn new(material: MaterialId, count: u32) -> Self {
        Self { material, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Split off up to `amount` items into a new stack. The returned stack
    /// may be empty.
    pub fn split(&mut self, amount: u32) -> ItemStack {
        let taken = amount.min(self.count);
        self.count -= taken;
        ItemStack::new(self.material, taken)
    }

    /// Remove up to `amount` items. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn shrink(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.count);
        self.count -= taken;
        taken
    }

    /// Clamp the count to `limit`. Returns how many items were dropped.
    pub fn truncate(&mut self, limit: u32) -> u32 {
        let excess = self.count.saturating_sub(limit);
        self.count -= excess;
        excess
    }
}
