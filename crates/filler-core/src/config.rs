//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. Call [`EngineConfig::validate`] before building an engine from
//! untrusted data; `filler-data` does this when loading files.

use filler_power::{EnergyConfig, EnergyConfigError, Perdition};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fixed::{Energy, energy};
use crate::id::MaterialId;
use crate::supply::SupplyLayout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Energy withdrawn for every step. A step runs only if the whole
    /// amount can be withdrawn.
    pub step_cost: Energy,
    pub energy: EnergyConfig,
    pub perdition: Option<Perdition>,
    /// Per-slot cap of the input region.
    pub stack_limit: u32,
    pub grid_slots: usize,
    pub input_slots: usize,
    /// Structural materials admitted to the grid region. Empty by default,
    /// and an empty whitelist closes the grid: no recipe can be laid out
    /// until the host names its structural materials.
    pub grid_whitelist: Vec<MaterialId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_cost: energy(25),
            energy: EnergyConfig::default(),
            perdition: None,
            stack_limit: 64,
            grid_slots: 9,
            input_slots: 27,
            grid_whitelist: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.energy.validate()?;
        if self.step_cost <= Energy::ZERO {
            return Err(ConfigError::NonPositiveStepCost(self.step_cost));
        }
        if self.step_cost > self.energy.capacity {
            return Err(ConfigError::StepCostAboveCapacity {
                cost: self.step_cost,
                capacity: self.energy.capacity,
            });
        }
        if self.step_cost > self.energy.max_extract || self.step_cost < self.energy.min_extract {
            return Err(ConfigError::StepCostNotExtractable(self.step_cost));
        }
        if self.stack_limit == 0 {
            return Err(ConfigError::ZeroStackLimit);
        }
        if self.input_slots == 0 {
            return Err(ConfigError::NoInputSlots);
        }
        if self.grid_closed() {
            warn!(grid_slots = self.grid_slots, "grid whitelist is empty, the grid admits nothing");
        }
        Ok(())
    }

    /// Whether the grid has slots but no material may enter them.
    pub fn grid_closed(&self) -> bool {
        self.grid_slots > 0 && self.grid_whitelist.is_empty()
    }

    /// Supply shape derived from this config.
    pub fn supply_layout(&self) -> SupplyLayout {
        SupplyLayout {
            grid_slots: self.grid_slots,
            input_slots: self.input_slots,
            stack_limit: self.stack_limit,
            grid_whitelist: self.grid_whitelist.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Energy(#[from] EnergyConfigError),
    #[error("step cost must be positive, got {0}")]
    NonPositiveStepCost(Energy),
    #[error("step cost {cost} exceeds energy capacity {capacity}")]
    StepCostAboveCapacity { cost: Energy, capacity: Energy },
    #[error("step cost {0} falls outside the gate's extraction limits")]
    StepCostNotExtractable(Energy),
    #[error("stack limit must be at least 1")]
    ZeroStackLimit,
    #[error("at least one input slot is required")]
    NoInputSlots,
}
