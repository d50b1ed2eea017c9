//! Serde data file structs for filler configuration.
//!
//! Energy amounts are written as plain decimals in data files and converted
//! to fixed point by the loader.

use serde::Deserialize;

// ===========================================================================
// Engine
// ===========================================================================

/// Engine settings as written in `engine.{ron,toml,json}`. Every field is
/// optional in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineData {
    pub step_cost: f64,
    pub capacity: f64,
    pub max_receive: f64,
    pub max_extract: f64,
    pub min_extract: f64,
    pub perdition: Option<PerditionData>,
    pub stack_limit: u32,
    pub grid_slots: usize,
    pub input_slots: usize,
    /// Material ids admitted to the grid region. Leaving this out closes the
    /// grid; validation logs a warning when that happens.
    pub grid_whitelist: Vec<u32>,
}

impl Default for EngineData {
    fn default() -> Self {
        Self {
            step_cost: 25.0,
            capacity: 100.0,
            max_receive: 50.0,
            max_extract: 100.0,
            min_extract: 25.0,
            perdition: None,
            stack_limit: 64,
            grid_slots: 9,
            input_slots: 27,
            grid_whitelist: Vec::new(),
        }
    }
}

/// Passive energy loss.
#[derive(Debug, Clone, Deserialize)]
pub struct PerditionData {
    pub loss: f64,
    pub interval: u32,
}

// ===========================================================================
// Patterns
// ===========================================================================

/// One recipe row in `patterns.{ron,toml,json}`: a grid layout bound to a
/// registered pattern name.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRecipeData {
    pub pattern: String,
    /// Material id per grid slot in slot order. `0` is an empty slot.
    pub grid: Vec<u32>,
}
