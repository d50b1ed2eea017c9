//! Filler Core -- an energy-gated area-transform job engine.
//!
//! A filler machine owns a rectangular volume and repeatedly applies a
//! pattern (fill, clear, build a shape) to it, one bounded step at a time.
//! Which pattern runs is chosen by the grid region of its material supply;
//! the input region feeds consumable material to the pattern.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::FillerEngine::tick`] advances the machine by one
//! scheduling tick:
//!
//! 1. **Open** -- Open the energy receive window, apply perdition.
//! 2. **Restart** -- Restart a completed job under `Loop`, otherwise idle.
//! 3. **Work** -- Run pattern steps while the full step cost can be paid.
//!
//! State transitions queue [`event::EngineEvent`]s that the host drains and
//! turns into redraws, boundary markers and observer sync.
//!
//! # Key Types
//!
//! - [`engine::FillerEngine`] -- The job engine and tick orchestrator.
//! - [`volume::Volume`] -- The box being transformed; initialized once.
//! - [`supply::MaterialSupply`] -- Grid (recipe) and input (consumable)
//!   slot regions with per-face access.
//! - [`pattern::FillerPattern`] -- The per-step transformation strategy.
//! - [`registry::PatternTable`] -- Immutable grid-recipe to pattern table.
//! - [`mode::ModeController`] -- External On/Off/Loop switch.
//! - [`serialize`] -- Versioned state persistence via bitcode.

pub mod config;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod id;
pub mod item;
pub mod mode;
pub mod pattern;
pub mod registry;
pub mod serialize;
pub mod supply;
pub mod sync;
pub mod volume;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
