//! Energy gate for the filler job engine.
//!
//! An [`EnergyGate`] is an accumulating pool of energy with a fixed capacity.
//! An outside power-distribution collaborator charges it through
//! [`EnergyGate::receive`]; the job engine only reads the stored amount and
//! withdraws from it through [`EnergyGate::try_consume`].
//!
//! # Design
//!
//! - All amounts are [`Energy`] (Q32.32 fixed point) so throttling is
//!   deterministic across platforms.
//! - `0 <= stored <= capacity` holds after every public call.
//! - Withdrawal is test-and-withdraw: either the whole admitted amount is
//!   taken or nothing is.
//! - Charging is rate limited per tick. [`EnergyGate::begin_tick`] opens a
//!   new receive window and applies passive loss (perdition), if any.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Q32.32 fixed-point energy amount.
pub type Energy = I32F32;

/// Shorthand for building an [`Energy`] from an integer.
#[inline]
pub fn energy(v: i32) -> Energy {
    Energy::from_num(v)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Capacity and transfer limits of an [`EnergyGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyConfig {
    /// Maximum amount the pool can hold.
    pub capacity: Energy,
    /// Maximum amount accepted through `receive` within one tick.
    pub max_receive: Energy,
    /// Maximum amount handed out by a single `try_consume` call.
    pub max_extract: Energy,
    /// Smallest withdrawal the gate will honor. Requests whose admissible
    /// amount falls below this are refused.
    pub min_extract: Energy,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            capacity: energy(100),
            max_receive: energy(50),
            max_extract: energy(100),
            min_extract: energy(25),
        }
    }
}

impl EnergyConfig {
    /// Check that the limits are consistent.
    pub fn validate(&self) -> Result<(), EnergyConfigError> {
        let zero = Energy::ZERO;
        if self.capacity <= zero {
            return Err(EnergyConfigError::NonPositiveCapacity(self.capacity));
        }
        if self.max_receive < zero || self.max_extract < zero || self.min_extract < zero {
            return Err(EnergyConfigError::NegativeLimit);
        }
        if self.min_extract > self.max_extract {
            return Err(EnergyConfigError::MinAboveMax {
                min: self.min_extract,
                max: self.max_extract,
            });
        }
        Ok(())
    }
}

/// Passive loss: `loss` is removed from the pool every `interval` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perdition {
    pub loss: Energy,
    /// Ticks between losses. Zero is treated as one.
    pub interval: u32,
}

/// Errors raised when configuring a gate with inconsistent limits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnergyConfigError {
    #[error("capacity must be positive, got {0}")]
    NonPositiveCapacity(Energy),
    #[error("transfer limits must not be negative")]
    NegativeLimit,
    #[error("min_extract {min} exceeds max_extract {max}")]
    MinAboveMax { min: Energy, max: Energy },
}

// ---------------------------------------------------------------------------
// Energy gate
// ---------------------------------------------------------------------------

/// An accumulating energy pool with admission control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyGate {
    config: EnergyConfig,
    perdition: Option<Perdition>,
    stored: Energy,
    /// Amount accepted since the last `begin_tick`.
    received_this_tick: Energy,
    /// Ticks elapsed since perdition last applied.
    ticks_since_loss: u32,
}

impl Default for EnergyGate {
    fn default() -> Self {
        Self::new(EnergyConfig::default())
    }
}

impl EnergyGate {
    /// Create an empty gate with the given limits.
    ///
    /// The limits are not validated here; call [`EnergyConfig::validate`]
    /// first or use [`EnergyGate::configure`].
    pub fn new(config: EnergyConfig) -> Self {
        Self {
            config,
            perdition: None,
            stored: Energy::ZERO,
            received_this_tick: Energy::ZERO,
            ticks_since_loss: 0,
        }
    }

    /// Replace the limits. Stored energy above the new capacity is discarded.
    pub fn configure(&mut self, config: EnergyConfig) -> Result<(), EnergyConfigError> {
        config.validate()?;
        self.config = config;
        self.stored = self.stored.min(config.capacity);
        Ok(())
    }

    /// Set or clear passive loss.
    pub fn configure_perdition(&mut self, perdition: Option<Perdition>) {
        self.perdition = perdition;
        self.ticks_since_loss = 0;
    }

    pub fn config(&self) -> &EnergyConfig {
        &self.config
    }

    pub fn perdition(&self) -> Option<Perdition> {
        self.perdition
    }

    /// Energy currently in the pool.
    pub fn stored(&self) -> Energy {
        self.stored
    }

    pub fn capacity(&self) -> Energy {
        self.config.capacity
    }

    /// Whether at least `amount` is stored.
    pub fn has(&self, amount: Energy) -> bool {
        self.stored >= amount
    }

    /// Offer energy to the pool. Returns the amount accepted, limited by the
    /// remaining headroom and by what is left of this tick's receive window.
    pub fn receive(&mut self, amount: Energy) -> Energy {
        let zero = Energy::ZERO;
        if amount <= zero {
            return zero;
        }
        let headroom = self.config.capacity - self.stored;
        let window = (self.config.max_receive - self.received_this_tick).max(zero);
        let accepted = amount.min(headroom).min(window).max(zero);
        self.stored += accepted;
        self.received_this_tick += accepted;
        accepted
    }

    /// Open a new tick: reset the receive window and apply perdition.
    pub fn begin_tick(&mut self) {
        self.received_this_tick = Energy::ZERO;

        let Some(perdition) = self.perdition else {
            return;
        };
        self.ticks_since_loss += 1;
        if self.ticks_since_loss >= perdition.interval.max(1) {
            self.ticks_since_loss = 0;
            let lost = perdition.loss.max(Energy::ZERO).min(self.stored);
            self.stored -= lost;
            if lost > Energy::ZERO {
                trace!(%lost, stored = %self.stored, "perdition applied");
            }
        }
    }

    /// Withdraw up to `cost`, but only if at least `minimum` can be supplied.
    ///
    /// The admissible amount is `min(cost, stored, max_extract)`. If it is
    /// below `minimum` (or below the configured `min_extract`) nothing is
    /// withdrawn and zero is returned.
    pub fn try_consume(&mut self, cost: Energy, minimum: Energy) -> Energy {
        let zero = Energy::ZERO;
        if cost <= zero {
            return zero;
        }
        let admissible = cost.min(self.stored).min(self.config.max_extract);
        if admissible < minimum || admissible < self.config.min_extract {
            return zero;
        }
        self.stored -= admissible;
        admissible
    }
}

// ===========================================================================
// Tests
// ===========================================================================
