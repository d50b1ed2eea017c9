//! Numeric types shared across the engine.
//!
//! Energy is Q32.32 fixed point (owned by `filler-power`) so step admission
//! is bit-for-bit deterministic. Ticks count scheduler callbacks.

pub use filler_power::{Energy, energy};

/// Ticks are the atomic unit of scheduling time.
pub type Ticks = u64;

/// How many whole steps of `cost` fit into `stored`. Zero when `cost` is not
/// positive.
#[inline]
pub fn whole_steps(stored: Energy, cost: Energy) -> u32 {
    if cost <= Energy::ZERO || stored < cost {
        return 0;
    }
    stored
        .checked_div(cost)
        .map(|q| q.saturating_to_num::<u32>())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_steps_counts_full_costs_only() {
        assert_eq!(whole_steps(energy(100), energy(25)), 4);
        assert_eq!(whole_steps(energy(99), energy(25)), 3);
        assert_eq!(whole_steps(energy(10), energy(25)), 0);
    }

    #[test]
    fn whole_steps_with_zero_cost_is_zero() {
        assert_eq!(whole_steps(energy(100), Energy::ZERO), 0);
    }
}
