//! External On/Off/Loop control.
//!
//! The mode changes only when an outside trigger is delivered. Triggers are
//! a closed set; anything that is not one of the three machine-control
//! triggers is accepted and ignored.

use serde::{Deserialize, Serialize};

/// The engine's run mode. Persisted as its ordinal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    /// No trigger seen yet. Runs like `On` until a trigger says otherwise,
    /// except that it never auto-restarts.
    #[default]
    Unknown = 0,
    /// Run the current job to completion once.
    On = 1,
    /// Never run. In-flight progress is kept.
    Off = 2,
    /// Restart the job whenever it completes.
    Loop = 3,
}

impl Mode {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decode a persisted ordinal. Out-of-range values fall back to
    /// `Unknown`; the second value reports whether that happened.
    pub fn from_ordinal(ordinal: u8) -> (Mode, bool) {
        match ordinal {
            0 => (Mode::Unknown, false),
            1 => (Mode::On, false),
            2 => (Mode::Off, false),
            3 => (Mode::Loop, false),
            _ => (Mode::Unknown, true),
        }
    }
}

/// A discrete trigger delivered from outside (a gate, a redstone signal, a
/// remote command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    MachineOn,
    MachineOff,
    MachineLoop,
    /// Any trigger that does not control the machine.
    Other(u32),
}

impl Trigger {
    /// The mode this trigger selects, if it is a machine-control trigger.
    pub fn target_mode(self) -> Option<Mode> {
        match self {
            Trigger::MachineOn => Some(Mode::On),
            Trigger::MachineOff => Some(Mode::Off),
            Trigger::MachineLoop => Some(Mode::Loop),
            Trigger::Other(_) => None,
        }
    }
}

/// Holds the current mode and applies triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeController {
    mode: Mode,
}

impl ModeController {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Every trigger is allowed.
    pub fn allows(&self, _trigger: Trigger) -> bool {
        true
    }

    /// Apply a trigger. Returns the previous mode if it changed.
    pub fn apply(&mut self, trigger: Trigger) -> Option<Mode> {
        let target = trigger.target_mode()?;
        if target == self.mode {
            return None;
        }
        Some(std::mem::replace(&mut self.mode, target))
    }

    /// Whether a completed job should be restarted.
    pub fn restarts(&self) -> bool {
        self.mode == Mode::Loop
    }

    /// Whether steps may run at all.
    pub fn suspended(&self) -> bool {
        self.mode == Mode::Off
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        let c = ModeController::default();
        assert_eq!(c.mode(), Mode::Unknown);
        assert!(!c.restarts());
        assert!(!c.suspended());
    }

    #[test]
    fn machine_triggers_select_modes() {
        let mut c = ModeController::default();
        assert_eq!(c.apply(Trigger::MachineLoop), Some(Mode::Unknown));
        assert!(c.restarts());
        assert_eq!(c.apply(Trigger::MachineOff), Some(Mode::Loop));
        assert!(c.suspended());
        assert_eq!(c.apply(Trigger::MachineOn), Some(Mode::Off));
        assert_eq!(c.mode(), Mode::On);
    }

    #[test]
    fn repeated_trigger_reports_no_change() {
        let mut c = ModeController::new(Mode::On);
        assert_eq!(c.apply(Trigger::MachineOn), None);
        assert_eq!(c.mode(), Mode::On);
    }

    #[test]
    fn other_triggers_allowed_but_ignored() {
        let mut c = ModeController::new(Mode::Loop);
        assert!(c.allows(Trigger::Other(42)));
        assert_eq!(c.apply(Trigger::Other(42)), None);
        assert_eq!(c.mode(), Mode::Loop);
    }

    #[test]
    fn ordinals_round_trip() {
        for mode in [Mode::Unknown, Mode::On, Mode::Off, Mode::Loop] {
            assert_eq!(Mode::from_ordinal(mode.ordinal()), (mode, false));
        }
    }

    #[test]
    fn unknown_ordinal_clamps_to_unknown() {
        assert_eq!(Mode::from_ordinal(4), (Mode::Unknown, true));
        assert_eq!(Mode::from_ordinal(255), (Mode::Unknown, true));
    }
}
