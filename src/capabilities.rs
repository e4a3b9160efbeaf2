use heapless::Vec;

use crate::climate::{ClimateMode, FanMode, SwingMode};

/// What the host lets users request from this unit.
///
/// Built once at startup and handed to the session by value; the session
/// never mutates it. `ClimateMode::Off` is always accepted and does not need
/// to be listed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    modes: Vec<ClimateMode, 8>,
    fan_modes: Vec<FanMode, 8>,
    swing_modes: Vec<SwingMode, 4>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            modes: collect(&[ClimateMode::Cool, ClimateMode::Heat, ClimateMode::Dry, ClimateMode::FanOnly]),
            fan_modes: collect(&[FanMode::Auto, FanMode::Quiet, FanMode::Low, FanMode::Medium, FanMode::High]),
            swing_modes: collect(&[SwingMode::Off, SwingMode::Vertical, SwingMode::Horizontal, SwingMode::Both]),
        }
    }
}

/// Copies `items` into a fixed-capacity set, skipping duplicates and
/// anything past capacity.
fn collect<T: Copy + PartialEq, const N: usize>(items: &[T]) -> Vec<T, N> {
    let mut set = Vec::new();
    for item in items {
        if !set.contains(item) && set.push(*item).is_err() {
            break;
        }
    }
    set
}

impl Capabilities {
    /// Replaces the supported climate modes. `Off` entries are ignored.
    pub fn with_modes(mut self, modes: &[ClimateMode]) -> Self {
        self.modes = collect(modes);
        self.modes.retain(|m| *m != ClimateMode::Off);
        self
    }

    pub fn with_fan_modes(mut self, fan_modes: &[FanMode]) -> Self {
        self.fan_modes = collect(fan_modes);
        self
    }

    pub fn with_swing_modes(mut self, swing_modes: &[SwingMode]) -> Self {
        self.swing_modes = collect(swing_modes);
        self
    }

    pub fn supports_mode(&self, mode: ClimateMode) -> bool {
        mode == ClimateMode::Off || self.modes.contains(&mode)
    }

    pub fn supports_fan_mode(&self, fan: FanMode) -> bool {
        self.fan_modes.contains(&fan)
    }

    pub fn supports_swing_mode(&self, swing: SwingMode) -> bool {
        self.swing_modes.contains(&swing)
    }

    pub fn modes(&self) -> &[ClimateMode] {
        &self.modes
    }

    pub fn fan_modes(&self) -> &[FanMode] {
        &self.fan_modes
    }

    pub fn swing_modes(&self) -> &[SwingMode] {
        &self.swing_modes
    }
}
