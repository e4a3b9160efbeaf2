//! The host-facing climate model and its mapping onto CN105 settings.

use crate::protocol::types::{Fan, Mode, Power, Stage, SubMode, TenthDegreesC, Vane, WideVane};
use crate::protocol::{SettingsData, Status, Standby};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClimateMode {
    Off,
    Cool,
    Heat,
    Dry,
    FanOnly,
    /// Heat/cool automatically. Only available when enabled in the
    /// capability set.
    Auto,
}

impl ClimateMode {
    fn from_wire(power: Power, mode: Mode) -> Self {
        match (power, mode) {
            (Power::Off, _) => ClimateMode::Off,
            (Power::On, Mode::Cool) => ClimateMode::Cool,
            (Power::On, Mode::Heat) => ClimateMode::Heat,
            (Power::On, Mode::Dry) => ClimateMode::Dry,
            (Power::On, Mode::Fan) => ClimateMode::FanOnly,
            (Power::On, Mode::Auto) => ClimateMode::Auto,
        }
    }

    fn to_wire(self) -> (Power, Option<Mode>) {
        match self {
            ClimateMode::Off => (Power::Off, None),
            ClimateMode::Cool => (Power::On, Some(Mode::Cool)),
            ClimateMode::Heat => (Power::On, Some(Mode::Heat)),
            ClimateMode::Dry => (Power::On, Some(Mode::Dry)),
            ClimateMode::FanOnly => (Power::On, Some(Mode::Fan)),
            ClimateMode::Auto => (Power::On, Some(Mode::Auto)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FanMode {
    Auto,
    Quiet,
    Low,
    Medium,
    Middle,
    High,
}

impl From<Fan> for FanMode {
    fn from(fan: Fan) -> Self {
        match fan {
            Fan::Auto => FanMode::Auto,
            Fan::Quiet => FanMode::Quiet,
            Fan::F1 => FanMode::Low,
            Fan::F2 => FanMode::Medium,
            Fan::F3 => FanMode::Middle,
            Fan::F4 => FanMode::High,
        }
    }
}

impl From<FanMode> for Fan {
    fn from(fan: FanMode) -> Self {
        match fan {
            FanMode::Auto => Fan::Auto,
            FanMode::Quiet => Fan::Quiet,
            FanMode::Low => Fan::F1,
            FanMode::Medium => Fan::F2,
            FanMode::Middle => Fan::F3,
            FanMode::High => Fan::F4,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SwingMode {
    Off,
    Vertical,
    Horizontal,
    Both,
}

impl SwingMode {
    fn from_axes(vertical: bool, horizontal: bool) -> Self {
        match (vertical, horizontal) {
            (false, false) => SwingMode::Off,
            (true, false) => SwingMode::Vertical,
            (false, true) => SwingMode::Horizontal,
            (true, true) => SwingMode::Both,
        }
    }

    fn vertical(self) -> bool {
        matches!(self, SwingMode::Vertical | SwingMode::Both)
    }

    fn horizontal(self) -> bool {
        matches!(self, SwingMode::Horizontal | SwingMode::Both)
    }

    /// Vane positions that realize this swing mode.
    fn to_vanes(self) -> (Vane, WideVane) {
        (
            if self.vertical() { Vane::Swing } else { Vane::Auto },
            if self.horizontal() { WideVane::Swing } else { WideVane::Center },
        )
    }
}

/// Which optional vane selects the host registered. Vane positions are only
/// tracked for registered selects.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VaneSupport {
    pub vertical: bool,
    pub horizontal: bool,
}

/// The driver's model of the unit. Every field starts unknown.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClimateState {
    pub mode: Option<ClimateMode>,
    pub fan: Option<FanMode>,
    pub swing: Option<SwingMode>,
    pub target_temperature: Option<TenthDegreesC>,
    pub current_temperature: Option<TenthDegreesC>,
    /// Set once the current temperature has not been refreshed within the
    /// remote temperature timeout. The last value is kept.
    pub current_temperature_stale: bool,
    pub compressor_frequency: Option<u8>,
    pub vertical_vane: Option<Vane>,
    pub horizontal_vane: Option<WideVane>,
    pub isee_present: Option<bool>,
    pub operating: Option<bool>,
    pub stage: Option<Stage>,
    pub sub_mode: Option<SubMode>,
}

impl ClimateState {
    /// Merges decoded settings. Only fields present in `settings` change.
    pub fn apply_settings(&mut self, settings: &SettingsData, vanes: VaneSupport) {
        match (settings.power, settings.mode) {
            (Some(power), Some(mode)) => self.mode = Some(ClimateMode::from_wire(power, mode)),
            (Some(Power::Off), None) => self.mode = Some(ClimateMode::Off),
            // Powering on without a mode resumes the mode the unit already had.
            (Some(Power::On), None) => {},
            (None, Some(mode)) => {
                if self.mode != Some(ClimateMode::Off) {
                    self.mode = Some(ClimateMode::from_wire(Power::On, mode));
                }
            },
            (None, None) => {},
        }

        if let Some(fan) = settings.fan {
            self.fan = Some(fan.into());
        }
        if let Some(temp) = settings.temp {
            self.target_temperature = Some(temp);
        }

        if settings.vane.is_some() || settings.widevane.is_some() {
            let previous = self.swing.unwrap_or(SwingMode::Off);
            let vertical = settings.vane.map_or(previous.vertical(), |v| v == Vane::Swing);
            let horizontal = settings.widevane.map_or(previous.horizontal(), |w| w == WideVane::Swing);
            self.swing = Some(SwingMode::from_axes(vertical, horizontal));
        }
        if vanes.vertical && settings.vane.is_some() {
            self.vertical_vane = settings.vane;
        }
        if vanes.horizontal && settings.widevane.is_some() {
            self.horizontal_vane = settings.widevane;
        }

        if let Some(isee) = settings.isee {
            self.isee_present = Some(isee);
        }
    }

    pub fn apply_room_temperature(&mut self, temp: TenthDegreesC) {
        self.current_temperature = Some(temp);
        self.current_temperature_stale = false;
    }

    pub fn apply_status(&mut self, status: &Status) {
        self.compressor_frequency = Some(status.compressor_frequency);
        self.operating = Some(status.operating);
    }

    pub fn apply_standby(&mut self, standby: &Standby) {
        if standby.stage.is_some() {
            self.stage = standby.stage;
        }
        if standby.sub_mode.is_some() {
            self.sub_mode = standby.sub_mode;
        }
    }
}

/// A partial [`ClimateState`] requested by the user.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClimateDelta {
    pub mode: Option<ClimateMode>,
    pub fan: Option<FanMode>,
    pub swing: Option<SwingMode>,
    pub target_temperature: Option<TenthDegreesC>,
    pub vertical_vane: Option<Vane>,
    pub horizontal_vane: Option<WideVane>,
}

impl ClimateDelta {
    pub fn mode(mut self, mode: ClimateMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn fan(mut self, fan: FanMode) -> Self {
        self.fan = Some(fan);
        self
    }

    pub fn swing(mut self, swing: SwingMode) -> Self {
        self.swing = Some(swing);
        self
    }

    pub fn target_temperature(mut self, temp: TenthDegreesC) -> Self {
        self.target_temperature = Some(temp);
        self
    }

    pub fn vertical_vane(mut self, vane: Vane) -> Self {
        self.vertical_vane = Some(vane);
        self
    }

    pub fn horizontal_vane(mut self, vane: WideVane) -> Self {
        self.horizontal_vane = Some(vane);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == ClimateDelta::default()
    }

    /// True when applying `self` after `older` leaves nothing of `older`
    /// visible.
    pub fn covers(&self, older: &ClimateDelta) -> bool {
        fn covered<T>(newer: &Option<T>, older: &Option<T>) -> bool {
            older.is_none() || newer.is_some()
        }
        covered(&self.mode, &older.mode)
            && covered(&self.fan, &older.fan)
            && covered(&self.swing, &older.swing)
            && covered(&self.target_temperature, &older.target_temperature)
            && covered(&self.vertical_vane, &older.vertical_vane)
            && covered(&self.horizontal_vane, &older.horizontal_vane)
    }

    /// The wire settings that realize this delta. Explicit vane positions win
    /// over the positions implied by a swing mode.
    pub fn to_settings(&self) -> SettingsData {
        let (power, mode) = match self.mode {
            Some(m) => {
                let (power, mode) = m.to_wire();
                (Some(power), mode)
            },
            None => (None, None),
        };
        let (swing_vane, swing_widevane) = match self.swing {
            Some(swing) => {
                let (vane, widevane) = swing.to_vanes();
                (Some(vane), Some(widevane))
            },
            None => (None, None),
        };

        SettingsData {
            power,
            mode,
            temp: self.target_temperature.map(|t| t.round_to_half()),
            fan: self.fan.map(Fan::from),
            vane: self.vertical_vane.or(swing_vane),
            widevane: self.horizontal_vane.or(swing_widevane),
            isee: None,
        }
    }
}
