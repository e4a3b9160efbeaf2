use super::encoding::*;
use strum::FromRepr;

#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Power {
    Off = 0x00,
    On = 0x01,
}

impl OneByteEncodable for Power {
    fn encoded_as_byte(&self) -> u8 {
        *self as u8
    }
}

one_byte_encodable_enum!(Power, Mode, Fan, Vane, WideVane);

#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Mode {
    Heat = 0x01,
    Dry  = 0x02,
    Cool = 0x03,
    Fan  = 0x07,
    Auto = 0x08,
}

impl OneByteEncodable for Mode {
    fn encoded_as_byte(&self) -> u8 {
        *self as u8
    }
}

/// The unit reports the iSee sensor by adding this offset to the mode byte.
pub const ISEE_MODE_OFFSET: u8 = 0x08;

impl Mode {
    /// Splits a settings mode byte into the mode and the iSee flag.
    pub fn decode_with_isee(byte: u8) -> (Option<Mode>, bool) {
        if byte > Mode::Auto as u8 {
            (Mode::from_repr(byte - ISEE_MODE_OFFSET), true)
        } else {
            (Mode::from_repr(byte), false)
        }
    }
}

#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Fan {
    Auto  = 0x00,
    Quiet = 0x01,
    F1    = 0x02,
    F2    = 0x03,
    F3    = 0x05,
    F4    = 0x06,
}

impl OneByteEncodable for Fan {
    fn encoded_as_byte(&self) -> u8 {
        *self as u8
    }
}

#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Vane {
    Auto  = 0x00,
    V1    = 0x01,
    V2    = 0x02,
    V3    = 0x03,
    V4    = 0x04,
    V5    = 0x05,
    Swing = 0x07,
}

impl OneByteEncodable for Vane {
    fn encoded_as_byte(&self) -> u8 {
        *self as u8
    }
}

impl Vane {
    pub const ALL: [Vane; 7] = [Vane::Auto, Vane::V1, Vane::V2, Vane::V3, Vane::V4, Vane::V5, Vane::Swing];

    /// Option names offered by the vertical vane select, in `ALL` order.
    pub const OPTIONS: [&'static str; 7] = ["AUTO", "1", "2", "3", "4", "5", "SWING"];

    pub fn name(&self) -> &'static str {
        option_name(&Self::ALL, &Self::OPTIONS, self)
    }

    pub fn from_name(name: &str) -> Option<Vane> {
        from_option_name(&Self::ALL, &Self::OPTIONS, name)
    }
}

#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum WideVane {
    LL     = 0x01,
    L      = 0x02,
    Center = 0x03,
    R      = 0x04,
    RR     = 0x05,
    LR     = 0x08,
    Swing  = 0x0c,
}

impl OneByteEncodable for WideVane {
    fn encoded_as_byte(&self) -> u8 {
        *self as u8
    }
}

/// Settings frames set the high bit of the wide vane byte when the unit was
/// adjusted from its own remote.
pub const WIDE_VANE_MASK: u8 = 0x0f;

impl WideVane {
    pub const ALL: [WideVane; 7] = [
        WideVane::LL, WideVane::L, WideVane::Center, WideVane::R, WideVane::RR, WideVane::LR, WideVane::Swing,
    ];

    /// Option names offered by the horizontal vane select, in `ALL` order.
    pub const OPTIONS: [&'static str; 7] = ["<<", "<", "|", ">", ">>", "<>", "SWING"];

    pub fn decode(byte: u8) -> Option<WideVane> {
        WideVane::from_repr(byte & WIDE_VANE_MASK)
    }

    pub fn name(&self) -> &'static str {
        option_name(&Self::ALL, &Self::OPTIONS, self)
    }

    pub fn from_name(name: &str) -> Option<WideVane> {
        from_option_name(&Self::ALL, &Self::OPTIONS, name)
    }
}

fn option_name<T: PartialEq>(all: &[T], names: &[&'static str], value: &T) -> &'static str {
    all.iter()
        .zip(names.iter())
        .find(|(v, _)| *v == value)
        .map(|(_, name)| *name)
        .unwrap_or("")
}

fn from_option_name<T: Copy>(all: &[T], names: &[&'static str], name: &str) -> Option<T> {
    names.iter().position(|n| n.eq_ignore_ascii_case(name)).map(|i| all[i])
}

/// What the outdoor unit is doing besides following the requested mode.
#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum SubMode {
    Normal  = 0x00,
    Defrost = 0x02,
    Preheat = 0x04,
    Standby = 0x08,
}

/// Indoor fan stage reported by the `0x09` info response.
#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Stage {
    Idle     = 0x00,
    Low      = 0x01,
    Gentle   = 0x02,
    Medium   = 0x03,
    Moderate = 0x04,
    High     = 0x05,
    Diffuse  = 0x06,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Temperature {
    HalfDegreesCPlusOffset { value: u8 },
    SetpointMapped { value: u8 },
    RoomTempMapped { value: u8 },
}

impl Temperature {
    pub fn celsius_tenths(&self) -> TenthDegreesC {
        match *self {
            Temperature::HalfDegreesCPlusOffset { value } => TenthDegreesC((i16::from(value) - 128) * 5),
            Temperature::SetpointMapped { value } => TenthDegreesC((0x1f - i16::from(value)) * 10),
            Temperature::RoomTempMapped { value } => TenthDegreesC((i16::from(value) + 10) * 10),
        }
    }
}

/// A temperature in tenths of a degree Celsius.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TenthDegreesC(pub i16);

impl TenthDegreesC {
    /// Lowest setpoint the unit accepts.
    pub const SETPOINT_MIN: TenthDegreesC = TenthDegreesC(160);
    /// Highest setpoint the unit accepts.
    pub const SETPOINT_MAX: TenthDegreesC = TenthDegreesC(310);

    pub fn from_celsius(degrees: i16) -> Self {
        TenthDegreesC(degrees.saturating_mul(10))
    }

    pub fn as_celsius(&self) -> f32 {
        f32::from(self.0) / 10.0
    }

    /// Rounds to the nearest half degree, the finest step the unit knows.
    pub fn round_to_half(&self) -> TenthDegreesC {
        TenthDegreesC(self.half_degrees() * 5)
    }

    fn half_degrees(&self) -> i16 {
        if self.0 >= 0 { self.0.saturating_add(2) / 5 } else { self.0.saturating_sub(2) / 5 }
    }

    pub fn encode_as_setpoint_mapped(&self) -> u8 {
        let degrees = self.0.clamp(Self::SETPOINT_MIN.0, Self::SETPOINT_MAX.0) / 10;
        (0x1f - degrees) as u8
    }

    pub fn encode_as_room_temp_mapped(&self) -> u8 {
        (self.0 / 10 - 10).clamp(0, 0xff) as u8
    }

    pub fn encode_as_half_deg_plus_offset(&self) -> u8 {
        (self.half_degrees() + 128).clamp(0, 0xff) as u8
    }
}
