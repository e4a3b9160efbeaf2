use super::encoding::{Encodable, EncodingError};
use super::frame::{DataType, Frame, FrameError};
use super::types::{Fan, Mode, Power, Stage, SubMode, Temperature, TenthDegreesC, Vane, WideVane};

/// Every request and info response carries a fixed 16-byte payload.
pub const PAYLOAD_LEN: usize = 0x10;

const CONNECT_PAYLOAD: [u8; 2] = [0xca, 0x01];

#[derive(Debug, Eq, PartialEq)]
pub enum FrameData {
    SetRequest(SetRequest),
    GetInfoRequest(GetInfoRequest),
    ConnectRequest(ConnectRequest),

    SetResponse(SetResponse),
    GetInfoResponse(GetInfoResponse),
    ConnectResponse(ConnectResponse),

    Unknown,
}

impl FrameData {
    pub fn parse(frame: Frame) -> Result<Self, FrameError> {
        let data = frame.data;
        Ok(match frame.data_type {
            DataType::SetRequest => FrameData::SetRequest(SetRequest::parse(data)?),
            DataType::GetInfoRequest => FrameData::GetInfoRequest(GetInfoRequest::parse(data)?),
            DataType::ConnectRequest => FrameData::ConnectRequest(ConnectRequest),

            DataType::SetResponse => FrameData::SetResponse(SetResponse),
            DataType::GetInfoResponse => FrameData::GetInfoResponse(GetInfoResponse::parse(data)?),
            DataType::ConnectResponse => FrameData::ConnectResponse(ConnectResponse),

            DataType::Unknown => FrameData::Unknown,
        })
    }

    pub fn data_type(&self) -> DataType {
        match self {
            FrameData::SetRequest(_) => DataType::SetRequest,
            FrameData::GetInfoRequest(_) => DataType::GetInfoRequest,
            FrameData::ConnectRequest(_) => DataType::ConnectRequest,
            FrameData::SetResponse(_) => DataType::SetResponse,
            FrameData::GetInfoResponse(_) => DataType::GetInfoResponse,
            FrameData::ConnectResponse(_) => DataType::ConnectResponse,
            FrameData::Unknown => DataType::Unknown,
        }
    }

    fn length(&self) -> usize {
        match self {
            FrameData::ConnectRequest(_) => CONNECT_PAYLOAD.len(),
            FrameData::ConnectResponse(_) => 1,
            FrameData::Unknown => 0,
            _ => PAYLOAD_LEN,
        }
    }

    /// Encodes this payload as a complete frame at the start of `into` and
    /// returns the transmittable slice.
    pub fn to_frame<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        let mut payload = [0u8; PAYLOAD_LEN];
        let len = self.length();
        self.encode(&mut payload[..len])?;
        let written = Frame::encode(self.data_type(), &payload[..len], into)?;
        Ok(&into[..written])
    }
}

impl Encodable for FrameData {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        EncodingError::check(self.length(), into)?;
        match self {
            FrameData::SetRequest(r) => r.encode(into),
            FrameData::GetInfoRequest(r) => r.encode(into),
            FrameData::ConnectRequest(_) => {
                into.copy_from_slice(&CONNECT_PAYLOAD);
                Ok(into)
            },
            FrameData::SetResponse(_) => {
                for b in into.iter_mut() { *b = 0 }
                Ok(into)
            },
            FrameData::GetInfoResponse(r) => r.encode(into),
            FrameData::ConnectResponse(_) => {
                into[0] = 0x00;
                Ok(into)
            },
            FrameData::Unknown => Ok(into),
        }
    }
}

fn payload(data: &[u8], data_type: DataType) -> Result<&[u8; PAYLOAD_LEN], FrameError> {
    data.try_into().map_err(|_| FrameError::InvalidPayload(data_type))
}

/// The settings a set request applies, or an info response reports. Fields
/// left `None` are not part of the frame.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SettingsData {
    pub power: Option<Power>,
    pub mode: Option<Mode>,
    pub temp: Option<TenthDegreesC>,
    pub fan: Option<Fan>,
    pub vane: Option<Vane>,
    pub widevane: Option<WideVane>,
    pub isee: Option<bool>,
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum SetRequestKind {
    Settings = 0x01,
    RemoteTemperature = 0x07,
}

#[derive(Debug, Eq, PartialEq)]
pub enum SetRequest {
    Settings(SettingsData),
    /// `None` hands temperature sensing back to the unit's own sensor.
    RemoteTemperature(Option<TenthDegreesC>),
}

const FLAG_POWER: u8 = 0b0000_0001;
const FLAG_MODE: u8 = 0b0000_0010;
const FLAG_TEMP: u8 = 0b0000_0100;
const FLAG_FAN: u8 = 0b0000_1000;
const FLAG_VANE: u8 = 0b0001_0000;
const FLAG_WIDEVANE: u8 = 0b0000_0001;

// Settings payload, 16 bytes:
//
//  0   1   2   3   4   5   6   7   8   9  10  11  12  13  14  15
// ID  F0  F1  PW  MO  TM  FA  VA  xx  xx  xx  xx  xx  WV  T2  xx
//
// ID: 0x01
// F0: Flag byte 0, set bits indicate presence of power/mode/temp/fan/vane values
// F1: Flag byte 1, set bits indicate presence of widevane value
// PW: Power
// MO: Mode
// TM: Temperature (as 'setpoint mapped' value)
// FA: Fan
// VA: Vane
// WV: Wide Vane
// T2: Temperature (as half-degrees c + offset)
//
// Remote temperature payload:
//
//  0   1   2   3
// ID  RF  RM  RT
//
// ID: 0x07
// RF: 0x01 to use the remote temperature, 0x00 to return to the internal sensor
// RM: Remote temperature as 3 + (degrees - 10) * 2
// RT: Remote temperature as half-degrees c + offset, 0x80 when unset
impl SetRequest {
    fn parse(data: &[u8]) -> Result<Self, FrameError> {
        let data = payload(data, DataType::SetRequest)?;
        match data[0] {
            0x01 => Ok(SetRequest::Settings(Self::parse_settings(data))),
            0x07 => Ok(SetRequest::RemoteTemperature(if data[1] == 0x01 {
                Some(Temperature::HalfDegreesCPlusOffset { value: data[3] }.celsius_tenths())
            } else {
                None
            })),
            _ => Err(FrameError::InvalidPayload(DataType::SetRequest)),
        }
    }

    fn parse_settings(data: &[u8; PAYLOAD_LEN]) -> SettingsData {
        let (f0, f1) = (data[1], data[2]);
        let present = |flags: u8, bit: u8| flags & bit != 0;

        SettingsData {
            power: Some(data[3]).filter(|_| present(f0, FLAG_POWER)).and_then(Power::from_repr),
            mode: Some(data[4]).filter(|_| present(f0, FLAG_MODE)).and_then(Mode::from_repr),
            temp: if present(f0, FLAG_TEMP) { Some(decode_setpoint(data[5], data[14])) } else { None },
            fan: Some(data[6]).filter(|_| present(f0, FLAG_FAN)).and_then(Fan::from_repr),
            vane: Some(data[7]).filter(|_| present(f0, FLAG_VANE)).and_then(Vane::from_repr),
            widevane: Some(data[13]).filter(|_| present(f1, FLAG_WIDEVANE)).and_then(WideVane::decode),
            isee: None,
        }
    }

    fn encode_flags(settings: &SettingsData, into: &mut [u8]) -> Result<(), EncodingError> {
        EncodingError::check(2, into)?;

        into[0] = 0x00u8 |
            (if settings.power.is_some() { FLAG_POWER } else { 0 }) |
            (if settings.mode.is_some()  { FLAG_MODE } else { 0 }) |
            (if settings.temp.is_some()  { FLAG_TEMP } else { 0 }) |
            (if settings.fan.is_some()   { FLAG_FAN } else { 0 }) |
            (if settings.vane.is_some()  { FLAG_VANE } else { 0 });
        into[1] = if settings.widevane.is_some() { FLAG_WIDEVANE } else { 0 };
        Ok(())
    }
}

impl Encodable for SetRequest {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        EncodingError::check(PAYLOAD_LEN, into)?;
        for b in into.iter_mut() { *b = 0 }

        match self {
            SetRequest::Settings(settings) => {
                into[0] = SetRequestKind::Settings as u8;
                Self::encode_flags(settings, &mut into[1..3])?;
                settings.power.encode(&mut into[3..4])?;
                settings.mode.encode(&mut into[4..5])?;
                into[5] = match settings.temp { Some(ref temp) => temp.encode_as_setpoint_mapped(), None => 0x00 };
                settings.fan.encode(&mut into[6..7])?;
                settings.vane.encode(&mut into[7..8])?;
                settings.widevane.encode(&mut into[13..14])?;
                into[14] = match settings.temp { Some(ref temp) => temp.encode_as_half_deg_plus_offset(), None => 0x00 };
            },
            SetRequest::RemoteTemperature(temp) => {
                into[0] = SetRequestKind::RemoteTemperature as u8;
                match temp {
                    Some(temp) => {
                        let half_degrees = i16::from(temp.encode_as_half_deg_plus_offset()) - 128;
                        into[1] = 0x01;
                        into[2] = (3 + half_degrees - 20).clamp(0, 0xff) as u8;
                        into[3] = temp.encode_as_half_deg_plus_offset();
                    },
                    None => {
                        into[1] = 0x00;
                        into[3] = 0x80;
                    },
                }
            },
        }
        Ok(into)
    }
}

/// Setpoints travel twice; newer units fill in the half-degree byte and
/// leave the mapped one for older firmware.
fn decode_setpoint(mapped: u8, half_degrees: u8) -> TenthDegreesC {
    if half_degrees != 0 {
        Temperature::HalfDegreesCPlusOffset { value: half_degrees }.celsius_tenths()
    } else {
        Temperature::SetpointMapped { value: mapped }.celsius_tenths()
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InfoType {
    Settings     = 0x02,
    RoomTemp     = 0x03,
    Type4        = 0x04,
    Timers       = 0x05,
    Status       = 0x06,
    Standby      = 0x09,
    Unknown      = 0xff,
}

impl From<u8> for InfoType {
    fn from(byte: u8) -> Self {
        match byte {
            0x02 => InfoType::Settings,
            0x03 => InfoType::RoomTemp,
            0x04 => InfoType::Type4,
            0x05 => InfoType::Timers,
            0x06 => InfoType::Status,
            0x09 => InfoType::Standby,
            _ => InfoType::Unknown,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GetInfoRequest(pub InfoType);

impl GetInfoRequest {
    pub fn new(info_type: InfoType) -> Self {
        GetInfoRequest(info_type)
    }

    fn parse(data: &[u8]) -> Result<Self, FrameError> {
        let data = payload(data, DataType::GetInfoRequest)?;
        Ok(GetInfoRequest(InfoType::from(data[0])))
    }
}

impl Encodable for GetInfoRequest {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        EncodingError::check(PAYLOAD_LEN, into)?;
        into[0] = self.0 as u8;
        for i in &mut into[1..PAYLOAD_LEN] { *i = 0 }
        Ok(into)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct ConnectRequest;

#[derive(Debug, Eq, PartialEq)]
pub struct SetResponse;

#[derive(Debug, Eq, PartialEq)]
pub struct ConnectResponse;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RoomTemp(pub TenthDegreesC);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Status {
    pub compressor_frequency: u8,
    pub operating: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Standby {
    pub sub_mode: Option<SubMode>,
    pub stage: Option<Stage>,
}

#[derive(Debug, Eq, PartialEq)]
pub enum GetInfoResponse {
    Settings(SettingsData),
    RoomTemp(RoomTemp),
    Status(Status),
    Standby(Standby),
    /// Timers and the undocumented `0x04` type are acknowledged but not decoded.
    Other(InfoType),
}

// Info response payloads start with the info type byte:
//
// Settings (0x02):  3 power, 4 mode (+0x08 with iSee), 5 setpoint mapped,
//                   6 fan, 7 vane, 10 wide vane, 11 setpoint half degrees
// Room temp (0x03): 3 room temp mapped, 6 room temp half degrees
// Status (0x06):    3 compressor frequency, 4 operating
// Standby (0x09):   3 sub mode, 4 stage
impl GetInfoResponse {
    fn parse(data: &[u8]) -> Result<Self, FrameError> {
        let data = payload(data, DataType::GetInfoResponse)?;
        Ok(match InfoType::from(data[0]) {
            InfoType::Settings => {
                let (mode, isee) = Mode::decode_with_isee(data[4]);
                GetInfoResponse::Settings(SettingsData {
                    power: Power::from_repr(data[3]),
                    mode,
                    temp: Some(decode_setpoint(data[5], data[11])),
                    fan: Fan::from_repr(data[6]),
                    vane: Vane::from_repr(data[7]),
                    widevane: WideVane::decode(data[10]),
                    isee: Some(isee),
                })
            },
            InfoType::RoomTemp => {
                let temp = if data[6] != 0 {
                    Temperature::HalfDegreesCPlusOffset { value: data[6] }
                } else {
                    Temperature::RoomTempMapped { value: data[3] }
                };
                GetInfoResponse::RoomTemp(RoomTemp(temp.celsius_tenths()))
            },
            InfoType::Status => GetInfoResponse::Status(Status {
                compressor_frequency: data[3],
                operating: data[4] != 0,
            }),
            InfoType::Standby => GetInfoResponse::Standby(Standby {
                sub_mode: SubMode::from_repr(data[3]),
                stage: Stage::from_repr(data[4]),
            }),
            InfoType::Unknown => return Err(FrameError::InvalidPayload(DataType::GetInfoResponse)),
            other => GetInfoResponse::Other(other),
        })
    }

    pub fn info_type(&self) -> InfoType {
        match self {
            GetInfoResponse::Settings(_) => InfoType::Settings,
            GetInfoResponse::RoomTemp(_) => InfoType::RoomTemp,
            GetInfoResponse::Status(_) => InfoType::Status,
            GetInfoResponse::Standby(_) => InfoType::Standby,
            GetInfoResponse::Other(info_type) => *info_type,
        }
    }
}

impl Encodable for GetInfoResponse {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        EncodingError::check(PAYLOAD_LEN, into)?;
        for b in into.iter_mut() { *b = 0 }
        into[0] = self.info_type() as u8;

        match self {
            GetInfoResponse::Settings(s) => {
                s.power.encode(&mut into[3..4])?;
                s.mode.encode(&mut into[4..5])?;
                if s.isee == Some(true) {
                    into[4] += super::types::ISEE_MODE_OFFSET;
                }
                if let Some(temp) = s.temp {
                    into[5] = temp.encode_as_setpoint_mapped();
                    into[11] = temp.encode_as_half_deg_plus_offset();
                }
                s.fan.encode(&mut into[6..7])?;
                s.vane.encode(&mut into[7..8])?;
                s.widevane.encode(&mut into[10..11])?;
            },
            GetInfoResponse::RoomTemp(RoomTemp(temp)) => {
                into[3] = temp.encode_as_room_temp_mapped();
                into[6] = temp.encode_as_half_deg_plus_offset();
            },
            GetInfoResponse::Status(status) => {
                into[3] = status.compressor_frequency;
                into[4] = u8::from(status.operating);
            },
            GetInfoResponse::Standby(standby) => {
                into[3] = standby.sub_mode.map_or(0, |m| m as u8);
                into[4] = standby.stage.map_or(0, |s| s as u8);
            },
            GetInfoResponse::Other(_) => {},
        }
        Ok(into)
    }
}
