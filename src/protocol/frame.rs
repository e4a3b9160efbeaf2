use nom::bytes::streaming::{tag, take};
use nom::combinator::{map, verify};
use nom::number::streaming::u8 as be_u8;
use nom::sequence::{pair, tuple};
use nom::IResult;
use strum::FromRepr;
use thiserror::Error;

use super::encoding::EncodingError;

#[derive(FromRepr, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum DataType {
    SetRequest = 0x41,
    GetInfoRequest = 0x42,
    ConnectRequest = 0x5a,

    SetResponse = 0x61,
    GetInfoResponse = 0x62,
    ConnectResponse = 0x7a,

    Unknown = 0xff,
}

impl From<u8> for DataType {
    fn from(byte: u8) -> Self {
        DataType::from_repr(byte).unwrap_or(DataType::Unknown)
    }
}

pub const FRAME_START: u8 = 0xfc;
const FRAME_B3: u8 = 0x01;
const FRAME_B4: u8 = 0x30;

const START_TAG: &[u8] = &[FRAME_START];
const MIDDLE_TAG: &[u8] = &[FRAME_B3, FRAME_B4];

pub const HEADER_LEN: usize = 5;
/// No CN105 frame carries more than 16 data bytes.
pub const MAX_DATA_LEN: usize = 0x10;
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_DATA_LEN + 1;

#[derive(Debug, Eq, PartialEq)]
pub struct Frame<'a> {
    pub data_type: DataType,
    pub data_len: usize,
    pub data: &'a [u8],
    checksum: u8,
}

/// Why a run of bytes is not a usable frame.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum FrameError {
    #[error("checksum mismatch: received {received:#04x}, calculated {calculated:#04x}")]
    InvalidChecksum { received: u8, calculated: u8 },
    #[error("incomplete frame, {0:?} more bytes needed")]
    IncompleteData(Option<usize>),
    #[error("malformed frame header")]
    InvalidHeader,
    #[error("{0} trailing bytes after frame")]
    TrailingData(usize),
    #[error("unexpected payload for {0:?}")]
    InvalidPayload(DataType),
}

/// Result of scanning a receive buffer for the next frame.
#[derive(Debug, Eq, PartialEq)]
pub enum Scan {
    /// A checksummed frame occupies the first `n` bytes.
    Frame(usize),
    /// The first `n` bytes cannot start a frame and should be dropped.
    Junk(usize),
    /// The first `n` bytes looked like a frame but failed validation.
    Invalid(usize, FrameError),
    /// More bytes are needed before anything can be decided.
    Incomplete,
}

fn byte(input: &[u8]) -> IResult<&[u8], u8> {
    be_u8(input)
}

fn header(input: &[u8]) -> IResult<&[u8], (DataType, usize)> {
    map(
        tuple((
            tag(START_TAG),
            byte,
            tag(MIDDLE_TAG),
            verify(byte, |len: &u8| usize::from(*len) <= MAX_DATA_LEN),
        )),
        |(_, data_type, _, data_len)| (DataType::from(data_type), usize::from(data_len)),
    )(input)
}

fn body(input: &[u8], data_len: usize) -> IResult<&[u8], (&[u8], u8)> {
    pair(take(data_len), byte)(input)
}

fn frame(input: &[u8]) -> IResult<&[u8], Frame<'_>> {
    let (rest, (data_type, data_len)) = header(input)?;
    let (rest, (data, checksum)) = body(rest, data_len)?;
    Ok((rest, Frame { data_type, data_len, data, checksum }))
}

impl<'a> Frame<'a> {
    pub(crate) fn checksum(data_type: DataType, data_len: usize, data: &[u8]) -> u8 {
        let header_sum = FRAME_START as u32
            + data_type as u32
            + FRAME_B3 as u32
            + FRAME_B4 as u32
            + data_len as u32;
        let sum = data.iter().fold(header_sum, |acc, b| acc + *b as u32);
        0xfc_u8.wrapping_sub(sum as u8)
    }

    fn validate_checksum(&self) -> Result<(), FrameError> {
        let calculated = Self::checksum(self.data_type, self.data_len, self.data);
        if calculated == self.checksum {
            Ok(())
        } else {
            Err(FrameError::InvalidChecksum { received: self.checksum, calculated })
        }
    }

    /// Total number of bytes this frame occupies on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.data_len + 1
    }

    /// Parses and validates one frame from the start of `data`, returning it
    /// along with whatever follows it.
    pub fn parse(data: &'a [u8]) -> Result<(Self, &'a [u8]), FrameError> {
        match frame(data) {
            Ok((remaining_data, frame)) => {
                frame.validate_checksum()?;
                Ok((frame, remaining_data))
            },
            Err(nom::Err::Incomplete(needed)) => match needed {
                nom::Needed::Size(size) => Err(FrameError::IncompleteData(Some(size.get()))),
                nom::Needed::Unknown => Err(FrameError::IncompleteData(None)),
            },
            Err(nom::Err::Failure(_)) | Err(nom::Err::Error(_)) => Err(FrameError::InvalidHeader),
        }
    }

    /// Like [`Frame::parse`], but `data` must hold exactly one frame.
    pub fn parse_exact(data: &'a [u8]) -> Result<Self, FrameError> {
        let (frame, rest) = Self::parse(data)?;
        if rest.is_empty() {
            Ok(frame)
        } else {
            Err(FrameError::TrailingData(rest.len()))
        }
    }

    /// Skips everything before the next frame start byte.
    ///
    /// Returns the buffer starting at the frame start (or empty if there is
    /// none) and the number of bytes skipped.
    pub fn parse_until(data: &'a [u8]) -> (&'a [u8], usize) {
        match data.iter().position(|b| *b == FRAME_START) {
            Some(start) => (&data[start..], start),
            None => (&data[data.len()..], data.len()),
        }
    }

    /// Decides what to do with the head of a receive buffer.
    ///
    /// Anything that fails validation costs a single byte, so the scan picks
    /// up a frame start hiding inside it. The length byte of a frame with a
    /// bad checksum is not trusted.
    pub fn scan(data: &[u8]) -> Scan {
        let (from_start, skipped) = Frame::parse_until(data);
        if skipped > 0 {
            return Scan::Junk(skipped);
        }
        if from_start.is_empty() {
            return Scan::Incomplete;
        }

        match frame(from_start) {
            Ok((_, frame)) => match frame.validate_checksum() {
                Ok(()) => Scan::Frame(frame.wire_len()),
                Err(e) => Scan::Invalid(1, e),
            },
            Err(nom::Err::Incomplete(_)) => Scan::Incomplete,
            Err(_) => Scan::Invalid(1, FrameError::InvalidHeader),
        }
    }

    /// Writes a complete frame (header, data and checksum) into `into`.
    pub fn encode(data_type: DataType, data: &[u8], into: &mut [u8]) -> Result<usize, EncodingError> {
        let len = HEADER_LEN + data.len() + 1;
        if data.len() > MAX_DATA_LEN || into.len() < len {
            return Err(EncodingError { expected: len, actual: into.len() });
        }

        into[0] = FRAME_START;
        into[1] = data_type as u8;
        into[2] = FRAME_B3;
        into[3] = FRAME_B4;
        into[4] = data.len() as u8;
        into[HEADER_LEN..HEADER_LEN + data.len()].copy_from_slice(data);
        into[len - 1] = Self::checksum(data_type, data.len(), data);
        Ok(len)
    }
}
