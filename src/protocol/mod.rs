mod frame;
mod frame_data;

#[macro_use]
pub mod encoding;
pub mod types;

pub use frame::{DataType, Frame, FrameError, Scan, FRAME_START, MAX_DATA_LEN, MAX_FRAME_LEN};
pub use frame_data::*;
pub use encoding::{Encodable, EncodingError};
