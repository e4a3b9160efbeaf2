#![cfg_attr(not(test), no_std)]

//! mitsu_cn105
//!
//! A driver for Mitsubishi heat pumps (aka air conditioners) with CN105
//! connectors. Based heavily on the reverse-engineering work in
//! [SwiCago/HeatPump](https://github.com/SwiCago/HeatPump).
//!
//! It is intended for use on embedded hardware, and as such is `no_std` and
//! never allocates. The CN105 serial connection operates at 2400 baud, 8 bits
//! per byte, even parity with 1 stop bit (2400 8E1).
//!
//! The crate has two layers:
//!
//! * [`protocol`] parses and encodes the framed packets on the wire.
//! * [`Session`] owns the serial link and runs the conversation: handshake,
//!   periodic status polls, queued user commands, timeouts and reconnects.
//!
//! ## Running a session
//!
//! The session never blocks and never reads a clock. Call [`Session::tick`]
//! from your control loop with the current time; state changes and command
//! outcomes come back through a [`Listener`].
//!
//! ```
//! use mitsu_cn105::{ClimateDelta, ClimateMode, HalSerial, Instant, Session, SessionConfig, TenthDegreesC};
//!
//! # fn run<S, E>(serial: S, millis: impl Fn() -> u64)
//! # where
//! #     S: embedded_hal::serial::Read<u8, Error = E> + embedded_hal::serial::Write<u8, Error = E>,
//! #     E: core::fmt::Debug,
//! # {
//! let mut session = Session::new(HalSerial::new(serial), (), SessionConfig::default());
//!
//! // Queued until the unit answers the handshake.
//! let delta = ClimateDelta::default()
//!     .mode(ClimateMode::Heat)
//!     .target_temperature(TenthDegreesC::from_celsius(21));
//! session.set_state(delta).unwrap();
//!
//! loop {
//!     session.tick(Instant::from_millis(millis()));
//! }
//! # }
//! ```
//!
//! ## Working with frames directly
//!
//! Read from the serial line:
//!
//! ```
//! use mitsu_cn105::protocol::{Frame, FrameData};
//!
//! let buf: &[u8] = &[0x42, 0x00, 0xfc, 0x7a, 0x01, 0x30, 0x01, 0x00, 0x54];
//!
//! // Read from the buffer until we find the start of a frame, and discard the junk.
//! let (buf, skipped) = Frame::parse_until(buf);
//! assert_eq!(skipped, 2);
//!
//! // Read and checksum a frame, then parse its contents
//! let (frame, _rest) = Frame::parse(buf).unwrap();
//! let data = FrameData::parse(frame).unwrap();
//!
//! match data {
//!     FrameData::SetResponse(_) => println!("Acknowledged a SetRequest"),
//!     FrameData::ConnectResponse(_) => println!("Connected!"),
//!     // ...
//!     _ => {},
//! }
//! ```
//!
//! Encode a packet for writing to the serial line:
//!
//! ```
//! use mitsu_cn105::protocol::{FrameData, GetInfoRequest, InfoType, MAX_FRAME_LEN};
//!
//! let mut buf = [0u8; MAX_FRAME_LEN];
//!
//! let data = FrameData::GetInfoRequest(GetInfoRequest::new(InfoType::Settings));
//! let encoded = data.to_frame(&mut buf).unwrap();
//!
//! assert_eq!(
//!     encoded,
//!     // Frame Header
//!     //
//!     //       ---- DataType::GetInfoRequest = 0x42
//!     //       ||||              ---- datalen = 0x10
//!     //       ||||              ||||
//!     &[ 0xfc, 0x42, 0x01, 0x30, 0x10,
//!
//!     // Frame Data (0x10 bytes  ^^^^)
//!     //
//!     // ---- InfoType::Settings = 0x02
//!     // ||||
//!        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!
//!     // Frame Footer (Checksum byte)
//!     //
//!     // ---- Checksum = 0xfc - SUM(frame_bytes) & 0xff
//!     // ||||
//!        0x7b ][..],
//! );
//! ```

pub mod capabilities;
pub mod climate;
pub mod config;
pub mod error;
pub mod interface;
pub mod protocol;
pub mod session;
pub mod time;

pub use capabilities::Capabilities;
pub use climate::{ClimateDelta, ClimateMode, ClimateState, FanMode, SwingMode};
pub use config::{SessionConfig, SubDevices};
pub use error::{Error, LinkError, Result, TimeoutError, UnsupportedValue};
pub use interface::{HalSerial, Link, Parity, SerialConfig};
pub use session::{Command, CommandId, CommandOutcome, Listener, PollStatus, Session, SessionState, QUEUE_DEPTH};
pub use time::Instant;

#[doc(inline)]
pub use protocol::types::{Stage, SubMode, TenthDegreesC, Vane, WideVane};
