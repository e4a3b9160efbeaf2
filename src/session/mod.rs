//! The CN105 protocol session.
//!
//! A [`Session`] owns the serial link and runs the whole conversation with
//! the unit on the host's single control loop:
//!
//! ```text
//! Disconnected -> Connecting -> Handshaking -> Synced
//!       ^                                        |
//!       +-------- failure threshold reached -----+
//! ```
//!
//! Nothing here blocks for longer than it takes to write one frame. The host
//! calls [`Session::tick`] (or [`Session::poll`] and [`Session::service`]
//! separately) from its timer, and every response is picked up on a later
//! call. At most one request is on the wire at a time, which is what keeps
//! user commands from interleaving with a status read.

mod queue;

use core::time::Duration;

use heapless::Vec;
use log::{debug, info, trace, warn};

use crate::capabilities::Capabilities;
use crate::climate::{ClimateDelta, ClimateState};
use crate::config::SessionConfig;
use crate::error::{Error, LinkError, Result, TimeoutError, UnsupportedValue};
use crate::interface::Link;
use crate::protocol::types::{Stage, SubMode, TenthDegreesC, Vane, WideVane};
use crate::protocol::{
    ConnectRequest, Frame, FrameData, GetInfoRequest, GetInfoResponse, InfoType, RoomTemp, Scan, MAX_FRAME_LEN,
};
use crate::time::Instant;

pub use queue::{Command, CommandId, CommandOutcome, QUEUE_DEPTH};
use queue::CommandQueue;

const RX_BUFFER_LEN: usize = 64;

static INFO_CYCLE: [InfoType; 4] = [InfoType::Settings, InfoType::RoomTemp, InfoType::Status, InfoType::Standby];

/// Where the session is in its conversation with the unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Handshaking,
    Synced,
}

/// What a call to [`Session::poll`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollStatus {
    /// A status request cycle was started.
    Started,
    /// The previous cycle is still running.
    Skipped,
    /// The unit is not synced; a connect request went out instead.
    Handshaking,
}

/// Notifications from the session to the host. Every method has a no-op
/// default.
pub trait Listener {
    /// The climate model changed. Called after any sub-device hooks.
    fn state_changed(&mut self, _state: &ClimateState) {}

    /// A queued command left the queue. See [`CommandOutcome`].
    fn command_finished(&mut self, _id: CommandId, _outcome: CommandOutcome) {}

    fn session_state_changed(&mut self, _state: SessionState) {}

    /// Only called when a vertical vane select is registered.
    fn vertical_vane_changed(&mut self, _vane: Vane) {}

    /// Only called when a horizontal vane select is registered.
    fn horizontal_vane_changed(&mut self, _vane: WideVane) {}

    /// Only called when a compressor frequency sensor is registered.
    fn compressor_frequency_changed(&mut self, _hz: u8) {}

    /// Only called when a stage sensor is registered.
    fn stage_changed(&mut self, _stage: Option<Stage>, _sub_mode: Option<SubMode>) {}
}

impl Listener for () {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Request {
    Connect,
    Info(InfoType),
    Command(CommandId),
}

#[derive(Copy, Clone, Debug)]
struct InFlight {
    request: Request,
    deadline: Instant,
}

/// A CN105 conversation over an exclusively owned link.
pub struct Session<L: Link, H: Listener> {
    link: L,
    listener: H,
    config: SessionConfig,
    state: SessionState,
    climate: ClimateState,
    commands: CommandQueue,
    in_flight: Option<InFlight>,
    /// Index into the info cycle of the next request, while a poll runs.
    cycle: Option<usize>,
    failures: u8,
    rx: Vec<u8, RX_BUFFER_LEN>,
    last_poll: Option<Instant>,
    temperature_seen_at: Option<Instant>,
    remote_temperature_set_at: Option<Instant>,
}

impl<L: Link, H: Listener> Session<L, H> {
    /// Builds a disconnected session. Call [`Session::connect`] (or just
    /// start ticking) to bring the link up.
    pub fn new(link: L, listener: H, config: SessionConfig) -> Self {
        debug!(
            "cn105 session: poll every {:?}, read timeout {:?}, remote temperature timeout {:?}, sub-devices {:?}",
            config.poll_interval, config.read_timeout, config.remote_temperature_timeout, config.sub_devices
        );
        Session {
            link,
            listener,
            config,
            state: SessionState::Disconnected,
            climate: ClimateState::default(),
            commands: CommandQueue::new(),
            in_flight: None,
            cycle: None,
            failures: 0,
            rx: Vec::new(),
            last_poll: None,
            temperature_seen_at: None,
            remote_temperature_set_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn climate(&self) -> &ClimateState {
        &self.climate
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.config.capabilities
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn listener(&self) -> &H {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut H {
        &mut self.listener
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn consecutive_failures(&self) -> u8 {
        self.failures
    }

    /// Options for the vertical vane select, empty when none is registered.
    pub fn vertical_vane_options(&self) -> &'static [&'static str] {
        if self.config.sub_devices.vertical_vane_select { &Vane::OPTIONS } else { &[] }
    }

    /// Options for the horizontal vane select, empty when none is registered.
    pub fn horizontal_vane_options(&self) -> &'static [&'static str] {
        if self.config.sub_devices.horizontal_vane_select { &WideVane::OPTIONS } else { &[] }
    }

    /// Opens the link with CN105 framing and sends the connect request.
    pub fn connect(&mut self, now: Instant) -> Result<()> {
        self.set_session_state(SessionState::Connecting);
        self.in_flight = None;
        self.cycle = None;
        self.rx.clear();

        if let Err(e) = self.link.open(&self.config.serial) {
            warn!("could not open serial channel: {:?}", e);
            self.set_session_state(SessionState::Disconnected);
            return Err(LinkError::Open.into());
        }

        if let Err(e) = self.send(FrameData::ConnectRequest(ConnectRequest), Request::Connect, now) {
            self.set_session_state(SessionState::Disconnected);
            return Err(e);
        }
        self.set_session_state(SessionState::Handshaking);
        Ok(())
    }

    /// Starts a status request cycle, or retries the handshake when the unit
    /// is not synced. Skipped while the previous cycle is still running.
    pub fn poll(&mut self, now: Instant) -> Result<PollStatus> {
        let busy = self.cycle.is_some()
            || matches!(self.in_flight, Some(InFlight { request: Request::Connect | Request::Info(_), .. }));
        if busy {
            debug!("previous poll still in progress, skipping");
            return Ok(PollStatus::Skipped);
        }

        match self.state {
            SessionState::Disconnected | SessionState::Connecting => {
                self.connect(now)?;
                Ok(PollStatus::Handshaking)
            },
            SessionState::Handshaking => {
                self.send(FrameData::ConnectRequest(ConnectRequest), Request::Connect, now)?;
                Ok(PollStatus::Handshaking)
            },
            SessionState::Synced => {
                self.cycle = Some(0);
                self.transmit_next(now)?;
                Ok(PollStatus::Started)
            },
        }
    }

    /// Polls when the poll interval has elapsed, then services the link.
    pub fn tick(&mut self, now: Instant) {
        let due = self.last_poll
            .map_or(true, |last| now.saturating_duration_since(last) >= self.config.poll_interval);
        if due {
            self.last_poll = Some(now);
            if let Err(e) = self.poll(now) {
                warn!("poll failed: {}", e);
            }
        }
        self.service(now);
    }

    /// Drains received bytes, handles whatever frames they hold, expires
    /// stale requests and temperatures, and transmits the next request if the
    /// line is free.
    pub fn service(&mut self, now: Instant) {
        loop {
            let buffer_full = self.fill_rx();
            self.drain_frames(now);
            if !buffer_full {
                break;
            }
            if self.rx.is_full() {
                warn!("receive buffer full of undecodable data, discarding it");
                self.rx.clear();
            }
        }

        self.check_timeout(now);
        self.expire_remote_temperature(now);
        self.refresh_staleness(now);

        if let Err(e) = self.transmit_next(now) {
            warn!("transmit failed: {}", e);
        }
    }

    /// Queues a change. It is transmitted once the unit is synced and the
    /// line is free; the outcome arrives through [`Listener::command_finished`].
    pub fn set_state(&mut self, delta: ClimateDelta) -> Result<CommandId, UnsupportedValue> {
        self.validate(&delta)?;
        Ok(self.enqueue(Command::Settings(delta)))
    }

    /// Feeds the unit a temperature from an external sensor. `None` hands
    /// sensing back to the unit.
    pub fn set_remote_temperature(&mut self, temperature: Option<TenthDegreesC>, now: Instant) -> CommandId {
        self.remote_temperature_set_at = temperature.map(|_| now);
        self.enqueue(Command::RemoteTemperature(temperature.map(|t| t.round_to_half())))
    }

    /// Set operation of the vertical vane select.
    pub fn select_vertical_vane(&mut self, option: &str) -> Result<CommandId, UnsupportedValue> {
        let vane = Vane::from_name(option).ok_or(UnsupportedValue::VaneOption)?;
        self.set_state(ClimateDelta::default().vertical_vane(vane))
    }

    /// Set operation of the horizontal vane select.
    pub fn select_horizontal_vane(&mut self, option: &str) -> Result<CommandId, UnsupportedValue> {
        let vane = WideVane::from_name(option).ok_or(UnsupportedValue::VaneOption)?;
        self.set_state(ClimateDelta::default().horizontal_vane(vane))
    }

    /// Decodes one complete frame and merges what it reports.
    ///
    /// A frame that fails validation leaves all state untouched.
    pub fn on_frame(&mut self, bytes: &[u8], now: Instant) -> Result<()> {
        let frame = Frame::parse_exact(bytes)?;
        let data = FrameData::parse(frame)?;
        trace!("received {:?}", data);

        match data {
            FrameData::ConnectResponse(_) => self.handle_connected(),
            FrameData::GetInfoResponse(response) => self.handle_info(response, now),
            FrameData::SetResponse(_) => self.handle_ack(),
            FrameData::Unknown => debug!("ignoring frame of unknown type"),
            other => debug!("ignoring {:?} frame", other.data_type()),
        }
        Ok(())
    }

    /// Tears the session down and hands back the link. Any request still in
    /// flight is abandoned.
    pub fn release(self) -> L {
        if let Some(flight) = self.in_flight {
            debug!("abandoning in-flight {:?}", flight.request);
        }
        self.link
    }

    fn validate(&self, delta: &ClimateDelta) -> Result<(), UnsupportedValue> {
        let caps = &self.config.capabilities;
        let subs = &self.config.sub_devices;

        if delta.is_empty() {
            return Err(UnsupportedValue::Empty);
        }
        if let Some(mode) = delta.mode.filter(|m| !caps.supports_mode(*m)) {
            return Err(UnsupportedValue::Mode(mode));
        }
        if let Some(fan) = delta.fan.filter(|f| !caps.supports_fan_mode(*f)) {
            return Err(UnsupportedValue::Fan(fan));
        }
        if let Some(swing) = delta.swing.filter(|s| !caps.supports_swing_mode(*s)) {
            return Err(UnsupportedValue::Swing(swing));
        }
        if let Some(temp) = delta.target_temperature {
            if temp < TenthDegreesC::SETPOINT_MIN || temp > TenthDegreesC::SETPOINT_MAX {
                return Err(UnsupportedValue::TargetTemperature(temp));
            }
        }
        if delta.vertical_vane.is_some() && !subs.vertical_vane_select {
            return Err(UnsupportedValue::VerticalVane);
        }
        if delta.horizontal_vane.is_some() && !subs.horizontal_vane_select {
            return Err(UnsupportedValue::HorizontalVane);
        }
        Ok(())
    }

    fn enqueue(&mut self, command: Command) -> CommandId {
        let in_flight = match self.in_flight {
            Some(InFlight { request: Request::Command(id), .. }) => Some(id),
            _ => None,
        };
        let (id, displaced) = self.commands.push(command, in_flight);
        for (old, outcome) in displaced {
            debug!("command {:?} {:?}", old, outcome);
            self.listener.command_finished(old, outcome);
        }
        if self.state != SessionState::Synced {
            debug!("holding command {:?} until the unit is synced", id);
        }
        id
    }

    fn info_cycle(&self) -> &'static [InfoType] {
        if self.config.sub_devices.stage_sensor { &INFO_CYCLE } else { &INFO_CYCLE[..3] }
    }

    /// Sends the next queued command, or the next info request of a running
    /// poll cycle. New commands go first; retries go after the cycle.
    fn transmit_next(&mut self, now: Instant) -> Result<()> {
        if self.in_flight.is_some() || self.state != SessionState::Synced {
            return Ok(());
        }

        let info = self.cycle.and_then(|i| self.info_cycle().get(i).copied());
        let command = self.commands.front().map(|p| (p.id, p.command.to_request(), p.misses()));

        match (command, info) {
            // A command the unit already missed waits for the running cycle.
            (Some((id, request, misses)), info) if misses == 0 || info.is_none() => {
                self.send(FrameData::SetRequest(request), Request::Command(id), now)
            },
            (_, Some(info_type)) => self.send(
                FrameData::GetInfoRequest(GetInfoRequest::new(info_type)),
                Request::Info(info_type),
                now,
            ),
            _ => Ok(()),
        }
    }

    fn send(&mut self, data: FrameData, request: Request, now: Instant) -> Result<()> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let bytes = data.to_frame(&mut buf)?;

        for &byte in bytes {
            nb::block!(self.link.write(byte)).map_err(|e| {
                warn!("serial write failed: {:?}", e);
                Error::Link(LinkError::Write)
            })?;
        }
        nb::block!(self.link.flush()).map_err(|e| {
            warn!("serial flush failed: {:?}", e);
            Error::Link(LinkError::Write)
        })?;

        trace!("sent {:?}: {:02x?}", request, bytes);
        self.in_flight = Some(InFlight { request, deadline: now + self.config.read_timeout });
        Ok(())
    }

    /// Reads until the link has nothing more or the buffer is full. Returns
    /// true in the latter case.
    fn fill_rx(&mut self) -> bool {
        while !self.rx.is_full() {
            match self.link.read() {
                Ok(byte) => {
                    let _ = self.rx.push(byte);
                },
                Err(nb::Error::WouldBlock) => return false,
                Err(nb::Error::Other(e)) => {
                    warn!("serial read error: {:?}", e);
                    return false;
                },
            }
        }
        true
    }

    fn drain_frames(&mut self, now: Instant) {
        loop {
            match Frame::scan(&self.rx) {
                Scan::Incomplete => break,
                Scan::Junk(n) => {
                    debug!("skipping {} bytes of line noise", n);
                    self.consume(n);
                },
                Scan::Invalid(n, e) => {
                    warn!("dropping frame: {}", e);
                    self.consume(n);
                },
                Scan::Frame(n) => {
                    let mut frame = [0u8; MAX_FRAME_LEN];
                    frame[..n].copy_from_slice(&self.rx[..n]);
                    self.consume(n);
                    if let Err(e) = self.on_frame(&frame[..n], now) {
                        warn!("dropping frame: {}", e);
                    }
                },
            }
        }
    }

    fn consume(&mut self, n: usize) {
        let n = n.min(self.rx.len());
        self.rx.rotate_left(n);
        self.rx.truncate(self.rx.len() - n);
    }

    fn handle_connected(&mut self) {
        if matches!(self.in_flight, Some(InFlight { request: Request::Connect, .. })) {
            self.in_flight = None;
        }
        if self.state != SessionState::Synced {
            self.failures = 0;
            info!("connected to unit");
            self.set_session_state(SessionState::Synced);
        }
    }

    fn handle_info(&mut self, response: GetInfoResponse, now: Instant) {
        let previous = self.climate;
        let vanes = self.config.sub_devices.vanes();

        match &response {
            GetInfoResponse::Settings(settings) => self.climate.apply_settings(settings, vanes),
            GetInfoResponse::RoomTemp(RoomTemp(temp)) => {
                self.climate.apply_room_temperature(*temp);
                self.temperature_seen_at = Some(now);
            },
            GetInfoResponse::Status(status) => self.climate.apply_status(status),
            GetInfoResponse::Standby(standby) => self.climate.apply_standby(standby),
            GetInfoResponse::Other(info_type) => debug!("ignoring {:?} info", info_type),
        }

        if let Some(InFlight { request: Request::Info(expected), .. }) = self.in_flight {
            if expected == response.info_type() {
                self.in_flight = None;
                self.failures = 0;
                self.cycle = self.cycle
                    .map(|i| i + 1)
                    .filter(|next| *next < self.info_cycle().len());
                if self.cycle.is_none() {
                    trace!("poll cycle complete");
                }
            }
        }

        self.publish(previous);
    }

    fn handle_ack(&mut self) {
        let id = match self.in_flight {
            Some(InFlight { request: Request::Command(id), .. }) => id,
            _ => {
                debug!("set response without a command in flight");
                return;
            },
        };
        self.in_flight = None;
        self.failures = 0;

        if self.commands.front().map(|p| p.id) != Some(id) {
            return;
        }
        if let Some(pending) = self.commands.pop_front() {
            let previous = self.climate;
            if let Command::Settings(delta) = pending.command {
                self.climate.apply_settings(&delta.to_settings(), self.config.sub_devices.vanes());
            }
            debug!("command {:?} acknowledged", id);
            self.listener.command_finished(id, CommandOutcome::Acknowledged);
            self.publish(previous);
        }
    }

    fn check_timeout(&mut self, now: Instant) {
        let flight = match self.in_flight {
            Some(flight) if now >= flight.deadline => flight,
            _ => return,
        };
        self.in_flight = None;
        self.failures = self.failures.saturating_add(1);

        let err = TimeoutError { timeout: self.config.read_timeout, consecutive: self.failures };
        warn!("{:?} failed: {}", flight.request, err);

        // A missed info response abandons the cycle. A missed command
        // acknowledgement leaves the command queued until it has been missed
        // `failure_threshold` times.
        match flight.request {
            Request::Info(_) => self.cycle = None,
            Request::Command(id) => {
                let misses = self.commands.record_miss(id).unwrap_or(0);
                if misses >= self.config.failure_threshold {
                    self.commands.pop_front();
                    warn!("command {:?} unacknowledged after {} attempts, giving up", id, misses);
                    self.listener.command_finished(id, CommandOutcome::Failed);
                }
            },
            Request::Connect => {},
        }

        if self.failures >= self.config.failure_threshold && self.state != SessionState::Disconnected {
            warn!("{} consecutive failures, marking unit disconnected", self.failures);
            self.cycle = None;
            self.set_session_state(SessionState::Disconnected);
        }
    }

    fn expire_remote_temperature(&mut self, now: Instant) {
        let (timeout, set_at) = match (self.config.remote_temperature_timeout, self.remote_temperature_set_at) {
            (Some(timeout), Some(set_at)) => (timeout, set_at),
            _ => return,
        };
        if is_expired(now, set_at, timeout) {
            info!("remote temperature not refreshed within {:?}, returning to the internal sensor", timeout);
            self.remote_temperature_set_at = None;
            self.enqueue(Command::RemoteTemperature(None));
        }
    }

    fn refresh_staleness(&mut self, now: Instant) {
        let (timeout, seen_at) = match (self.config.remote_temperature_timeout, self.temperature_seen_at) {
            (Some(timeout), Some(seen_at)) => (timeout, seen_at),
            _ => return,
        };
        if !self.climate.current_temperature_stale && is_expired(now, seen_at, timeout) {
            warn!("no temperature report for {:?}, keeping the last value", timeout);
            let previous = self.climate;
            self.climate.current_temperature_stale = true;
            self.publish(previous);
        }
    }

    fn publish(&mut self, previous: ClimateState) {
        if self.climate == previous {
            return;
        }
        let subs = self.config.sub_devices;
        let current = self.climate;

        if subs.vertical_vane_select && current.vertical_vane != previous.vertical_vane {
            if let Some(vane) = current.vertical_vane {
                self.listener.vertical_vane_changed(vane);
            }
        }
        if subs.horizontal_vane_select && current.horizontal_vane != previous.horizontal_vane {
            if let Some(vane) = current.horizontal_vane {
                self.listener.horizontal_vane_changed(vane);
            }
        }
        if subs.compressor_frequency_sensor && current.compressor_frequency != previous.compressor_frequency {
            if let Some(hz) = current.compressor_frequency {
                self.listener.compressor_frequency_changed(hz);
            }
        }
        if subs.stage_sensor && (current.stage != previous.stage || current.sub_mode != previous.sub_mode) {
            self.listener.stage_changed(current.stage, current.sub_mode);
        }

        self.listener.state_changed(&current);
    }

    fn set_session_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("session {:?} -> {:?}", self.state, state);
            self.state = state;
            self.listener.session_state_changed(state);
        }
    }
}

fn is_expired(now: Instant, since: Instant, timeout: Duration) -> bool {
    now.saturating_duration_since(since) > timeout
}

#[cfg(test)]
mod tests;
