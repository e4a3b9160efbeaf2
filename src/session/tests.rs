use std::vec::Vec;

use super::*;
use crate::climate::{ClimateMode, FanMode, SwingMode};
use crate::error::FrameError;
use crate::interface::mock::MockLink;
use crate::interface::SerialConfig;
use crate::protocol::types::{Fan, Mode, Power};
use crate::protocol::{ConnectResponse, SetRequest, SetResponse, SettingsData, Standby, Status};

const CONNECT_REQUEST: [u8; 8] = [0xfc, 0x5a, 0x01, 0x30, 0x02, 0xca, 0x01, 0xa8];

#[derive(Default)]
struct Recorder {
    states: Vec<ClimateState>,
    finished: Vec<(CommandId, CommandOutcome)>,
    sessions: Vec<SessionState>,
    vertical: Vec<Vane>,
    horizontal: Vec<WideVane>,
    frequencies: Vec<u8>,
    stages: Vec<(Option<Stage>, Option<SubMode>)>,
}

impl Listener for Recorder {
    fn state_changed(&mut self, state: &ClimateState) {
        self.states.push(*state);
    }

    fn command_finished(&mut self, id: CommandId, outcome: CommandOutcome) {
        self.finished.push((id, outcome));
    }

    fn session_state_changed(&mut self, state: SessionState) {
        self.sessions.push(state);
    }

    fn vertical_vane_changed(&mut self, vane: Vane) {
        self.vertical.push(vane);
    }

    fn horizontal_vane_changed(&mut self, vane: WideVane) {
        self.horizontal.push(vane);
    }

    fn compressor_frequency_changed(&mut self, hz: u8) {
        self.frequencies.push(hz);
    }

    fn stage_changed(&mut self, stage: Option<Stage>, sub_mode: Option<SubMode>) {
        self.stages.push((stage, sub_mode));
    }
}

type TestSession = Session<MockLink, Recorder>;

fn at(millis: u64) -> Instant {
    Instant::from_millis(millis)
}

fn encode(data: FrameData) -> Vec<u8> {
    let mut buf = [0u8; MAX_FRAME_LEN];
    data.to_frame(&mut buf).unwrap().to_vec()
}

fn info(response: GetInfoResponse) -> Vec<u8> {
    encode(FrameData::GetInfoResponse(response))
}

fn ack() -> Vec<u8> {
    encode(FrameData::SetResponse(SetResponse))
}

fn heat_settings() -> GetInfoResponse {
    GetInfoResponse::Settings(SettingsData {
        power: Some(Power::On),
        mode: Some(Mode::Heat),
        temp: Some(TenthDegreesC(215)),
        fan: Some(Fan::F2),
        vane: Some(Vane::V3),
        widevane: Some(WideVane::Center),
        isee: Some(false),
    })
}

fn room_temp(tenths: i16) -> GetInfoResponse {
    GetInfoResponse::RoomTemp(RoomTemp(TenthDegreesC(tenths)))
}

fn new_session(config: SessionConfig) -> TestSession {
    let _ = env_logger::builder().is_test(true).try_init();
    Session::new(MockLink::default(), Recorder::default(), config)
}

/// A session that has completed the handshake at t=100ms.
fn synced(config: SessionConfig) -> TestSession {
    let mut session = new_session(config);
    session.connect(at(0)).unwrap();
    session.link.rx.extend(encode(FrameData::ConnectResponse(ConnectResponse)));
    session.service(at(100));
    assert_eq!(session.state(), SessionState::Synced);
    session.link.take_tx();
    session
}

fn feed(session: &mut TestSession, bytes: Vec<u8>, now: u64) {
    session.link.rx.extend(bytes);
    session.service(at(now));
}

/// The single frame written since the last call, decoded.
fn sent(session: &mut TestSession) -> Option<FrameData> {
    let tx = session.link.take_tx();
    if tx.is_empty() {
        return None;
    }
    Some(FrameData::parse(Frame::parse_exact(&tx).unwrap()).unwrap())
}

fn sent_info(session: &mut TestSession) -> Option<InfoType> {
    match sent(session) {
        Some(FrameData::GetInfoRequest(GetInfoRequest(info_type))) => Some(info_type),
        other => panic!("expected an info request, got {:?}", other),
    }
}

#[test]
fn handshake_reaches_synced() {
    let mut session = new_session(SessionConfig::default());
    session.connect(at(0)).unwrap();

    assert_eq!(session.state(), SessionState::Handshaking);
    assert_eq!(session.link.opened, vec![SerialConfig::CN105]);
    assert_eq!(session.link.take_tx(), CONNECT_REQUEST.to_vec());

    feed(&mut session, encode(FrameData::ConnectResponse(ConnectResponse)), 100);
    assert_eq!(session.state(), SessionState::Synced);
    assert_eq!(
        session.listener().sessions,
        vec![SessionState::Connecting, SessionState::Handshaking, SessionState::Synced]
    );
    assert!(session.link.take_tx().is_empty());
}

#[test]
fn link_open_failure_leaves_session_disconnected() {
    let mut session = new_session(SessionConfig::default());
    session.link.fail_open = true;

    assert_eq!(session.connect(at(0)), Err(Error::Link(LinkError::Open)));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.link.tx.is_empty());
}

#[test]
fn write_failure_is_reported() {
    let mut session = new_session(SessionConfig::default());
    session.link.fail_write = true;

    assert_eq!(session.connect(at(0)), Err(Error::Link(LinkError::Write)));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn poll_walks_the_info_cycle_in_order() {
    let mut session = synced(SessionConfig::default());

    assert_eq!(session.poll(at(1_000)), Ok(PollStatus::Started));
    assert_eq!(sent_info(&mut session), Some(InfoType::Settings));

    feed(&mut session, info(heat_settings()), 1_100);
    assert_eq!(sent_info(&mut session), Some(InfoType::RoomTemp));

    feed(&mut session, info(room_temp(225)), 1_200);
    assert_eq!(sent_info(&mut session), Some(InfoType::Status));

    let status = GetInfoResponse::Status(Status { compressor_frequency: 34, operating: true });
    feed(&mut session, info(status), 1_300);
    assert!(sent(&mut session).is_none());

    let climate = session.climate();
    assert_eq!(climate.mode, Some(ClimateMode::Heat));
    assert_eq!(climate.fan, Some(FanMode::Medium));
    assert_eq!(climate.swing, Some(SwingMode::Off));
    assert_eq!(climate.target_temperature, Some(TenthDegreesC(215)));
    assert_eq!(climate.current_temperature, Some(TenthDegreesC(225)));
    assert_eq!(climate.compressor_frequency, Some(34));
    assert_eq!(climate.operating, Some(true));

    assert_eq!(session.poll(at(5_000)), Ok(PollStatus::Started));
    assert_eq!(sent_info(&mut session), Some(InfoType::Settings));
}

#[test]
fn stage_sensor_adds_standby_request() {
    let mut session = synced(SessionConfig::default().with_stage_sensor());
    session.poll(at(1_000)).unwrap();
    sent_info(&mut session);
    feed(&mut session, info(heat_settings()), 1_100);
    sent_info(&mut session);
    feed(&mut session, info(room_temp(200)), 1_200);
    sent_info(&mut session);
    feed(&mut session, info(GetInfoResponse::Status(Status { compressor_frequency: 0, operating: false })), 1_300);

    assert_eq!(sent_info(&mut session), Some(InfoType::Standby));
}

#[test]
fn poll_is_skipped_while_cycle_in_progress() {
    let mut session = synced(SessionConfig::default());
    session.poll(at(1_000)).unwrap();
    session.link.take_tx();

    assert_eq!(session.poll(at(1_010)), Ok(PollStatus::Skipped));
    assert!(session.link.take_tx().is_empty());
}

#[test]
fn frame_updates_only_the_fields_it_carries() {
    let mut session = synced(SessionConfig::default());
    session.on_frame(&info(room_temp(225)), at(200)).unwrap();

    let climate = session.climate();
    assert_eq!(climate.current_temperature, Some(TenthDegreesC(225)));
    assert_eq!(climate.mode, None);
    assert_eq!(climate.target_temperature, None);
    assert_eq!(session.listener().states.len(), 1);
}

#[test]
fn corrupted_frame_leaves_state_unchanged() {
    let mut session = synced(SessionConfig::default());
    let mut bytes = info(heat_settings());
    let last = bytes.len() - 1;
    bytes[last] = bytes[last].wrapping_add(1);

    assert!(matches!(
        session.on_frame(&bytes, at(200)),
        Err(Error::Frame(FrameError::InvalidChecksum { .. }))
    ));
    assert_eq!(*session.climate(), ClimateState::default());
    assert!(session.listener().states.is_empty());
}

#[test]
fn resyncs_after_line_noise_and_a_bad_frame() {
    let mut session = synced(SessionConfig::default());
    session.poll(at(1_000)).unwrap();
    session.link.take_tx();

    let mut bad = info(room_temp(300));
    let last = bad.len() - 1;
    bad[last] ^= 0xff;

    let mut rx = vec![0x00, 0x13, 0x37];
    rx.extend(bad);
    rx.extend(info(heat_settings()));
    feed(&mut session, rx, 1_100);

    assert_eq!(session.climate().mode, Some(ClimateMode::Heat));
    assert_eq!(session.climate().current_temperature, None);
    assert_eq!(sent_info(&mut session), Some(InfoType::RoomTemp));
}

#[test]
fn unsupported_values_are_rejected() {
    let mut session = synced(SessionConfig::default());

    assert_eq!(
        session.set_state(ClimateDelta::default().mode(ClimateMode::Auto)),
        Err(UnsupportedValue::Mode(ClimateMode::Auto))
    );
    assert_eq!(
        session.set_state(ClimateDelta::default().target_temperature(TenthDegreesC(350))),
        Err(UnsupportedValue::TargetTemperature(TenthDegreesC(350)))
    );
    assert_eq!(session.set_state(ClimateDelta::default()), Err(UnsupportedValue::Empty));
    assert_eq!(session.pending_commands(), 0);
}

#[test]
fn vane_positions_need_a_registered_select() {
    let mut session = synced(SessionConfig::default());
    assert_eq!(
        session.set_state(ClimateDelta::default().vertical_vane(Vane::V1)),
        Err(UnsupportedValue::VerticalVane)
    );
    assert_eq!(session.select_horizontal_vane("<<"), Err(UnsupportedValue::HorizontalVane));
    assert!(session.vertical_vane_options().is_empty());

    let mut session = synced(SessionConfig::default().with_horizontal_vane_select());
    assert_eq!(session.horizontal_vane_options(), &WideVane::OPTIONS[..]);
    assert_eq!(session.select_horizontal_vane("bogus"), Err(UnsupportedValue::VaneOption));

    session.select_horizontal_vane("<<").unwrap();
    session.service(at(200));
    match sent(&mut session) {
        Some(FrameData::SetRequest(SetRequest::Settings(settings))) => {
            assert_eq!(settings.widevane, Some(WideVane::LL));
            assert_eq!(settings.vane, None);
        },
        other => panic!("expected a set request, got {:?}", other),
    }
}

#[test]
fn repeated_timeouts_disconnect_then_poll_resyncs() {
    let mut session = synced(SessionConfig::default().with_failure_threshold(3));

    for n in 1..=3u64 {
        assert_eq!(session.poll(at(n * 1_000)), Ok(PollStatus::Started));
        session.service(at(n * 1_000 + 1_000));
        assert_eq!(session.consecutive_failures(), n as u8);
    }
    assert_eq!(session.state(), SessionState::Disconnected);
    session.link.take_tx();

    assert_eq!(session.poll(at(5_000)), Ok(PollStatus::Handshaking));
    assert_eq!(session.link.take_tx(), CONNECT_REQUEST.to_vec());

    feed(&mut session, encode(FrameData::ConnectResponse(ConnectResponse)), 5_100);
    assert_eq!(session.state(), SessionState::Synced);
    assert_eq!(session.consecutive_failures(), 0);
    assert_eq!(session.poll(at(6_000)), Ok(PollStatus::Started));
}

#[test]
fn command_round_trip() {
    let mut session = synced(SessionConfig::default());
    let id = session
        .set_state(ClimateDelta::default().mode(ClimateMode::Cool).target_temperature(TenthDegreesC(220)))
        .unwrap();
    session.service(at(200));

    match sent(&mut session) {
        Some(FrameData::SetRequest(SetRequest::Settings(settings))) => {
            assert_eq!(settings.power, Some(Power::On));
            assert_eq!(settings.mode, Some(Mode::Cool));
            assert_eq!(settings.temp, Some(TenthDegreesC(220)));
            assert_eq!(settings.fan, None);
        },
        other => panic!("expected a set request, got {:?}", other),
    }
    assert_eq!(session.climate().mode, None);

    feed(&mut session, ack(), 300);
    assert_eq!(session.listener().finished, vec![(id, CommandOutcome::Acknowledged)]);
    assert_eq!(session.climate().mode, Some(ClimateMode::Cool));
    assert_eq!(session.climate().target_temperature, Some(TenthDegreesC(220)));
    assert_eq!(session.pending_commands(), 0);
}

#[test]
fn commands_wait_for_sync() {
    let mut session = new_session(SessionConfig::default());
    session.set_state(ClimateDelta::default().fan(FanMode::High)).unwrap();
    session.service(at(0));
    assert!(session.link.take_tx().is_empty());

    session.connect(at(10)).unwrap();
    session.link.take_tx();
    feed(&mut session, encode(FrameData::ConnectResponse(ConnectResponse)), 100);

    match sent(&mut session) {
        Some(FrameData::SetRequest(SetRequest::Settings(settings))) => assert_eq!(settings.fan, Some(Fan::F4)),
        other => panic!("expected a set request, got {:?}", other),
    }
}

#[test]
fn newer_command_supersedes_queued_one() {
    let mut session = synced(SessionConfig::default());
    let low = session.set_state(ClimateDelta::default().fan(FanMode::Low)).unwrap();
    session.set_state(ClimateDelta::default().fan(FanMode::High)).unwrap();

    assert_eq!(session.listener().finished, vec![(low, CommandOutcome::Superseded)]);
    assert_eq!(session.pending_commands(), 1);
}

#[test]
fn commands_jump_ahead_of_the_info_cycle() {
    let mut session = synced(SessionConfig::default());
    session.poll(at(1_000)).unwrap();
    assert_eq!(sent_info(&mut session), Some(InfoType::Settings));

    session.set_state(ClimateDelta::default().fan(FanMode::Quiet)).unwrap();
    session.service(at(1_050));
    assert!(sent(&mut session).is_none());

    feed(&mut session, info(heat_settings()), 1_100);
    assert!(matches!(sent(&mut session), Some(FrameData::SetRequest(_))));

    feed(&mut session, ack(), 1_200);
    assert_eq!(session.climate().fan, Some(FanMode::Quiet));
    assert_eq!(sent_info(&mut session), Some(InfoType::RoomTemp));
}

#[test]
fn current_temperature_goes_stale_but_is_kept() {
    let mut session = synced(SessionConfig::default().with_remote_temperature_timeout(Duration::from_secs(30)));

    for t in [0, 4_000, 8_000] {
        session.on_frame(&info(room_temp(215)), at(t)).unwrap();
    }
    for t in (12_000..=28_000).step_by(4_000) {
        session.on_frame(&info(heat_settings()), at(t)).unwrap();
    }

    session.service(at(38_000));
    assert!(!session.climate().current_temperature_stale);

    session.service(at(38_001));
    assert!(session.climate().current_temperature_stale);
    assert_eq!(session.climate().current_temperature, Some(TenthDegreesC(215)));
    assert_eq!(session.listener().states.last().map(|s| s.current_temperature_stale), Some(true));

    session.on_frame(&info(room_temp(220)), at(40_000)).unwrap();
    assert!(!session.climate().current_temperature_stale);
}

#[test]
fn remote_temperature_expires_back_to_internal_sensor() {
    let mut session = synced(SessionConfig::default().with_remote_temperature_timeout(Duration::from_secs(30)));
    let id = session.set_remote_temperature(Some(TenthDegreesC(213)), at(1_000));
    session.service(at(1_000));

    assert_eq!(
        sent(&mut session),
        Some(FrameData::SetRequest(SetRequest::RemoteTemperature(Some(TenthDegreesC(215)))))
    );
    feed(&mut session, ack(), 1_100);
    assert_eq!(session.listener().finished, vec![(id, CommandOutcome::Acknowledged)]);

    session.service(at(31_000));
    assert!(sent(&mut session).is_none());

    session.service(at(31_001));
    assert_eq!(sent(&mut session), Some(FrameData::SetRequest(SetRequest::RemoteTemperature(None))));
}

#[test]
fn sub_device_hooks_fire_only_when_registered() {
    let config = SessionConfig::default()
        .with_vertical_vane_select()
        .with_horizontal_vane_select()
        .with_compressor_frequency_sensor()
        .with_stage_sensor();
    let mut session = synced(config);

    session.on_frame(&info(heat_settings()), at(200)).unwrap();
    session.on_frame(&info(GetInfoResponse::Status(Status { compressor_frequency: 42, operating: true })), at(300))
        .unwrap();
    let standby = Standby { sub_mode: Some(SubMode::Defrost), stage: Some(Stage::Low) };
    session.on_frame(&info(GetInfoResponse::Standby(standby)), at(400)).unwrap();

    let recorder = session.listener();
    assert_eq!(recorder.vertical, vec![Vane::V3]);
    assert_eq!(recorder.horizontal, vec![WideVane::Center]);
    assert_eq!(recorder.frequencies, vec![42]);
    assert_eq!(recorder.stages, vec![(Some(Stage::Low), Some(SubMode::Defrost))]);
    assert_eq!(session.climate().vertical_vane, Some(Vane::V3));

    let mut session = synced(SessionConfig::default());
    session.on_frame(&info(heat_settings()), at(200)).unwrap();
    session.on_frame(&info(GetInfoResponse::Status(Status { compressor_frequency: 42, operating: true })), at(300))
        .unwrap();

    let recorder = session.listener();
    assert!(recorder.vertical.is_empty());
    assert!(recorder.frequencies.is_empty());
    assert_eq!(session.climate().vertical_vane, None);
    assert_eq!(session.climate().compressor_frequency, Some(42));
}

#[test]
fn tick_polls_on_interval() {
    let mut session = new_session(SessionConfig::default());

    session.tick(at(0));
    assert_eq!(session.link.take_tx(), CONNECT_REQUEST.to_vec());

    session.link.rx.extend(encode(FrameData::ConnectResponse(ConnectResponse)));
    session.tick(at(100));
    assert_eq!(session.state(), SessionState::Synced);
    assert!(session.link.take_tx().is_empty());

    session.tick(at(3_999));
    assert!(session.link.take_tx().is_empty());

    session.tick(at(4_000));
    assert_eq!(sent_info(&mut session), Some(InfoType::Settings));

    // No answer: the next due poll is skipped and the request times out.
    session.tick(at(8_000));
    assert!(session.link.take_tx().is_empty());
    assert_eq!(session.consecutive_failures(), 1);
}

#[test]
fn release_returns_the_link() {
    let session = synced(SessionConfig::default());
    let link = session.release();
    assert_eq!(link.opened.len(), 1);
}

#[test]
fn corrupted_length_byte_does_not_swallow_the_next_frame() {
    let mut session = synced(SessionConfig::default());
    session.poll(at(1_000)).unwrap();
    session.link.take_tx();

    // A connect response whose length byte reads 0x10 instead of 0x01.
    let mut rx = vec![0xfc, 0x7a, 0x01, 0x30, 0x10, 0x00, 0x54];
    rx.extend(info(heat_settings()));
    feed(&mut session, rx, 1_100);

    assert_eq!(session.climate().mode, Some(ClimateMode::Heat));
    assert_eq!(sent_info(&mut session), Some(InfoType::RoomTemp));
}

#[test]
fn unacknowledged_command_fails_without_starving_polls() {
    let mut session = synced(SessionConfig::default().with_failure_threshold(3));
    let id = session.set_state(ClimateDelta::default().fan(FanMode::High)).unwrap();

    assert_eq!(session.poll(at(1_000)), Ok(PollStatus::Started));
    assert!(matches!(sent(&mut session), Some(FrameData::SetRequest(_))));

    // First miss: the retry waits until the status cycle has run.
    session.service(at(2_000));
    assert_eq!(sent_info(&mut session), Some(InfoType::Settings));
    feed(&mut session, info(heat_settings()), 2_100);
    assert_eq!(sent_info(&mut session), Some(InfoType::RoomTemp));
    feed(&mut session, info(room_temp(215)), 2_200);
    assert_eq!(sent_info(&mut session), Some(InfoType::Status));
    feed(&mut session, info(GetInfoResponse::Status(Status { compressor_frequency: 20, operating: true })), 2_300);
    assert!(matches!(sent(&mut session), Some(FrameData::SetRequest(_))));

    session.service(at(3_300));
    assert!(matches!(sent(&mut session), Some(FrameData::SetRequest(_))));
    assert!(session.listener().finished.is_empty());

    session.service(at(4_300));
    assert_eq!(session.listener().finished, vec![(id, CommandOutcome::Failed)]);
    assert_eq!(session.pending_commands(), 0);
    assert_eq!(session.state(), SessionState::Synced);

    assert_eq!(session.poll(at(5_000)), Ok(PollStatus::Started));
    assert_eq!(sent_info(&mut session), Some(InfoType::Settings));
}

#[test]
fn extreme_remote_temperature_is_encoded_without_overflow() {
    let mut session = synced(SessionConfig::default());
    session.set_remote_temperature(Some(TenthDegreesC(i16::MAX)), at(200));
    session.service(at(200));

    assert!(matches!(
        sent(&mut session),
        Some(FrameData::SetRequest(SetRequest::RemoteTemperature(Some(_))))
    ));
}
