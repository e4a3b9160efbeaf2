use core::time::Duration;

use crate::capabilities::Capabilities;
use crate::climate::VaneSupport;
use crate::interface::SerialConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
/// A 22 byte frame takes about 100ms at 2400 baud; leave room for the unit
/// to think.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1_000);
pub const DEFAULT_FAILURE_THRESHOLD: u8 = 3;

/// Optional sub-devices the host wants driven.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubDevices {
    pub horizontal_vane_select: bool,
    pub vertical_vane_select: bool,
    pub compressor_frequency_sensor: bool,
    /// Stage and sub mode sensors. Enables the `0x09` info request.
    pub stage_sensor: bool,
}

impl SubDevices {
    pub(crate) fn vanes(&self) -> VaneSupport {
        VaneSupport {
            vertical: self.vertical_vane_select,
            horizontal: self.horizontal_vane_select,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub serial: SerialConfig,
    pub capabilities: Capabilities,
    pub poll_interval: Duration,
    /// How long to wait for each response before counting a failure.
    pub read_timeout: Duration,
    /// `None` never expires temperatures.
    pub remote_temperature_timeout: Option<Duration>,
    /// Consecutive failures before the session drops to `Disconnected`.
    pub failure_threshold: u8,
    pub sub_devices: SubDevices,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            serial: SerialConfig::CN105,
            capabilities: Capabilities::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            remote_temperature_timeout: None,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            sub_devices: SubDevices::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_remote_temperature_timeout(mut self, timeout: Duration) -> Self {
        self.remote_temperature_timeout = Some(timeout);
        self
    }

    /// Clamped to at least one failure.
    pub fn with_failure_threshold(mut self, threshold: u8) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_horizontal_vane_select(mut self) -> Self {
        self.sub_devices.horizontal_vane_select = true;
        self
    }

    pub fn with_vertical_vane_select(mut self) -> Self {
        self.sub_devices.vertical_vane_select = true;
        self
    }

    pub fn with_compressor_frequency_sensor(mut self) -> Self {
        self.sub_devices.compressor_frequency_sensor = true;
        self
    }

    pub fn with_stage_sensor(mut self) -> Self {
        self.sub_devices.stage_sensor = true;
        self
    }
}
