// SleepWatch Companion: Action Dispatcher
//
// Turns a wake trigger into the value objects handed to the wake-light and
// notification collaborators. Pure: no I/O happens here.

use crate::config::{
    ActuationPrefs, ACTUATOR_COMMAND_DURATION_MS, ACTUATOR_MODE_WAKE, ALERT_BODY, ALERT_TITLE,
};
use crate::events::WakeTrigger;

/// Colour/brightness command for the wake light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub mode: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub duration_ms: u32,
}

impl ActuatorCommand {
    pub const PAYLOAD_LEN: usize = 8;

    /// Wire frame: `[mode, r, g, b, duration_ms (u32 BE)]`.
    pub fn to_payload(&self) -> [u8; Self::PAYLOAD_LEN] {
        let d = self.duration_ms.to_be_bytes();
        [self.mode, self.red, self.green, self.blue, d[0], d[1], d[2], d[3]]
    }
}

/// Local notification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WakeActions {
    pub trigger: WakeTrigger,
    pub command: ActuatorCommand,
    pub alert: AlertRequest,
}

pub fn on_wake_trigger(trigger: &WakeTrigger, prefs: &ActuationPrefs) -> WakeActions {
    let brightness = prefs.brightness.clamp(0.0, 1.0);
    let command = ActuatorCommand {
        mode: ACTUATOR_MODE_WAKE,
        red: scale_channel(prefs.red, brightness),
        green: scale_channel(prefs.green, brightness),
        blue: scale_channel(prefs.blue, brightness),
        duration_ms: ACTUATOR_COMMAND_DURATION_MS,
    };
    WakeActions {
        trigger: *trigger,
        command,
        alert: AlertRequest {
            title: ALERT_TITLE.to_string(),
            body: ALERT_BODY.to_string(),
        },
    }
}

fn scale_channel(channel: u8, brightness: f64) -> u8 {
    (channel as f64 * brightness).round().clamp(0.0, u8::MAX as f64) as u8
}
