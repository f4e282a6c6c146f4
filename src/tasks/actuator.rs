// SleepWatch Companion: Actuator Task
//
// Hands wake actions to the outside world. The wireless write and the OS
// notification belong to external collaborators, reached through the
// `ActuatorSink` trait; the default sink just logs the frame and the alert.

use std::sync::mpsc::Receiver;

use crate::dispatch::{ActuatorCommand, AlertRequest, WakeActions};

pub trait ActuatorSink {
    fn write_command(&mut self, command: &ActuatorCommand) -> anyhow::Result<()>;

    fn post_alert(&mut self, alert: &AlertRequest) -> anyhow::Result<()>;
}

/// Sink used when no lamp or notifier is attached.
#[derive(Debug, Default)]
pub struct LogSink;

impl ActuatorSink for LogSink {
    fn write_command(&mut self, command: &ActuatorCommand) -> anyhow::Result<()> {
        log::info!(
            "Wake light: rgb({}, {}, {}) mode {:#04x} for {} ms, frame {:02x?}",
            command.red,
            command.green,
            command.blue,
            command.mode,
            command.duration_ms,
            command.to_payload()
        );
        Ok(())
    }

    fn post_alert(&mut self, alert: &AlertRequest) -> anyhow::Result<()> {
        log::info!("Alert: {}: {}", alert.title, alert.body);
        Ok(())
    }
}

/// Returns the number of wake actions delivered.
pub fn actuator_task<S: ActuatorSink>(actions_rx: Receiver<WakeActions>, mut sink: S) -> usize {
    log::info!("Actuator task started");

    let mut delivered = 0;
    for actions in actions_rx.iter() {
        log::info!("Wake trigger received (stage {:?} at {})", actions.trigger.stage, actions.trigger.at);

        if let Err(e) = sink.write_command(&actions.command) {
            log::error!("Wake light command failed: {:#}", e);
        }
        if let Err(e) = sink.post_alert(&actions.alert) {
            log::error!("Alert failed: {:#}", e);
        }
        delivered += 1;
    }

    log::info!("Actuator channel closed, exiting actuator task");
    delivered
}
