// SleepWatch Companion: Gate Timer Task
//
// Low-frequency clock that asks the inference task to re-check the gating
// window, so the gate moves even while no samples are arriving.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::events::PipelineMsg;

pub fn timer_task(pipeline_tx: Sender<PipelineMsg>, interval: Duration) {
    log::info!("Timer task started ({:?} cadence)", interval);

    loop {
        thread::sleep(interval);

        if pipeline_tx.send(PipelineMsg::Timer(Utc::now())).is_err() {
            log::debug!("Pipeline channel closed, exiting timer task");
            return;
        }
    }
}
