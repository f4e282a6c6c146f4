// SleepWatch Companion: Tasks
//
// Each task runs on its own named thread and talks to the others through
// `std::sync::mpsc` channels only. The core task is the sole owner of the
// pipeline state.

pub mod actuator;
pub mod inference;
pub mod relay;
pub mod timer;
