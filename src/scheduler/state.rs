//! Scheduler lifecycle state.
//!
//! ```text
//! Idle → Running   start()
//! Running → Stopping   stop() signalled
//! Stopping → Idle   loop exited (or aborted after the stop timeout)
//! ```

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
}

impl From<u8> for SchedulerState {
    fn from(val: u8) -> Self {
        match val {
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopping,
            _ => SchedulerState::Idle,
        }
    }
}
