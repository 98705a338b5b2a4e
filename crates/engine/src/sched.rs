//! Fixed-delay periodic task runner

use crate::config::WindowCell;
use common::Shutdown;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Run `task` repeatedly on a named thread, sleeping the period *after* each
/// invocation completes: the real cycle is `period + task_execution_time`
/// (fixed delay, not fixed rate).
///
/// The period is re-read from the cell every cycle, so runtime frequency
/// changes apply on the next cycle. A triggered shutdown wakes the wait and
/// ends the loop without running the task again.
pub fn spawn_fixed_delay<F>(
    name: &str,
    period: Arc<WindowCell>,
    shutdown: Shutdown,
    mut task: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            while !shutdown.is_triggered() {
                task();

                let delay = Duration::from_secs_f64(period.get());
                if shutdown.wait_timeout(delay) {
                    break;
                }
            }
            debug!("periodic task stopped");
        })
        .expect("Failed to spawn periodic task thread")
}
