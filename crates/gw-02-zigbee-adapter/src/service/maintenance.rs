use super::adapter::ZigbeeAdapter;
use crate::ports::RadioStack;
use gw_01_fibre_scheduler::FibreContext;
use shared_bus::{CommandFailed, EventType};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, warn};

impl<R: RadioStack> ZigbeeAdapter<R> {
    /// Fails every pending command older than the command timeout.
    ///
    /// Each expired command yields exactly one `CommandFailed{TIMEOUT}` and
    /// its slot is reusable afterwards. Returns the number expired.
    pub fn sweep_timeouts(&self) -> usize {
        let now = self.core.now();
        let timeout = self.core.config.cmd_timeout_ticks();
        let expired = self.core.pending.lock().purge_expired(now, timeout);
        for &correlation_id in &expired {
            warn!(correlation_id = %correlation_id, "Command timeout");
            self.core
                .counters
                .commands_timed_out
                .fetch_add(1, Ordering::Relaxed);
            self.core.emit_correlated(
                EventType::COMMAND_FAILED,
                correlation_id,
                &CommandFailed {
                    correlation_id,
                    error_code: CommandFailed::TIMEOUT,
                },
            );
        }
        expired.len()
    }

    /// Fibre body: sweeps timeouts every `sweep_interval_ms`.
    pub async fn run_expiry_sweep(self, ctx: FibreContext) {
        let interval = Duration::from_millis(u64::from(self.core.config.sweep_interval_ms));
        debug!(fibre = ctx.name(), "Expiry sweep running");
        loop {
            self.sweep_timeouts();
            ctx.sleep(interval).await;
        }
    }

    /// Fibre body: drives the radio cooperatively when no poll thread is
    /// used.
    pub async fn run_radio_poll(self, ctx: FibreContext) {
        let interval = Duration::from_millis(self.core.config.poll_interval_ms);
        loop {
            if self.poll_radio() == 0 {
                ctx.sleep(interval).await;
            } else {
                ctx.yield_now().await;
            }
        }
    }
}
