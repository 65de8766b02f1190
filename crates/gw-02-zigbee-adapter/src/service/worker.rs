//! Background radio poll thread.
//!
//! Stands in for the vendor stack's own main-loop task: it drives
//! `RadioStack::poll` under the radio lock until stopped.

use super::adapter::AdapterCore;
use crate::ports::RadioStack;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

pub(super) struct PollWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PollWorker {
    pub(super) fn spawn<R: RadioStack>(
        core: Arc<AdapterCore>,
        radio: Arc<Mutex<R>>,
        interval: Duration,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("zigbee".into())
            .spawn(move || {
                debug!("Radio poll thread running");
                while !flag.load(Ordering::Acquire) {
                    let delivered = radio.lock().poll(core.as_ref());
                    if delivered == 0 {
                        thread::sleep(interval);
                    }
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub(super) fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PollWorker {
    fn drop(&mut self) {
        self.halt();
    }
}
