/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{info, warn};

use super::WorkerInner;

pub(super) struct Reporter {
    quit_sender: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Reporter {
    pub(super) fn spawn(inner: Arc<WorkerInner>) -> io::Result<Self> {
        let (quit_sender, quit_receiver) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("stat-report".to_string())
            .spawn(move || {
                info!("stats reporting thread started");
                let mut instant_start = Instant::now();
                loop {
                    let period = inner.reporting_period();
                    if wait_quit(&quit_receiver, period, instant_start) {
                        break;
                    }
                    instant_start = Instant::now();
                    inner.report();
                }
                inner.report();
                info!("stats reporting thread stopped");
            })?;
        Ok(Reporter {
            quit_sender,
            handle,
        })
    }

    /// Stop the thread after a final report.
    pub(super) fn stop(self) {
        let _ = self.quit_sender.send(());
        if self.handle.join().is_err() {
            warn!("stats reporting thread panicked");
        }
    }
}

/// Wait until `period` has elapsed since `instant_start`.
///
/// Returns true if the thread should quit.
fn wait_quit(receiver: &mpsc::Receiver<()>, period: Duration, instant_start: Instant) -> bool {
    let timeout = match instant_start.checked_add(period) {
        // re-calculate the duration
        Some(instant_next) => instant_next.saturating_duration_since(Instant::now()),
        None => period,
    };
    match receiver.recv_timeout(timeout) {
        Ok(_) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}
