//! Receive dispatcher — the driver's callback entry point.
//!
//! Runs on whatever context the driver calls from, possibly concurrently
//! with the main loop. It copies the frame, logs it and appends it. The one
//! blocking step is the append itself; a wedged medium stalls the driver
//! for as long as the medium takes to fail.
//!
//! Senders are not checked against the peer registry. The driver only
//! delivers frames from peers in its own table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nowlog_core::{MacAddr, Message};

use crate::driver::ReceiveCallback;
use crate::persistence::Persistence;

/// Counters updated from the callback context.
#[derive(Debug, Default)]
pub struct DispatchStats {
    received: AtomicU64,
    persisted: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn log(&self) {
        tracing::info!(
            received = self.received(),
            persisted = self.persisted(),
            dropped = self.dropped(),
            "receive stats"
        );
    }
}

pub struct ReceiveDispatcher {
    persistence: Persistence,
    stats: DispatchStats,
}

impl ReceiveDispatcher {
    pub fn new(persistence: Persistence) -> Self {
        Self {
            persistence,
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Driver entry point. `data` is only borrowed for this call.
    pub fn on_receive(&self, source: MacAddr, data: &[u8], len: usize) {
        self.handle(Message::from_frame(source, data, len));
    }

    /// Log and persist an owned message.
    pub fn handle(&self, message: Message) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            src = %message.source(),
            len = message.declared_len(),
            "received message"
        );
        if message.is_truncated() {
            tracing::warn!(
                src = %message.source(),
                declared = message.declared_len(),
                actual = message.payload().len(),
                "frame shorter than reported length"
            );
        }
        tracing::info!(message = %message.text(), "message");

        match self.persistence.append(message.record()) {
            Ok(()) => {
                self.stats.persisted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(log = self.persistence.log_name(), "message saved");
            }
            Err(e) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(src = %message.source(), error = %e, "message dropped");
            }
        }
    }

    /// Wrap this dispatcher as the callback handed to the driver.
    pub fn into_callback(self: Arc<Self>) -> ReceiveCallback {
        Arc::new(move |source: MacAddr, data: &[u8], len: usize| {
            self.on_receive(source, data, len)
        })
    }
}
