//! Incremental report streaming with a one-shot attach rendezvous.
//!
//! A report-enabled bulk action does not start its workers until a sink
//! attaches (usually an HTTP download response) or the wait window runs
//! out. The rendezvous has three outcomes:
//!
//! 1. the sink attaches in time: the header is written and the waiter
//!    is released;
//! 2. the window expires: the waiter fails with a timeout and the
//!    rendezvous is torn down;
//! 3. a sink attaches after the decision: it only receives the
//!    "try again" message and is closed.

use std::io;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rebulk_core::overview::BulkActionOverview;
use rebulk_core::report;
use rebulk_core::status::BulkActionType;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::BulkActionError;

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination of report text.
pub trait ReportSink: Send {
    fn write(&mut self, chunk: &str) -> io::Result<()>;

    /// Signal end of stream. Called exactly once per attached sink.
    fn close(&mut self);
}

/// Sink that forwards chunks over an unbounded channel, e.g. into an HTTP
/// response body stream. Closing drops the sender, ending the stream.
pub struct ChannelReportSink {
    sender: Option<mpsc::UnboundedSender<String>>,
}

impl ChannelReportSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }
}

impl ReportSink for ChannelReportSink {
    fn write(&mut self, chunk: &str) -> io::Result<()> {
        match &self.sender {
            Some(tx) => tx
                .send(chunk.to_string())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "report receiver dropped")),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "report sink closed")),
        }
    }

    fn close(&mut self) {
        self.sender = None;
    }
}

// ---------------------------------------------------------------------------
// ReportStreamer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StreamState {
    sink: Option<Box<dyn ReportSink>>,
    /// Resolver side of the rendezvous; present only while it is open.
    waiter: Option<oneshot::Sender<()>>,
    /// Awaiting side of the rendezvous, taken by the wait call.
    pending: Option<oneshot::Receiver<()>>,
}

/// Report output of one bulk action.
pub struct ReportStreamer {
    enabled: bool,
    action_type: BulkActionType,
    wait: Duration,
    cancel: CancellationToken,
    state: Mutex<StreamState>,
}

impl ReportStreamer {
    pub fn new(enabled: bool, action_type: BulkActionType, wait: Duration) -> Self {
        Self {
            enabled,
            action_type,
            wait,
            cancel: CancellationToken::new(),
            state: Mutex::new(StreamState::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open the rendezvous so that a sink may attach before the wait
    /// starts. No-op when reporting is disabled or already open.
    pub fn open(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.lock();
        if state.sink.is_none() && state.waiter.is_none() && state.pending.is_none() {
            let (tx, rx) = oneshot::channel();
            state.waiter = Some(tx);
            state.pending = Some(rx);
        }
    }

    /// Wait for a sink to attach, if reporting is enabled and none is
    /// attached yet. Fails after the configured window, or when the
    /// rendezvous is aborted.
    pub async fn wait_for_stream_if_needed(&self) -> Result<(), BulkActionError> {
        let pending = {
            let mut state = self.lock();
            if !self.enabled || state.sink.is_some() {
                return Ok(());
            }
            match state.pending.take() {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = oneshot::channel();
                    state.waiter = Some(tx);
                    rx
                }
            }
        };

        let outcome = tokio::select! {
            attached = pending => attached.map_err(|_| BulkActionError::StreamAborted),
            _ = tokio::time::sleep(self.wait) => Err(BulkActionError::StreamTimeout(self.wait)),
            _ = self.cancel.cancelled() => Err(BulkActionError::StreamAborted),
        };

        if outcome.is_ok() {
            return outcome;
        }

        let mut state = self.lock();
        if state.sink.is_some() {
            // The sink won the race against the timer.
            return Ok(());
        }
        state.waiter = None;
        outcome
    }

    /// Attach a sink. Writes the header and releases the waiter when the
    /// rendezvous is open; otherwise writes the fallback message and
    /// closes the sink immediately.
    pub fn set_streaming_response(&self, mut sink: Box<dyn ReportSink>) {
        let mut state = self.lock();
        let Some(waiter) = state.waiter.take() else {
            drop(state);
            tracing::debug!("Report stream attached without an open rendezvous");
            if let Err(e) = sink.write(report::REPORT_UNAVAILABLE_MESSAGE) {
                tracing::debug!(error = %e, "Failed to write report fallback message");
            }
            sink.close();
            return;
        };

        if let Err(e) = sink.write(&report::header(self.action_type)) {
            tracing::debug!(error = %e, "Failed to write report header");
        }
        state.sink = Some(sink);
        let _ = waiter.send(());
    }

    /// Append one key line. No-op without an attached sink; a sink that
    /// fails to accept a write is closed and detached.
    pub fn write_to_report(&self, key: &str, error: Option<&str>) {
        let mut state = self.lock();
        let Some(sink) = state.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.write(&report::key_line(key, error)) {
            tracing::debug!(error = %e, "Report sink rejected write, detaching");
            if let Some(mut sink) = state.sink.take() {
                sink.close();
            }
        }
    }

    /// Write the footer and close the sink. Only the first call after a
    /// sink attached has any effect.
    pub fn finalize<F>(&self, overview: F)
    where
        F: FnOnce() -> BulkActionOverview,
    {
        let sink = {
            let mut state = self.lock();
            state.waiter = None;
            state.pending = None;
            state.sink.take()
        };
        let Some(mut sink) = sink else {
            return;
        };

        if let Err(e) = sink.write(&report::footer(&overview())) {
            tracing::debug!(error = %e, "Failed to write report footer");
        }
        sink.close();
    }

    /// Abandon a pending rendezvous.
    pub fn abort(&self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
