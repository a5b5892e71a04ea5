//! Typed status events delivered to the UI surface.
//!
//! The core reports everything it does — raw traffic, translation
//! outcomes, device lifecycle, channel changes — through a single narrow
//! `emit` contract. Consumers decide how to render; the default binary
//! feeds the events into a tokio channel and prints them.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Kind of a status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// FBV device lifecycle (connected / failed / disconnected)
    FbvDev,
    /// Raw message received from the FBV
    FbvRx,
    /// POD device lifecycle
    PodDev,
    /// Raw message received from the POD
    PodRx,
    /// Translated message sent to the POD
    PodTx,
    /// Current channel changed (status carries the one-based number)
    CtlChn,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::FbvDev => "FBV_DEV",
            EventKind::FbvRx => "FBV_RX",
            EventKind::PodDev => "POD_DEV",
            EventKind::PodRx => "POD_RX",
            EventKind::PodTx => "POD_TX",
            EventKind::CtlChn => "CTL_CHN",
        };
        f.write_str(name)
    }
}

/// A status event emitted by the bridge core.
///
/// `status` is a signed outcome code: for `*_DEV` events 0 and positive
/// mean success and -1 failure/disabled; for `*_RX`/`*_TX` 0 means
/// processed and -1 unrecognized; for `CTL_CHN` it carries the one-based
/// channel number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEvent {
    pub kind: EventKind,
    pub message: String,
    pub status: i32,
}

impl BridgeEvent {
    pub fn new(kind: EventKind, message: impl Into<String>, status: i32) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
        }
    }
}

/// Sink for bridge events. Implementations must not block: `emit` is
/// called from hardware callback contexts, sometimes while the state
/// lock is held.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BridgeEvent);
}

/// Sink forwarding events into a tokio channel for the main loop to
/// render. Uses `try_send` so a slow consumer can never stall a MIDI
/// callback; overflow drops the event.
pub struct ChannelSink {
    tx: mpsc::Sender<BridgeEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end for the UI loop.
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<BridgeEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self { tx }), rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: BridgeEvent) {
        if let Err(e) = self.tx.try_send(event) {
            trace!("event channel full, dropping: {}", e);
        }
    }
}
