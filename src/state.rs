//! Shared channel/connection state.
//!
//! One `BridgeState` instance exists per bridge and is shared between
//! the lifecycle manager and the two translator callbacks behind a
//! single `parking_lot::Mutex`. Every read and write of the mutable
//! fields goes through the lock; critical sections stay short (field
//! access plus, on the FBV path, one outbound port write).

use parking_lot::Mutex;
use std::sync::Arc;

use crate::platform::{DeviceHandle, InputPort, OutputPort};

/// Number of channel buttons per bank on the FBV.
pub const FBV_BUTTONS: u8 = 4;

/// The single shared record: current channel, user intent, open handles.
///
/// Invariant: a handle field is `Some` iff that device is currently
/// open. `fbv_port`/`fbv_device` transition together, as does the POD
/// triple. Handles are owned exclusively here and closed exactly once,
/// by the lifecycle manager.
#[derive(Default)]
pub struct BridgeState {
    /// Current channel, zero-based (displayed one-based).
    pub channel: u8,

    /// User intent, independent of whether a device is connected.
    pub fbv_enabled: bool,
    pub pod_enabled: bool,

    /// Last forwarded pedal positions, for the movement threshold.
    pub last_volume: u8,
    pub last_expression: u8,

    /// FBV output port (delivers the FBV's messages to us).
    pub fbv_port: Option<Box<dyn OutputPort>>,
    pub fbv_device: Option<Box<dyn DeviceHandle>>,

    /// POD input port (we send translated messages into it).
    pub pod_input_port: Option<Box<dyn InputPort>>,
    /// POD output port (delivers the POD's program changes to us).
    pub pod_output_port: Option<Box<dyn OutputPort>>,
    pub pod_device: Option<Box<dyn DeviceHandle>>,
}

impl BridgeState {
    /// Bank part of the current channel (4 buttons per bank).
    pub fn bank(&self) -> u8 {
        self.channel / FBV_BUTTONS
    }

    /// Slot part of the current channel: which of the four channel
    /// buttons is active.
    pub fn slot(&self) -> u8 {
        self.channel % FBV_BUTTONS
    }

    pub fn fbv_connected(&self) -> bool {
        self.fbv_device.is_some()
    }

    pub fn pod_connected(&self) -> bool {
        self.pod_device.is_some()
    }
}

/// The state handle shared by the lifecycle manager and the translators.
pub type SharedState = Arc<Mutex<BridgeState>>;

/// Create a fresh shared state with everything empty and disabled.
pub fn new_shared() -> SharedState {
    Arc::new(Mutex::new(BridgeState::default()))
}
