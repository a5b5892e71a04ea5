//! Device lifecycle management.
//!
//! The `Bridge` reacts to user enable/disable requests and to
//! device-appeared/removed notifications, matches devices by
//! manufacturer+product identity, opens and tears down ports
//! idempotently, and publishes the resulting handles into the shared
//! state. The platform's asynchronous open is made synchronous here with
//! a bounded blocking-channel receive, so callers see a plain
//! synchronous contract.

pub mod translate;


use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::events::{BridgeEvent, EventKind, EventSink};
use crate::platform::{
    fbv_identity, pod_identity, ByteReceiver, DeviceHandle, DeviceIdentity, DeviceInfo,
    MidiPlatform, PortDirection,
};
use crate::state::{self, BridgeState, SharedState};

/// Bound on the wait for the platform's asynchronous device open; a
/// timeout surfaces as an ordinary connect failure.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Which of the two devices an operation refers to. Also selects the
/// translation applied to messages arriving from that device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Fbv,
    Pod,
}

impl Target {
    fn name(self) -> &'static str {
        match self {
            Target::Fbv => "FBV",
            Target::Pod => "POD",
        }
    }

    fn dev_kind(self) -> EventKind {
        match self {
            Target::Fbv => EventKind::FbvDev,
            Target::Pod => EventKind::PodDev,
        }
    }
}

/// The lifecycle manager, shared between the UI surface and the device
/// watcher. All methods are synchronous; `set_enabled` and
/// `on_device_appeared` may block up to the open timeout.
pub struct Bridge {
    platform: Arc<dyn MidiPlatform>,
    state: SharedState,
    sink: Arc<dyn EventSink>,
    fbv: DeviceIdentity,
    pod: DeviceIdentity,
    pedal_threshold: u8,
}

impl Bridge {
    /// Create a bridge for the standard Line 6 identities.
    pub fn new(
        platform: Arc<dyn MidiPlatform>,
        sink: Arc<dyn EventSink>,
        pedal_threshold: u8,
    ) -> Self {
        Self::with_identities(platform, sink, fbv_identity(), pod_identity(), pedal_threshold)
    }

    /// Create a bridge matching custom identities (useful when the
    /// hardware enumerates under a different product string).
    pub fn with_identities(
        platform: Arc<dyn MidiPlatform>,
        sink: Arc<dyn EventSink>,
        fbv: DeviceIdentity,
        pod: DeviceIdentity,
        pedal_threshold: u8,
    ) -> Self {
        Self {
            platform,
            state: state::new_shared(),
            sink,
            fbv,
            pod,
            pedal_threshold,
        }
    }

    /// Current channel, zero-based.
    pub fn channel(&self) -> u8 {
        self.state.lock().channel
    }

    pub fn is_enabled(&self, target: Target) -> bool {
        let st = self.state.lock();
        match target {
            Target::Fbv => st.fbv_enabled,
            Target::Pod => st.pod_enabled,
        }
    }

    pub fn is_connected(&self, target: Target) -> bool {
        let st = self.state.lock();
        match target {
            Target::Fbv => st.fbv_connected(),
            Target::Pod => st.pod_connected(),
        }
    }

    /// The shared state handle (test and diagnostics access).
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    fn identity(&self, target: Target) -> &DeviceIdentity {
        match target {
            Target::Fbv => &self.fbv,
            Target::Pod => &self.pod,
        }
    }

    /// Flip user intent for one device. No-op if the flag already has
    /// the requested value. On enable with no matching device known, a
    /// `*_DEV` "not available" event is emitted but the flag stays set,
    /// so a later attach still connects.
    pub fn set_enabled(&self, target: Target, enable: bool) {
        {
            let mut st = self.state.lock();
            let flag = match target {
                Target::Fbv => &mut st.fbv_enabled,
                Target::Pod => &mut st.pod_enabled,
            };
            if *flag == enable {
                return;
            }
            *flag = enable;
        }
        debug!("{} {}", target.name(), if enable { "enabled" } else { "disabled" });

        let identity = self.identity(target).clone();
        let mut matched = false;
        for info in self.platform.devices() {
            if info.identity == identity {
                matched = true;
                if enable {
                    self.on_device_appeared(&info);
                } else {
                    self.on_device_removed(&info.identity);
                }
            }
        }

        if !matched && enable {
            self.sink.emit(BridgeEvent::new(
                target.dev_kind(),
                format!("{} not available", target.name()),
                -1,
            ));
        }
    }

    /// React to a device attach notification. Identity mismatches and
    /// disabled targets are ignored; an already-connected device is not
    /// reopened and produces no notification.
    pub fn on_device_appeared(&self, info: &DeviceInfo) {
        let (fbv_was, pod_was, fbv_enabled, pod_enabled) = {
            let st = self.state.lock();
            (
                st.fbv_connected(),
                st.pod_connected(),
                st.fbv_enabled,
                st.pod_enabled,
            )
        };

        if fbv_enabled || pod_enabled {
            if info.identity == self.fbv && fbv_enabled && !fbv_was {
                self.connect_fbv(info);
            } else if info.identity == self.pod && pod_enabled && !pod_was {
                self.connect_pod(info);
            }
        }

        // Three-way notification per device: connected on transition,
        // failure while desired-but-absent, silence when nothing changed.
        let (fbv_is, pod_is) = {
            let st = self.state.lock();
            (st.fbv_connected(), st.pod_connected())
        };

        let fbv_stat = if fbv_is { 0 } else { -1 };
        if fbv_is != fbv_enabled {
            self.sink.emit(BridgeEvent::new(
                EventKind::FbvDev,
                "Failed to connect to FBV",
                fbv_stat,
            ));
        } else if fbv_is && !fbv_was {
            self.sink
                .emit(BridgeEvent::new(EventKind::FbvDev, "FBV connected", fbv_stat));
        }

        let pod_stat = if pod_is { 0 } else { -1 };
        if pod_is != pod_enabled {
            self.sink.emit(BridgeEvent::new(
                EventKind::PodDev,
                "Failed to connect to POD",
                pod_stat,
            ));
        } else if pod_is && !pod_was {
            self.sink
                .emit(BridgeEvent::new(EventKind::PodDev, "POD connected", pod_stat));
        }
    }

    /// React to a device detach notification: close and clear the
    /// matching handles (best-effort) and announce the disconnect.
    pub fn on_device_removed(&self, identity: &DeviceIdentity) {
        if *identity == self.fbv {
            let mut st = self.state.lock();
            teardown_fbv(&mut st);
            self.sink
                .emit(BridgeEvent::new(EventKind::FbvDev, "FBV disconnected", -1));
        } else if *identity == self.pod {
            let mut st = self.state.lock();
            teardown_pod(&mut st);
            self.sink
                .emit(BridgeEvent::new(EventKind::PodDev, "POD disconnected", -1));
        }
    }

    /// Close everything that is open, without emitting lifecycle events.
    /// Called once on process shutdown.
    pub fn shutdown(&self) {
        let mut st = self.state.lock();
        teardown_fbv(&mut st);
        teardown_pod(&mut st);
    }

    fn connect_fbv(&self, info: &DeviceInfo) {
        // The FBV needs exactly one output port to receive on.
        let Some(out_index) = info.first_port(PortDirection::Output) else {
            warn!("FBV device exposes no output port, treating as unusable");
            return;
        };

        let Some(mut device) = self.open_blocking(&self.fbv) else {
            return;
        };

        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let threshold = self.pedal_threshold;
        let receiver: ByteReceiver = Box::new(move |data| {
            translate::on_message(Target::Fbv, &state, &sink, threshold, data)
        });

        match device.open_output(out_index, receiver) {
            Ok(port) => {
                let mut st = self.state.lock();
                st.fbv_port = Some(port);
                st.fbv_device = Some(device);
            }
            Err(e) => warn!("failed to open FBV output port: {}", e),
        }
    }

    fn connect_pod(&self, info: &DeviceInfo) {
        // The POD needs an output port (program changes toward us) and
        // an input port (translated messages toward it).
        let (Some(out_index), Some(in_index)) = (
            info.first_port(PortDirection::Output),
            info.first_port(PortDirection::Input),
        ) else {
            warn!("POD device is missing a required port, treating as unusable");
            return;
        };

        let Some(mut device) = self.open_blocking(&self.pod) else {
            return;
        };

        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let receiver: ByteReceiver =
            Box::new(move |data| translate::on_message(Target::Pod, &state, &sink, 0, data));

        let mut out_port = match device.open_output(out_index, receiver) {
            Ok(port) => port,
            Err(e) => {
                warn!("failed to open POD output port: {}", e);
                return;
            }
        };
        let in_port = match device.open_input(in_index) {
            Ok(port) => port,
            Err(e) => {
                warn!("failed to open POD input port: {}", e);
                if let Err(e) = out_port.close() {
                    warn!("POD output port close failed: {}", e);
                }
                return;
            }
        };

        let mut st = self.state.lock();
        st.pod_output_port = Some(out_port);
        st.pod_input_port = Some(in_port);
        st.pod_device = Some(device);
    }

    /// Open a device through the platform's completion callback,
    /// blocking the caller until it finishes or the bound expires.
    fn open_blocking(&self, identity: &DeviceIdentity) -> Option<Box<dyn DeviceHandle>> {
        let (tx, rx) = mpsc::channel();
        self.platform.open_device(
            identity,
            Box::new(move |device| {
                let _ = tx.send(device);
            }),
        );

        match rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Some(device)) => Some(device),
            Ok(None) => {
                debug!("platform failed to open '{}'", identity.product);
                None
            }
            Err(_) => {
                warn!("timed out opening '{}'", identity.product);
                None
            }
        }
    }
}

fn teardown_fbv(st: &mut BridgeState) {
    if let Some(mut port) = st.fbv_port.take() {
        if let Err(e) = port.close() {
            warn!("FBV port close failed: {}", e);
        }
    }
    if let Some(mut device) = st.fbv_device.take() {
        if let Err(e) = device.close() {
            warn!("FBV device close failed: {}", e);
        }
    }
}

fn teardown_pod(st: &mut BridgeState) {
    if let Some(mut port) = st.pod_output_port.take() {
        if let Err(e) = port.close() {
            warn!("POD output port close failed: {}", e);
        }
    }
    if let Some(mut port) = st.pod_input_port.take() {
        if let Err(e) = port.close() {
            warn!("POD input port close failed: {}", e);
        }
    }
    if let Some(mut device) = st.pod_device.take() {
        if let Err(e) = device.close() {
            warn!("POD device close failed: {}", e);
        }
    }
}
