//! Device I/O seam between the bridge core and the host MIDI subsystem.
//!
//! Port directions are named from the device's point of view, the way
//! USB-MIDI class devices describe themselves: a device *output* port
//! delivers bytes to us (it maps onto a `midir` input connection), and a
//! device *input* port is where we send bytes (a `midir` output
//! connection). The core only ever receives from output ports and sends
//! to the POD's input port.

pub mod midir;
pub mod watcher;

use thiserror::Error;

/// Errors at the device I/O boundary. Nothing here is fatal to the
/// bridge: open failures degrade to `*_DEV` status events, close
/// failures are logged and the handle cleared regardless.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("MIDI backend error: {0}")]
    Backend(String),

    #[error("port {index} not found on '{product}'")]
    PortNotFound { product: String, index: usize },

    #[error("port {index} on '{product}' has the wrong direction")]
    WrongDirection { product: String, index: usize },

    #[error("port is closed")]
    PortClosed,
}

/// Direction of a device port, device-centric (see module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Manufacturer/product pair identifying a device, compared by exact
/// equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub product: String,
}

impl DeviceIdentity {
    pub fn new(manufacturer: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            product: product.into(),
        }
    }
}

pub const MANUFACTURER: &str = "Line 6";
pub const PRODUCT_FBV: &str = "FBV Express Mk II";
pub const PRODUCT_POD: &str = "Line 6 Pocket POD";

/// Identity of the FBV Express Mk II foot controller.
pub fn fbv_identity() -> DeviceIdentity {
    DeviceIdentity::new(MANUFACTURER, PRODUCT_FBV)
}

/// Identity of the Pocket POD.
pub fn pod_identity() -> DeviceIdentity {
    DeviceIdentity::new(MANUFACTURER, PRODUCT_POD)
}

/// A currently known device: its identity plus its ports in device
/// order. Port selection picks the lowest index of the required
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub identity: DeviceIdentity,
    pub ports: Vec<PortDirection>,
}

impl DeviceInfo {
    /// Index of the first port with the given direction, if any.
    pub fn first_port(&self, direction: PortDirection) -> Option<usize> {
        self.ports.iter().position(|d| *d == direction)
    }
}

/// Byte-delivery target registered on an opened output port. Invoked
/// from the backend's callback context for every incoming message.
pub type ByteReceiver = Box<dyn FnMut(&[u8]) + Send>;

/// Completion callback for the asynchronous device open. `None` means
/// the open failed.
pub type OpenCallback = Box<dyn FnOnce(Option<Box<dyn DeviceHandle>>) + Send>;

/// A device input port: we send bytes into the device through it.
pub trait InputPort: Send {
    /// Send one short MIDI message. Non-blocking by contract of the
    /// underlying transport.
    fn send(&mut self, bytes: &[u8]) -> Result<(), PlatformError>;

    /// Close the port. Idempotent; failure is non-fatal.
    fn close(&mut self) -> Result<(), PlatformError>;
}

/// A device output port: bytes flow from the device to the receiver
/// registered at open time.
pub trait OutputPort: Send {
    /// Close the port. Idempotent; failure is non-fatal.
    fn close(&mut self) -> Result<(), PlatformError>;
}

/// An opened device, capable of opening its ports by device-order index.
pub trait DeviceHandle: Send {
    /// Open an output-direction port and wire `receiver` as its
    /// byte-delivery target.
    fn open_output(
        &mut self,
        index: usize,
        receiver: ByteReceiver,
    ) -> Result<Box<dyn OutputPort>, PlatformError>;

    /// Open an input-direction port for sending.
    fn open_input(&mut self, index: usize) -> Result<Box<dyn InputPort>, PlatformError>;

    /// Close the device. Idempotent; failure is non-fatal.
    fn close(&mut self) -> Result<(), PlatformError>;
}

/// The host MIDI subsystem: device enumeration and asynchronous open.
pub trait MidiPlatform: Send + Sync {
    /// Snapshot of currently known devices.
    fn devices(&self) -> Vec<DeviceInfo>;

    /// Open a device by identity. Completion is delivered through
    /// `on_open`, possibly on another thread, possibly inline.
    fn open_device(&self, identity: &DeviceIdentity, on_open: OpenCallback);
}
