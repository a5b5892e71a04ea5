//! `midir`-backed implementation of the device I/O contract.
//!
//! midir exposes flat host-side port lists rather than devices, so a
//! `DeviceInfo` is synthesized per known identity from the ports whose
//! names contain the product string (case-insensitive substring match,
//! which survives the `"Product:Product MIDI 1"` decorations ALSA and
//! Windows add). Open completion is invoked inline; the callback shape
//! keeps the contract uniform with genuinely asynchronous hosts.

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::debug;

use super::{
    ByteReceiver, DeviceHandle, DeviceIdentity, DeviceInfo, InputPort, MidiPlatform, OpenCallback,
    OutputPort, PlatformError, PortDirection,
};

/// Production platform over the host's MIDI subsystem.
pub struct MidirPlatform {
    client_name: String,
    identities: Vec<DeviceIdentity>,
}

impl MidirPlatform {
    /// Create a platform that recognizes the given device identities.
    pub fn new(client_name: impl Into<String>, identities: Vec<DeviceIdentity>) -> Self {
        Self {
            client_name: client_name.into(),
            identities,
        }
    }

    /// Collect the named ports belonging to one identity, device output
    /// ports first (matching how the hardware enumerates).
    fn scan(&self, identity: &DeviceIdentity) -> Option<Vec<(PortDirection, String)>> {
        let midi_in = MidiInput::new(&format!("{}-scan-in", self.client_name)).ok()?;
        let midi_out = MidiOutput::new(&format!("{}-scan-out", self.client_name)).ok()?;

        let needle = identity.product.to_lowercase();
        let mut ports = Vec::new();

        // Host-side inputs are the device's output ports.
        for port in midi_in.ports() {
            if let Ok(name) = midi_in.port_name(&port) {
                if name.to_lowercase().contains(&needle) {
                    ports.push((PortDirection::Output, name));
                }
            }
        }
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                if name.to_lowercase().contains(&needle) {
                    ports.push((PortDirection::Input, name));
                }
            }
        }

        if ports.is_empty() {
            None
        } else {
            Some(ports)
        }
    }
}

impl MidiPlatform for MidirPlatform {
    fn devices(&self) -> Vec<DeviceInfo> {
        self.identities
            .iter()
            .filter_map(|identity| {
                self.scan(identity).map(|ports| DeviceInfo {
                    identity: identity.clone(),
                    ports: ports.into_iter().map(|(direction, _)| direction).collect(),
                })
            })
            .collect()
    }

    fn open_device(&self, identity: &DeviceIdentity, on_open: OpenCallback) {
        let device = self.scan(identity).map(|ports| {
            debug!("opening '{}' ({} ports)", identity.product, ports.len());
            Box::new(MidirDevice {
                client_name: self.client_name.clone(),
                product: identity.product.clone(),
                ports,
            }) as Box<dyn DeviceHandle>
        });
        on_open(device);
    }
}

struct MidirDevice {
    client_name: String,
    product: String,
    ports: Vec<(PortDirection, String)>,
}

impl MidirDevice {
    fn port_name(&self, index: usize, want: PortDirection) -> Result<String, PlatformError> {
        let (direction, name) = self
            .ports
            .get(index)
            .ok_or_else(|| PlatformError::PortNotFound {
                product: self.product.clone(),
                index,
            })?;
        if *direction != want {
            return Err(PlatformError::WrongDirection {
                product: self.product.clone(),
                index,
            });
        }
        Ok(name.clone())
    }
}

impl DeviceHandle for MidirDevice {
    fn open_output(
        &mut self,
        index: usize,
        receiver: ByteReceiver,
    ) -> Result<Box<dyn OutputPort>, PlatformError> {
        let name = self.port_name(index, PortDirection::Output)?;

        let midi_in = MidiInput::new(&self.client_name)
            .map_err(|e| PlatformError::Backend(e.to_string()))?;
        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| midi_in.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| PlatformError::PortNotFound {
                product: self.product.clone(),
                index,
            })?;

        let mut receiver = receiver;
        let conn = midi_in
            .connect(&port, &name, move |_timestamp, data, _| receiver(data), ())
            .map_err(|e| PlatformError::Backend(e.to_string()))?;

        debug!("connected to output port '{}'", name);
        Ok(Box::new(MidirOutputPort {
            conn: Some(conn),
            name,
        }))
    }

    fn open_input(&mut self, index: usize) -> Result<Box<dyn InputPort>, PlatformError> {
        let name = self.port_name(index, PortDirection::Input)?;

        let midi_out = MidiOutput::new(&self.client_name)
            .map_err(|e| PlatformError::Backend(e.to_string()))?;
        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| PlatformError::PortNotFound {
                product: self.product.clone(),
                index,
            })?;

        let conn = midi_out
            .connect(&port, &name)
            .map_err(|e| PlatformError::Backend(e.to_string()))?;

        debug!("connected to input port '{}'", name);
        Ok(Box::new(MidirInputPort {
            conn: Some(conn),
            name,
        }))
    }

    fn close(&mut self) -> Result<(), PlatformError> {
        // Connections are owned by the port handles; nothing device-level
        // to release with midir.
        Ok(())
    }
}

struct MidirOutputPort {
    conn: Option<MidiInputConnection<()>>,
    name: String,
}

impl OutputPort for MidirOutputPort {
    fn close(&mut self) -> Result<(), PlatformError> {
        if self.conn.take().is_some() {
            debug!("closed output port '{}'", self.name);
        }
        Ok(())
    }
}

struct MidirInputPort {
    conn: Option<MidiOutputConnection>,
    name: String,
}

impl InputPort for MidirInputPort {
    fn send(&mut self, bytes: &[u8]) -> Result<(), PlatformError> {
        match self.conn.as_mut() {
            Some(conn) => conn
                .send(bytes)
                .map_err(|e| PlatformError::Backend(e.to_string())),
            None => Err(PlatformError::PortClosed),
        }
    }

    fn close(&mut self) -> Result<(), PlatformError> {
        if self.conn.take().is_some() {
            debug!("closed input port '{}'", self.name);
        }
        Ok(())
    }
}

/// Print every host MIDI port, for `--list-ports`.
pub fn print_ports(client_name: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    use colored::Colorize;

    let midi_in = MidiInput::new(client_name).context("Failed to create MIDI input")?;
    let midi_out = MidiOutput::new(client_name).context("Failed to create MIDI output")?;

    println!("\n{}", "=== MIDI Input Ports ===".bold());
    for (i, port) in midi_in.ports().iter().enumerate() {
        if let Ok(name) = midi_in.port_name(port) {
            println!("  {}: {}", i, name);
        }
    }

    println!("\n{}", "=== MIDI Output Ports ===".bold());
    for (i, port) in midi_out.ports().iter().enumerate() {
        if let Ok(name) = midi_out.port_name(port) {
            println!("  {}: {}", i, name);
        }
    }
    println!();

    Ok(())
}
