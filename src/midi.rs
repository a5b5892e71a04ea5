//! MIDI message parsing, encoding, and hex diagnostics.
//!
//! Only the two message families the bridge speaks are modeled: control
//! change (status `0xB0`) and program change (status `0xC0`), both on
//! MIDI channel 1 — the only channel either device uses.

use std::fmt;

/// Control change status byte (channel 1).
pub const STATUS_CONTROL_CHANGE: u8 = 0xb0;
/// Program change status byte (channel 1).
pub const STATUS_PROGRAM_CHANGE: u8 = 0xc0;

/// FBV volume pedal controller.
pub const CC_VOLUME: u8 = 0x07;
/// FBV expression (wah) pedal controller.
pub const CC_EXPRESSION: u8 = 0x0b;
/// FBV auxiliary footswitch controller.
pub const CC_FOOTSWITCH: u8 = 0x66;
/// First of the four FBV channel-button controllers (0x14..0x18).
pub const CC_BUTTON_BASE: u8 = 0x14;

/// Controller the POD expects expression-pedal values on.
pub const POD_CC_EXPRESSION: u8 = 0x04;
/// Controller the POD expects the footswitch state on.
pub const POD_CC_FOOTSWITCH: u8 = 0x2b;
/// Controller carrying the tap-tempo pulse toward the POD.
pub const POD_CC_TAP: u8 = 0x40;

/// A parsed MIDI message from either device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Control Change: controller (0-127), value (0-127)
    ControlChange { controller: u8, value: u8 },

    /// Program Change: program (0-127)
    ProgramChange { program: u8 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes.
    ///
    /// Returns `None` for any status the bridge does not speak, and for
    /// partial messages (a status byte without its full complement of
    /// data bytes).
    pub fn parse(data: &[u8]) -> Option<Self> {
        match *data.first()? {
            STATUS_CONTROL_CHANGE if data.len() >= 3 => Some(MidiMessage::ControlChange {
                controller: data[1] & 0x7f,
                value: data[2] & 0x7f,
            }),
            STATUS_PROGRAM_CHANGE if data.len() >= 2 => Some(MidiMessage::ProgramChange {
                program: data[1] & 0x7f,
            }),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::ControlChange { controller, value } => {
                vec![STATUS_CONTROL_CHANGE, controller & 0x7f, value & 0x7f]
            }
            MidiMessage::ProgramChange { program } => {
                vec![STATUS_PROGRAM_CHANGE, program & 0x7f]
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::ControlChange { controller, value } => {
                write!(f, "CC cc:{} v:{}", controller, value)
            }
            MidiMessage::ProgramChange { program } => {
                write!(f, "ProgramChange p:{}", program)
            }
        }
    }
}

/// Format raw MIDI bytes as a `0x`-prefixed lowercase hex string,
/// two digits per byte, no separators. This is the wire format quoted
/// in every `*_RX`/`*_TX` event.
pub fn format_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_change_parsing() {
        let data = vec![0xb0, 0x07, 100];
        let msg = MidiMessage::parse(&data).unwrap();

        assert_eq!(
            msg,
            MidiMessage::ControlChange {
                controller: 7,
                value: 100,
            }
        );
    }

    #[test]
    fn test_program_change_parsing() {
        let data = vec![0xc0, 0x03];
        let msg = MidiMessage::parse(&data).unwrap();

        assert_eq!(msg, MidiMessage::ProgramChange { program: 3 });
    }

    #[test]
    fn test_partial_messages_rejected() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(MidiMessage::parse(&[0xb0]), None);
        assert_eq!(MidiMessage::parse(&[0xb0, 0x07]), None);
        assert_eq!(MidiMessage::parse(&[0xc0]), None);
    }

    #[test]
    fn test_foreign_statuses_rejected() {
        // Note On, and channel-2 variants of the recognized statuses
        assert_eq!(MidiMessage::parse(&[0x90, 60, 100]), None);
        assert_eq!(MidiMessage::parse(&[0xb1, 0x07, 1]), None);
        assert_eq!(MidiMessage::parse(&[0xc1, 0x01]), None);
    }

    #[test]
    fn test_encode() {
        let msg = MidiMessage::ControlChange {
            controller: POD_CC_TAP,
            value: 0x7f,
        };
        assert_eq!(msg.encode(), vec![0xb0, 0x40, 0x7f]);

        let msg = MidiMessage::ProgramChange { program: 3 };
        assert_eq!(msg.encode(), vec![0xc0, 0x03]);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xb0, 0x16, 0x7f]), "0xb0167f");
        assert_eq!(format_hex(&[0xc0, 0x03]), "0xc003");
        assert_eq!(format_hex(&[]), "0x");
    }
}
