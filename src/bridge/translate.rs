//! Message translation between the FBV vocabulary and the POD's.
//!
//! One handler per incoming message, parameterized by which device it
//! came from. The FBV path rewrites pedal and switch controllers,
//! resolves the four channel buttons against the current bank/slot, and
//! pushes the result into the POD's input port; the POD path reflects
//! program changes back into the shared channel state.
//!
//! Lock discipline: the sequence "update channel → send to POD → emit
//! channel-change" runs in one critical section, so a concurrent
//! POD-originated update can never interleave with it. The outbound
//! send is non-blocking by contract of the transport.

use std::sync::Arc;
use tracing::warn;

use super::Target;
use crate::events::{BridgeEvent, EventKind, EventSink};
use crate::midi::{self, format_hex, MidiMessage};
use crate::state::{SharedState, FBV_BUTTONS};

/// Handle one raw MIDI message arriving from `source`.
pub fn on_message(
    source: Target,
    state: &SharedState,
    sink: &Arc<dyn EventSink>,
    pedal_threshold: u8,
    data: &[u8],
) {
    match source {
        Target::Fbv => on_fbv_message(state, sink, pedal_threshold, data),
        Target::Pod => on_pod_message(state, sink, data),
    }
}

/// A pedal counts as moved once it travelled at least `threshold` steps
/// from the last forwarded position. Threshold 0 forwards everything.
fn pedal_moved(last: u8, value: u8, threshold: u8) -> bool {
    last.abs_diff(value) >= threshold
}

fn on_fbv_message(
    state: &SharedState,
    sink: &Arc<dyn EventSink>,
    pedal_threshold: u8,
    data: &[u8],
) {
    let parsed = MidiMessage::parse(data);

    let mut processed = false;
    let mut out: Option<Vec<u8>> = None;
    let mut new_channel: Option<u8> = None; // one-based
    let mut sent = false;

    {
        let mut st = state.lock();

        if let Some(MidiMessage::ControlChange { controller, value }) = parsed {
            match controller {
                midi::CC_VOLUME => {
                    if pedal_moved(st.last_volume, value, pedal_threshold) {
                        st.last_volume = value;
                        out = Some(vec![midi::STATUS_CONTROL_CHANGE, midi::CC_VOLUME, value]);
                    }
                    processed = true;
                }
                midi::CC_EXPRESSION => {
                    if pedal_moved(st.last_expression, value, pedal_threshold) {
                        st.last_expression = value;
                        out = Some(vec![
                            midi::STATUS_CONTROL_CHANGE,
                            midi::POD_CC_EXPRESSION,
                            value,
                        ]);
                    }
                    processed = true;
                }
                midi::CC_FOOTSWITCH => {
                    let switch = if value != 0 { 0x40 } else { 0x00 };
                    out = Some(vec![
                        midi::STATUS_CONTROL_CHANGE,
                        midi::POD_CC_FOOTSWITCH,
                        switch,
                    ]);
                    processed = true;
                }
                c if (midi::CC_BUTTON_BASE..midi::CC_BUTTON_BASE + FBV_BUTTONS).contains(&c) => {
                    let button = c - midi::CC_BUTTON_BASE;
                    if value > 0 {
                        if button == st.slot() {
                            // Tap: pulse only, channel untouched.
                            out = Some(vec![midi::STATUS_CONTROL_CHANGE, midi::POD_CC_TAP, 0x7f]);
                        } else {
                            // Channel select: keep the bank, change the slot.
                            st.channel = st.bank() * FBV_BUTTONS + button;
                            out = Some(vec![midi::STATUS_PROGRAM_CHANGE, st.slot() + 1]);
                            new_channel = Some(st.channel + 1);
                        }
                    }
                    // Releases are recognized too, they just produce nothing.
                    processed = true;
                }
                _ => {}
            }
        }

        if let Some(buf) = out.as_ref() {
            if let Some(port) = st.pod_input_port.as_mut() {
                match port.send(buf) {
                    Ok(()) => sent = true,
                    Err(e) => warn!("POD send failed: {}", e),
                }
            }
        }

        if let Some(channel) = new_channel {
            sink.emit(BridgeEvent::new(
                EventKind::CtlChn,
                channel.to_string(),
                i32::from(channel),
            ));
        }
    }

    sink.emit(BridgeEvent::new(
        EventKind::FbvRx,
        format_hex(data),
        if processed { 0 } else { -1 },
    ));
    if sent {
        sink.emit(BridgeEvent::new(
            EventKind::PodTx,
            format_hex(out.as_deref().unwrap_or_default()),
            0,
        ));
    }
}

fn on_pod_message(state: &SharedState, sink: &Arc<dyn EventSink>, data: &[u8]) {
    let mut processed = false;
    let mut new_channel = 0u8; // one-based, 0 = none

    if let Some(MidiMessage::ProgramChange { program }) = MidiMessage::parse(data) {
        let mut st = state.lock();
        // One-based on the wire; program 0 wraps, matching the original
        // hardware's byte arithmetic.
        st.channel = program.wrapping_sub(1);
        new_channel = program;
        processed = true;
    }

    sink.emit(BridgeEvent::new(
        EventKind::PodRx,
        format_hex(data),
        if processed { 0 } else { -1 },
    ));
    if new_channel > 0 {
        sink.emit(BridgeEvent::new(
            EventKind::CtlChn,
            new_channel.to_string(),
            i32::from(new_channel),
        ));
    }
}
