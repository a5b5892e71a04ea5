//! Gateway bridging a Line 6 FBV Express Mk II foot controller to a
//! Line 6 Pocket POD.
//!
//! The FBV and the Pocket POD both speak MIDI but not each other's
//! dialect; this crate sits between them, translating the FBV's pedal,
//! footswitch, and channel-button messages into what the POD
//! understands, tracking the active channel from both directions, and
//! managing device attach/detach so either box can be (un)plugged at
//! any time.
//!
//! The [`bridge::Bridge`] is the core; [`platform`] isolates the host
//! MIDI subsystem behind traits (backed by `midir` in production,
//! mocked in tests); [`events`] carries status reporting to whatever
//! front end is attached.

pub mod bridge;
pub mod cli;
pub mod events;
pub mod midi;
pub mod platform;
pub mod state;

pub use bridge::{Bridge, Target};
pub use events::{BridgeEvent, ChannelSink, EventKind, EventSink};
