//! Outbound multiplexer events.
//!
//! The [`AdvMultiplexer`](super::service::AdvMultiplexer) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on
//! the other side decide what to do with them — log to serial, count them
//! in a test recorder, etc.

use crate::table::Handle;

/// Structured events emitted by the multiplexer core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxEvent {
    /// A new identity was allocated a slot.
    ClientRegistered { handle: Handle },

    /// A slot was released.
    ClientUnregistered { handle: Handle },

    /// This client's payload was programmed into the radio.
    PayloadPushed { handle: Handle },

    /// A payload change was stored but not pushed — the client exhausted
    /// its fast-path budget and waits for its next rotation visit.
    UpdateDeferred { handle: Handle },

    /// A second client became active; round-robin rotation is now running.
    RotationStarted,

    /// Active clients dropped to one or zero; rotation halted.
    RotationStopped,

    /// The last active client left and the radio was stopped.
    AdvertisingStopped,
}
