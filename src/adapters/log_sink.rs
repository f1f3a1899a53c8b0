//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured multiplexer events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A debug-characteristic or telemetry adapter would implement the same
//! trait.

use log::info;

use crate::app::events::MuxEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MuxEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MuxEvent) {
        match event {
            MuxEvent::ClientRegistered { handle } => {
                info!("CLIENT | registered {}", handle);
            }
            MuxEvent::ClientUnregistered { handle } => {
                info!("CLIENT | unregistered {}", handle);
            }
            MuxEvent::PayloadPushed { handle } => {
                info!("ADV    | payload for {} on air", handle);
            }
            MuxEvent::UpdateDeferred { handle } => {
                info!("ADV    | update for {} deferred to rotation", handle);
            }
            MuxEvent::RotationStarted => {
                info!("ROTATE | on");
            }
            MuxEvent::RotationStopped => {
                info!("ROTATE | off");
            }
            MuxEvent::AdvertisingStopped => {
                info!("ADV    | radio stopped");
            }
        }
    }
}
