//! Advertising multiplexer — the hexagonal core.
//!
//! [`AdvMultiplexer`] shares the single hardware advertising set among up
//! to [`MAX_CLIENTS`] logical advertisers. It owns the registration
//! table, the rotation cursor, and the per-slot fast-path accounting.
//! All I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!  register / advertise ──▶ ┌────────────────────────┐ ──▶ RadioPort
//!                           │     AdvMultiplexer      │
//!  rotation tick ─────────▶ │  table · cursor · debounce │ ──▶ EventSink
//!                           └────────────────────────┘
//! ```
//!
//! Update policy: a client's first payload is pushed to the radio at once
//! (new advertisers must become visible without waiting a full rotation).
//! While rotation is running, subsequent changes are pushed immediately
//! only up to [`FAST_PATH_LIMIT`] times between two rotation visits;
//! beyond that the change is stored and the slot waits for its turn. With
//! zero or one active client there is no contention and every change is
//! pushed immediately.
//!
//! The host environment must serialize all calls into this type — client
//! calls and the rotation tick run on one loop, never concurrently. Each
//! public operation performs at most one radio call before returning.

use log::{debug, info, warn};

use crate::config::{FAST_PATH_LIMIT, MAX_CLIENTS};
use crate::diagnostics::MuxCounters;
use crate::error::{Error, Result};
use crate::table::{ClientId, ClientTable, Handle, Payload};

use super::events::MuxEvent;
use super::ports::{EventSink, RadioPort};

// ───────────────────────────────────────────────────────────────
// AdvMultiplexer
// ───────────────────────────────────────────────────────────────

/// Time-multiplexes one hardware advertising set across registered clients.
///
/// Construct exactly one per process (one per radio); the composition root
/// owns it and passes it by reference to every collaborator.
pub struct AdvMultiplexer {
    table: ClientTable,
    /// Slots currently holding a payload. Not the same as registered
    /// clients — a registered client with no payload is inactive.
    active_count: usize,
    /// Derived from `active_count`, never set independently.
    rotation_enabled: bool,
    /// Last slot index serviced by rotation; the scan starts just after it.
    cursor: usize,
    counters: MuxCounters,
}

impl AdvMultiplexer {
    pub fn new() -> Self {
        Self {
            table: ClientTable::new(),
            active_count: 0,
            rotation_enabled: false,
            cursor: 0,
            counters: MuxCounters::default(),
        }
    }

    // ── Registration ──────────────────────────────────────────

    /// Obtain (or create) the handle for `id`.
    ///
    /// Idempotent: re-registering an identity returns its existing handle
    /// unchanged. Fails with [`Error::CapacityExceeded`] when all slots
    /// are allocated. Never touches the radio.
    pub fn register(&mut self, id: ClientId, sink: &mut impl EventSink) -> Result<Handle> {
        let existing = self.table.find(id);
        let handle = self.table.allocate(id).ok_or(Error::CapacityExceeded)?;
        if existing.is_none() {
            info!("mux: registered client {}", handle);
            sink.emit(&MuxEvent::ClientRegistered { handle });
        }
        Ok(handle)
    }

    /// Release the slot owned by `id`. Unknown identities are a no-op.
    pub fn unregister(
        &mut self,
        id: ClientId,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match self.table.find(id) {
            Some(handle) => self.unregister_handle(handle, radio, sink),
            None => {
                debug!("mux: unregister for unknown identity ignored");
                Ok(())
            }
        }
    }

    /// Release a slot by handle. Invalid handles are counted and ignored.
    ///
    /// Any active payload is cleared through the stop path first, so
    /// `active_count` and the radio state stay consistent.
    pub fn unregister_handle(
        &mut self,
        handle: Handle,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if self.table.get(handle).is_none() {
            note_ignored(&mut self.counters, "unregister", handle);
            return Ok(());
        }
        self.advertise_stop(handle, radio, sink)?;
        self.table.release(handle);
        info!("mux: unregistered client {}", handle);
        sink.emit(&MuxEvent::ClientUnregistered { handle });
        Ok(())
    }

    // ── Update path ───────────────────────────────────────────

    /// Set or clear this client's payload. `None` is equivalent to
    /// [`advertise_stop`](Self::advertise_stop).
    ///
    /// Bookkeeping commits before the radio call: on a driver error the
    /// payload is already stored and the slot is retried naturally at its
    /// next rotation visit.
    pub fn advertise(
        &mut self,
        handle: Handle,
        payload: Option<Payload>,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let Some(payload) = payload else {
            return self.advertise_stop(handle, radio, sink);
        };

        let Some(slot) = self.table.get_mut(handle) else {
            // Counters only here — the failed lookup still holds the table
            // borrow through the else block.
            note_ignored(&mut self.counters, "advertise", handle);
            return Ok(());
        };

        let is_new = slot.payload.is_none();
        slot.payload = Some(payload);

        if is_new {
            // First payload: mark the slot as already shown so its next
            // rotation visit skips a redundant re-display, then make the
            // new advertiser visible immediately.
            slot.skip_credit = 1;
            self.active_count += 1;
            if self.active_count >= 2 && !self.rotation_enabled {
                self.rotation_enabled = true;
                info!("mux: {} active clients, rotation on", self.active_count);
                sink.emit(&MuxEvent::RotationStarted);
            }
            return self.push_payload(handle, &payload, radio, sink);
        }

        if self.rotation_enabled {
            slot.skip_credit = slot.skip_credit.saturating_add(1);
            if slot.skip_credit <= FAST_PATH_LIMIT {
                self.push_payload(handle, &payload, radio, sink)
            } else {
                // Fast-path budget spent; the stored payload rides along
                // at the slot's next rotation visit instead.
                self.counters.deferred_updates += 1;
                sink.emit(&MuxEvent::UpdateDeferred { handle });
                Ok(())
            }
        } else {
            // Zero or one active client: no contention, no debounce.
            self.push_payload(handle, &payload, radio, sink)
        }
    }

    // ── Stop path ─────────────────────────────────────────────

    /// Clear this client's payload. Invalid handles are counted and
    /// ignored; a slot with no payload is a no-op.
    ///
    /// Dropping to one active client disables rotation; dropping to zero
    /// stops the radio entirely.
    pub fn advertise_stop(
        &mut self,
        handle: Handle,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let Some(slot) = self.table.get_mut(handle) else {
            note_ignored(&mut self.counters, "advertise_stop", handle);
            return Ok(());
        };

        if slot.payload.is_none() {
            return Ok(());
        }
        slot.payload = None;
        slot.skip_credit = 0;
        self.active_count -= 1;
        debug_assert_eq!(self.active_count, self.table.payload_count());

        if self.active_count <= 1 && self.rotation_enabled {
            self.rotation_enabled = false;
            info!("mux: {} active client(s), rotation off", self.active_count);
            sink.emit(&MuxEvent::RotationStopped);
        }

        if self.active_count == 0 {
            radio.stop().map_err(Error::Driver)?;
            self.counters.radio_stops += 1;
            info!("mux: last active client left, advertising stopped");
            sink.emit(&MuxEvent::AdvertisingStopped);
        }
        Ok(())
    }

    // ── Rotation ──────────────────────────────────────────────

    /// Advance the round-robin rotation by one step.
    ///
    /// Invoked once per periodic tick; a no-op unless two or more clients
    /// are active. Scans at most [`MAX_CLIENTS`] slots starting just after
    /// the cursor: a slot holding a skip credit consumes its turn without
    /// a radio call, otherwise the first payload-bearing slot is pushed.
    /// At most one radio call per tick.
    ///
    /// Known quirk, kept as designed pending product review: a client that
    /// bursts past the fast-path budget and then goes quiet keeps showing
    /// its last pushed payload until rotation next visits its slot.
    pub fn tick(&mut self, radio: &mut impl RadioPort, sink: &mut impl EventSink) -> Result<()> {
        if !self.rotation_enabled {
            return Ok(());
        }
        self.counters.rotation_ticks += 1;

        for _ in 0..MAX_CLIENTS {
            self.cursor = (self.cursor + 1) % MAX_CLIENTS;

            let Some(slot) = self.table.get_mut_at(self.cursor) else {
                continue;
            };

            if slot.skip_credit > 0 {
                // Shown out-of-turn since its last visit: the turn is
                // consumed without a radio update.
                slot.skip_credit = 0;
                return Ok(());
            }

            if let Some(payload) = slot.payload {
                let handle = Handle::from_raw(self.cursor as u8);
                return self.push_payload(handle, &payload, radio, sink);
            }
        }

        // Full cycle with nothing to show. Unreachable while rotation is
        // enabled with at least one payload-bearing slot.
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Clients currently holding a payload.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Whether round-robin rotation is currently running.
    pub fn rotation_enabled(&self) -> bool {
        self.rotation_enabled
    }

    /// Clients currently holding a slot (with or without a payload).
    pub fn registered_count(&self) -> usize {
        self.table.registered_count()
    }

    /// Activity counters snapshot.
    pub fn counters(&self) -> MuxCounters {
        self.counters
    }

    // ── Internal ──────────────────────────────────────────────

    fn push_payload(
        &mut self,
        handle: Handle,
        payload: &Payload,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if let Err(e) = radio.configure_and_start(payload) {
            warn!("mux: radio push for {} failed: {}", handle, e);
            return Err(Error::Driver(e));
        }
        self.counters.radio_pushes += 1;
        sink.emit(&MuxEvent::PayloadPushed { handle });
        Ok(())
    }

}

/// Record a call ignored for an invalid handle — the documented silent
/// no-op, kept observable through the counters.
fn note_ignored(counters: &mut MuxCounters, op: &str, handle: Handle) {
    counters.ignored_calls += 1;
    debug!("mux: {} with invalid handle {} ignored", op, handle);
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::DriverError;
    use crate::config::PAYLOAD_LEN;

    struct NullRadio;
    impl RadioPort for NullRadio {
        fn configure_and_start(&mut self, _payload: &Payload) -> core::result::Result<(), DriverError> {
            Ok(())
        }
        fn stop(&mut self) -> core::result::Result<(), DriverError> {
            Ok(())
        }
    }

    struct NullSink;
    impl EventSink for NullSink {
        fn emit(&mut self, _event: &MuxEvent) {}
    }

    fn payload(fill: u8) -> Payload {
        Payload::new([fill; PAYLOAD_LEN])
    }

    #[test]
    fn single_client_updates_always_push() {
        let mut mux = AdvMultiplexer::new();
        let (mut radio, mut sink) = (NullRadio, NullSink);

        let h = mux.register(ClientId(1), &mut sink).unwrap();
        for n in 0..10 {
            mux.advertise(h, Some(payload(n)), &mut radio, &mut sink)
                .unwrap();
        }
        assert_eq!(mux.counters().radio_pushes, 10);
        assert_eq!(mux.counters().deferred_updates, 0);
        assert!(!mux.rotation_enabled());
    }

    #[test]
    fn invalid_handle_calls_are_counted_not_errors() {
        let mut mux = AdvMultiplexer::new();
        let (mut radio, mut sink) = (NullRadio, NullSink);
        let bogus = Handle::from_raw(0xFF);

        mux.advertise(bogus, Some(payload(1)), &mut radio, &mut sink)
            .unwrap();
        mux.advertise_stop(bogus, &mut radio, &mut sink).unwrap();
        mux.unregister_handle(bogus, &mut radio, &mut sink).unwrap();

        assert_eq!(mux.counters().ignored_calls, 3);
        assert_eq!(mux.counters().radio_pushes, 0);
    }

    #[test]
    fn stop_on_payloadless_slot_is_noop() {
        let mut mux = AdvMultiplexer::new();
        let (mut radio, mut sink) = (NullRadio, NullSink);

        let h = mux.register(ClientId(1), &mut sink).unwrap();
        mux.advertise_stop(h, &mut radio, &mut sink).unwrap();

        assert_eq!(mux.active_count(), 0);
        assert_eq!(mux.counters().radio_stops, 0, "radio never started");
        assert_eq!(mux.counters().ignored_calls, 0, "valid handle, not ignored");
    }

    #[test]
    fn tick_without_rotation_does_nothing() {
        let mut mux = AdvMultiplexer::new();
        let (mut radio, mut sink) = (NullRadio, NullSink);

        let h = mux.register(ClientId(1), &mut sink).unwrap();
        mux.advertise(h, Some(payload(1)), &mut radio, &mut sink)
            .unwrap();

        for _ in 0..5 {
            mux.tick(&mut radio, &mut sink).unwrap();
        }
        assert_eq!(mux.counters().rotation_ticks, 0);
        assert_eq!(mux.counters().radio_pushes, 1, "only the initial push");
    }
}
