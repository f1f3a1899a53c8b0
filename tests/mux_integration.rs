//! Integration tests: AdvMultiplexer → RadioPort / EventSink.

use advmux::Error;
use advmux::app::events::MuxEvent;
use advmux::app::ports::{DriverError, EventSink, RadioPort};
use advmux::app::service::AdvMultiplexer;
use advmux::config::{FAST_PATH_LIMIT, MAX_CLIENTS, PAYLOAD_LEN};
use advmux::table::{ClientId, Handle, Payload};

// ── Mock implementations ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RadioCall {
    Push(Payload),
    Stop,
}

struct MockRadio {
    calls: Vec<RadioCall>,
    fail_next: Option<DriverError>,
}

impl MockRadio {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail_next: None,
        }
    }

    fn pushes(&self) -> Vec<Payload> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Push(p) => Some(*p),
                RadioCall::Stop => None,
            })
            .collect()
    }

    fn stop_count(&self) -> usize {
        self.calls.iter().filter(|c| **c == RadioCall::Stop).count()
    }
}

impl RadioPort for MockRadio {
    fn configure_and_start(&mut self, payload: &Payload) -> Result<(), DriverError> {
        if let Some(e) = self.fail_next.take() {
            return Err(e);
        }
        self.calls.push(RadioCall::Push(*payload));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        if let Some(e) = self.fail_next.take() {
            return Err(e);
        }
        self.calls.push(RadioCall::Stop);
        Ok(())
    }
}

struct RecordingSink {
    events: Vec<MuxEvent>,
}

impl RecordingSink {
    fn new() -> Self {
        Self { events: Vec::new() }
    }

    fn count(&self, pred: impl Fn(&MuxEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, e: &MuxEvent) {
        self.events.push(*e);
    }
}

fn make_mux() -> (AdvMultiplexer, MockRadio, RecordingSink) {
    (AdvMultiplexer::new(), MockRadio::new(), RecordingSink::new())
}

fn payload(fill: u8) -> Payload {
    Payload::new([fill; PAYLOAD_LEN])
}

/// Run ticks until every slot's out-of-turn credit is consumed, so the
/// next burst starts from a freshly serviced state.
fn settle(mux: &mut AdvMultiplexer, radio: &mut MockRadio, sink: &mut RecordingSink) {
    for _ in 0..MAX_CLIENTS {
        mux.tick(radio, sink).unwrap();
    }
}

// ── Registration ──────────────────────────────────────────────

#[test]
fn registration_is_idempotent() {
    let (mut mux, _radio, mut sink) = make_mux();

    let first = mux.register(ClientId(7), &mut sink).unwrap();
    let second = mux.register(ClientId(7), &mut sink).unwrap();

    assert_eq!(first, second, "same identity must keep its handle");
    assert_eq!(mux.registered_count(), 1);
    assert_eq!(mux.active_count(), 0, "registration alone is not active");
    assert_eq!(
        sink.count(|e| matches!(e, MuxEvent::ClientRegistered { .. })),
        1,
        "re-registration must not re-announce"
    );
}

#[test]
fn capacity_bound_rejects_extra_client() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let mut handles = Vec::new();
    for n in 0..MAX_CLIENTS as u32 {
        handles.push(mux.register(ClientId(n), &mut sink).unwrap());
    }
    assert_eq!(
        mux.register(ClientId(999), &mut sink),
        Err(Error::CapacityExceeded)
    );

    // Prior handles stay valid after the failed registration.
    for (n, h) in handles.iter().enumerate() {
        mux.advertise(*h, Some(payload(n as u8)), &mut radio, &mut sink)
            .unwrap();
    }
    assert_eq!(mux.active_count(), MAX_CLIENTS);
}

#[test]
fn released_handle_is_reused_clean() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let h = mux.register(ClientId(1), &mut sink).unwrap();
    mux.advertise(h, Some(payload(0xAA)), &mut radio, &mut sink)
        .unwrap();
    mux.unregister(ClientId(1), &mut radio, &mut sink).unwrap();

    let h2 = mux.register(ClientId(2), &mut sink).unwrap();
    assert_eq!(h2, h, "first-fit must reuse the freed low slot");
    assert_eq!(mux.active_count(), 0, "reused slot starts without payload");

    // First advertise on the reused slot behaves like a brand-new client:
    // exactly one immediate push.
    radio.calls.clear();
    mux.advertise(h2, Some(payload(0xBB)), &mut radio, &mut sink)
        .unwrap();
    assert_eq!(radio.pushes(), vec![payload(0xBB)]);
}

// ── Update path ───────────────────────────────────────────────

#[test]
fn new_client_is_visible_immediately() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let h = mux.register(ClientId(1), &mut sink).unwrap();
    mux.advertise(h, Some(payload(0x11)), &mut radio, &mut sink)
        .unwrap();

    assert_eq!(radio.pushes(), vec![payload(0x11)]);
    assert_eq!(mux.active_count(), 1);
}

#[test]
fn rotation_follows_active_count() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let a = mux.register(ClientId(1), &mut sink).unwrap();
    let b = mux.register(ClientId(2), &mut sink).unwrap();

    mux.advertise(a, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    assert!(!mux.rotation_enabled(), "one active client needs no rotation");

    mux.advertise(b, Some(payload(2)), &mut radio, &mut sink)
        .unwrap();
    assert!(mux.rotation_enabled(), "second active client starts rotation");
    assert_eq!(sink.count(|e| matches!(e, MuxEvent::RotationStarted)), 1);

    mux.advertise_stop(b, &mut radio, &mut sink).unwrap();
    assert!(!mux.rotation_enabled(), "back to one client stops rotation");
    assert_eq!(sink.count(|e| matches!(e, MuxEvent::RotationStopped)), 1);
}

#[test]
fn fast_path_is_bounded_per_rotation_visit() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let a = mux.register(ClientId(1), &mut sink).unwrap();
    let b = mux.register(ClientId(2), &mut sink).unwrap();
    mux.advertise(a, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise(b, Some(payload(2)), &mut radio, &mut sink)
        .unwrap();
    settle(&mut mux, &mut radio, &mut sink);

    // Burst FAST_PATH_LIMIT + 3 updates to one handle with no tick in
    // between: exactly FAST_PATH_LIMIT of them reach the radio.
    radio.calls.clear();
    let burst = FAST_PATH_LIMIT + 3;
    for n in 0..burst {
        mux.advertise(a, Some(payload(0x10 + n)), &mut radio, &mut sink)
            .unwrap();
    }
    assert_eq!(radio.pushes().len(), FAST_PATH_LIMIT as usize);
    assert_eq!(
        sink.count(|e| matches!(e, MuxEvent::UpdateDeferred { .. })),
        3
    );
    assert_eq!(mux.counters().deferred_updates, 3);
}

#[test]
fn single_active_client_is_never_debounced() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let h = mux.register(ClientId(1), &mut sink).unwrap();
    for n in 0..20 {
        mux.advertise(h, Some(payload(n)), &mut radio, &mut sink)
            .unwrap();
    }
    assert_eq!(radio.pushes().len(), 20);
    assert_eq!(mux.counters().deferred_updates, 0);
}

#[test]
fn deferred_payload_rides_a_later_rotation_visit() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let a = mux.register(ClientId(1), &mut sink).unwrap();
    let b = mux.register(ClientId(2), &mut sink).unwrap();
    mux.advertise(a, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise(b, Some(payload(2)), &mut radio, &mut sink)
        .unwrap();
    settle(&mut mux, &mut radio, &mut sink);

    // Burst past the budget; the last payload is stored but not pushed.
    for n in 0..FAST_PATH_LIMIT + 2 {
        mux.advertise(a, Some(payload(0x20 + n)), &mut radio, &mut sink)
            .unwrap();
    }
    let latest = payload(0x20 + FAST_PATH_LIMIT + 1);
    assert!(!radio.pushes().contains(&latest));

    // The slot's next visit only consumes the leftover credit; the visit
    // after that finally airs the stored payload. This is the documented
    // stale-payload window of the debounce policy.
    radio.calls.clear();
    for _ in 0..2 * MAX_CLIENTS {
        mux.tick(&mut radio, &mut sink).unwrap();
    }
    assert!(radio.pushes().contains(&latest));
}

// ── Stop path ─────────────────────────────────────────────────

#[test]
fn last_client_leaving_stops_the_radio() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let h = mux.register(ClientId(1), &mut sink).unwrap();
    mux.advertise(h, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise_stop(h, &mut radio, &mut sink).unwrap();

    assert_eq!(radio.stop_count(), 1);
    assert_eq!(mux.active_count(), 0);
    assert_eq!(sink.count(|e| matches!(e, MuxEvent::AdvertisingStopped)), 1);

    // A second stop on the now-empty slot is a no-op, not another stop().
    mux.advertise_stop(h, &mut radio, &mut sink).unwrap();
    assert_eq!(radio.stop_count(), 1);
}

#[test]
fn advertise_none_is_advertise_stop() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let h = mux.register(ClientId(1), &mut sink).unwrap();
    mux.advertise(h, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise(h, None, &mut radio, &mut sink).unwrap();

    assert_eq!(mux.active_count(), 0);
    assert_eq!(radio.stop_count(), 1);
}

#[test]
fn unregister_active_client_routes_through_stop() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let a = mux.register(ClientId(1), &mut sink).unwrap();
    let b = mux.register(ClientId(2), &mut sink).unwrap();
    mux.advertise(a, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise(b, Some(payload(2)), &mut radio, &mut sink)
        .unwrap();

    mux.unregister_handle(b, &mut radio, &mut sink).unwrap();
    assert_eq!(mux.active_count(), 1);
    assert!(!mux.rotation_enabled());
    assert_eq!(mux.registered_count(), 1);

    mux.unregister(ClientId(1), &mut radio, &mut sink).unwrap();
    assert_eq!(mux.active_count(), 0);
    assert_eq!(radio.stop_count(), 1, "radio stops when the last payload goes");
}

// ── Rotation ──────────────────────────────────────────────────

#[test]
fn rotation_gives_each_client_one_push_per_cycle() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let mut handles = Vec::new();
    for n in 0..3u32 {
        let h = mux.register(ClientId(n), &mut sink).unwrap();
        mux.advertise(h, Some(payload(n as u8)), &mut radio, &mut sink)
            .unwrap();
        handles.push(h);
    }

    // Each initial advertise pushed immediately and left a skip credit;
    // the first three visits consume those credits silently.
    radio.calls.clear();
    for _ in 0..3 {
        mux.tick(&mut radio, &mut sink).unwrap();
    }
    assert!(radio.pushes().is_empty(), "credits consumed without pushes");

    // From a settled state, one full cycle shows each client exactly once.
    for _ in 0..3 {
        mux.tick(&mut radio, &mut sink).unwrap();
    }
    let pushes = radio.pushes();
    assert_eq!(pushes.len(), 3);
    for n in 0..3u8 {
        assert_eq!(
            pushes.iter().filter(|p| **p == payload(n)).count(),
            1,
            "client {} must air exactly once per cycle",
            n
        );
    }
}

#[test]
fn end_to_end_two_clients() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let a = mux.register(ClientId(0xA), &mut sink).unwrap();
    let b = mux.register(ClientId(0xB), &mut sink).unwrap();

    mux.advertise(a, Some(payload(0xA1)), &mut radio, &mut sink)
        .unwrap();
    assert_eq!(radio.pushes(), vec![payload(0xA1)]);
    assert_eq!(mux.active_count(), 1);
    assert!(!mux.rotation_enabled());

    mux.advertise(b, Some(payload(0xB1)), &mut radio, &mut sink)
        .unwrap();
    assert_eq!(radio.pushes(), vec![payload(0xA1), payload(0xB1)]);
    assert_eq!(mux.active_count(), 2);
    assert!(mux.rotation_enabled());

    // Both slots hold a skip credit from their initial push: the first two
    // ticks consume them without touching the radio.
    radio.calls.clear();
    mux.tick(&mut radio, &mut sink).unwrap();
    mux.tick(&mut radio, &mut sink).unwrap();
    assert!(radio.pushes().is_empty());

    // Third tick wraps back around and puts the next payload on air.
    mux.tick(&mut radio, &mut sink).unwrap();
    assert_eq!(radio.pushes().len(), 1);
}

#[test]
fn tick_is_noop_without_rotation() {
    let (mut mux, mut radio, mut sink) = make_mux();

    for _ in 0..5 {
        mux.tick(&mut radio, &mut sink).unwrap();
    }
    assert!(radio.calls.is_empty());
    assert_eq!(mux.counters().rotation_ticks, 0);
}

// ── Error handling ────────────────────────────────────────────

#[test]
fn driver_failure_propagates_from_advertise() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let h = mux.register(ClientId(1), &mut sink).unwrap();
    radio.fail_next = Some(DriverError::StartFailed);
    let result = mux.advertise(h, Some(payload(1)), &mut radio, &mut sink);

    assert_eq!(result, Err(Error::Driver(DriverError::StartFailed)));
    // Bookkeeping committed before the radio call: the client is active
    // and a later rotation pass will retry the slot.
    assert_eq!(mux.active_count(), 1);
}

#[test]
fn driver_failure_propagates_from_tick() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let a = mux.register(ClientId(1), &mut sink).unwrap();
    let b = mux.register(ClientId(2), &mut sink).unwrap();
    mux.advertise(a, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise(b, Some(payload(2)), &mut radio, &mut sink)
        .unwrap();
    settle(&mut mux, &mut radio, &mut sink);

    radio.fail_next = Some(DriverError::ConfigFailed);
    let result = mux.tick(&mut radio, &mut sink);
    assert_eq!(result, Err(Error::Driver(DriverError::ConfigFailed)));
}

#[test]
fn invalid_handles_are_silent_but_observable() {
    let (mut mux, mut radio, mut sink) = make_mux();

    let out_of_range = Handle::from_raw(0xFF);
    let unallocated = Handle::from_raw(3);

    mux.advertise(out_of_range, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise(unallocated, Some(payload(1)), &mut radio, &mut sink)
        .unwrap();
    mux.advertise_stop(out_of_range, &mut radio, &mut sink)
        .unwrap();
    mux.unregister_handle(unallocated, &mut radio, &mut sink)
        .unwrap();

    assert!(radio.calls.is_empty(), "ignored calls never reach the radio");
    assert_eq!(mux.active_count(), 0);
    assert_eq!(mux.counters().ignored_calls, 4);
}
