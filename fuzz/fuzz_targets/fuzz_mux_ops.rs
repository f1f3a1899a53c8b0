//! Fuzz target: `AdvMultiplexer` operation sequences
//!
//! Drives arbitrary register / unregister / advertise / stop / tick
//! sequences decoded from raw bytes and verifies:
//! - No panics under arbitrary inputs (including wild raw handles)
//! - `active_count <= registered_count <= MAX_CLIENTS`
//! - Rotation flag is derived from the active count, never stuck
//!
//! cargo fuzz run fuzz_mux_ops

#![no_main]

use libfuzzer_sys::fuzz_target;

use advmux::app::events::MuxEvent;
use advmux::app::ports::{DriverError, EventSink, RadioPort};
use advmux::app::service::AdvMultiplexer;
use advmux::config::{MAX_CLIENTS, PAYLOAD_LEN};
use advmux::table::{ClientId, Handle, Payload};

struct NullRadio;
impl RadioPort for NullRadio {
    fn configure_and_start(&mut self, _payload: &Payload) -> Result<(), DriverError> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct NullSink;
impl EventSink for NullSink {
    fn emit(&mut self, _event: &MuxEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let mut mux = AdvMultiplexer::new();
    let mut radio = NullRadio;
    let mut sink = NullSink;

    // Each op consumes two bytes: discriminant + argument.
    for chunk in data.chunks_exact(2) {
        let (op, arg) = (chunk[0], chunk[1]);
        let result = match op % 7 {
            0 => mux.register(ClientId(u32::from(arg)), &mut sink).map(|_| ()),
            1 => mux.unregister(ClientId(u32::from(arg)), &mut radio, &mut sink),
            2 => mux.unregister_handle(Handle::from_raw(arg), &mut radio, &mut sink),
            3 => mux.advertise(
                Handle::from_raw(arg),
                Some(Payload::new([arg; PAYLOAD_LEN])),
                &mut radio,
                &mut sink,
            ),
            4 => mux.advertise(Handle::from_raw(arg), None, &mut radio, &mut sink),
            5 => mux.advertise_stop(Handle::from_raw(arg), &mut radio, &mut sink),
            _ => mux.tick(&mut radio, &mut sink),
        };
        // The null radio never fails, so the only legal error is a full
        // table on register.
        if let Err(e) = result {
            assert_eq!(e, advmux::Error::CapacityExceeded);
        }

        assert!(mux.registered_count() <= MAX_CLIENTS);
        assert!(mux.active_count() <= mux.registered_count());
        assert_eq!(mux.rotation_enabled(), mux.active_count() >= 2);
    }
});
