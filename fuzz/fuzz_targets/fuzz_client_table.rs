//! Fuzz target: `ClientTable` arena
//!
//! Exercises allocate / find / release with arbitrary identities and raw
//! handles and verifies:
//! - No panics under arbitrary inputs
//! - First-fit allocation never exceeds `MAX_CLIENTS`
//! - `find` after `allocate` is always consistent
//!
//! cargo fuzz run fuzz_client_table

#![no_main]

use libfuzzer_sys::fuzz_target;

use advmux::config::MAX_CLIENTS;
use advmux::table::{ClientId, ClientTable, Handle};

fuzz_target!(|data: &[u8]| {
    let mut table = ClientTable::new();

    for chunk in data.chunks_exact(2) {
        let (op, arg) = (chunk[0], chunk[1]);
        match op % 3 {
            0 => {
                if let Some(handle) = table.allocate(ClientId(u32::from(arg))) {
                    assert!(handle.index() < MAX_CLIENTS);
                    assert_eq!(table.find(ClientId(u32::from(arg))), Some(handle));
                } else {
                    assert_eq!(table.registered_count(), MAX_CLIENTS);
                }
            }
            1 => {
                table.release(Handle::from_raw(arg));
                // A released (or never-allocated) raw handle no longer
                // resolves to a slot.
                assert!(table.get(Handle::from_raw(arg)).is_none());
            }
            _ => {
                let _ = table.find(ClientId(u32::from(arg)));
            }
        }
        assert!(table.payload_count() <= table.registered_count());
        assert!(table.registered_count() <= MAX_CLIENTS);
    }
});
