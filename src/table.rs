//! Client registration table.
//!
//! Fixed-capacity arena mapping a small integer [`Handle`] to a registered
//! client identity and its current payload. All slots are stack-allocated;
//! a slot is either fully free (`None`) or fully allocated to exactly one
//! identity. Handles are reused after release, so callers must not retain
//! a numeric handle across an unregister/register cycle.

use crate::config::{MAX_CLIENTS, PAYLOAD_LEN};

// ═══════════════════════════════════════════════════════════════
//  Identity, handle, payload
// ═══════════════════════════════════════════════════════════════

/// Opaque client identity chosen by the registering subsystem.
///
/// Used for reverse lookup and to make registration idempotent — the same
/// identity always resolves to the same slot while it stays registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u32);

/// Slot index in `[0, MAX_CLIENTS)`, stable for the registration's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle(u8);

impl Handle {
    /// Reconstruct a handle from its raw value.
    ///
    /// Exists for callers that stored the numeric value (e.g. across an RPC
    /// boundary). Out-of-range or stale values are not rejected here — every
    /// table/multiplexer operation treats them as a silent no-op.
    pub fn from_raw(value: u8) -> Self {
        Self(value)
    }

    /// Raw slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether the handle falls inside the slot range.
    pub fn in_range(self) -> bool {
        (self.0 as usize) < MAX_CLIENTS
    }
}

impl core::fmt::Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One advertising payload — 31 opaque bytes, filled by the client.
///
/// Contents are not parsed or validated here; the multiplexer only moves
/// whole buffers to the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Payload {
    bytes: [u8; PAYLOAD_LEN],
}

impl Payload {
    pub fn new(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a payload from a shorter buffer, zero-padded to `PAYLOAD_LEN`.
    /// Returns `None` if `data` exceeds the payload size.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() > PAYLOAD_LEN {
            return None;
        }
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.bytes
    }
}

// ═══════════════════════════════════════════════════════════════
//  Slot table
// ═══════════════════════════════════════════════════════════════

/// Live state of one allocated slot.
#[derive(Debug, Clone)]
pub struct Slot {
    /// Identity that owns this slot.
    pub id: ClientId,
    /// Current payload, or `None` while the client is not advertising.
    pub payload: Option<Payload>,
    /// Out-of-turn pushes since the last rotation visit. A non-zero value
    /// makes the next rotation visit consume the turn without a radio call.
    pub skip_credit: u8,
}

/// Fixed-capacity registry of advertising clients.
pub struct ClientTable {
    slots: [Option<Slot>; MAX_CLIENTS],
}

impl ClientTable {
    pub fn new() -> Self {
        Self {
            slots: [const { None }; MAX_CLIENTS],
        }
    }

    /// Allocate a slot for `id`, or return the existing handle unchanged if
    /// `id` is already registered. `None` when all slots are taken.
    ///
    /// Slot selection is first-fit lowest index.
    pub fn allocate(&mut self, id: ClientId) -> Option<Handle> {
        if let Some(handle) = self.find(id) {
            return Some(handle);
        }
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(Slot {
                    id,
                    payload: None,
                    skip_credit: 0,
                });
                return Some(Handle(index as u8));
            }
        }
        None // All slots taken.
    }

    /// Linear scan for the handle owned by `id`.
    pub fn find(&self, id: ClientId) -> Option<Handle> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|s| s.id == id))
            .map(|index| Handle(index as u8))
    }

    /// Free a slot. No-op for out-of-range or already-free handles.
    ///
    /// Clears the whole slot, so a later registration reusing this handle
    /// starts with no payload and no skip credit.
    pub fn release(&mut self, handle: Handle) {
        if handle.in_range() {
            self.slots[handle.index()] = None;
        }
    }

    /// Allocated slot behind `handle`, or `None` for out-of-range/free.
    pub fn get(&self, handle: Handle) -> Option<&Slot> {
        if handle.in_range() {
            self.slots[handle.index()].as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Slot> {
        if handle.in_range() {
            self.slots[handle.index()].as_mut()
        } else {
            None
        }
    }

    /// Allocated slot at a raw index (rotation scan path).
    pub fn get_mut_at(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Number of currently registered clients.
    pub fn registered_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Number of slots currently holding a payload.
    pub fn payload_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.as_ref().is_some_and(|slot| slot.payload.is_some()))
            .count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
