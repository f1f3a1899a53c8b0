//! Timer-driven event system.
//!
//! Events are produced by esp_timer callbacks (rotation tick, metrics
//! tick) and consumed by the main loop, which is the only caller into the
//! multiplexer — that loop is what serializes client calls and rotation.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Rotation     │────▶│              │     │              │
//! │ timer        │     │  Event Queue │────▶│  Main Loop   │
//! │ Metrics      │────▶│  (lock-free) │     │  (consumer)  │
//! │ timer        │     │              │     │              │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use heapless::mpmc::Q16;

/// System event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Periodic rotation tick — advance the multiplexer round-robin.
    RotationTick,
    /// Runtime metrics report timer fired.
    MetricsTick,
}

// Lock-free MPMC queue; producers are timer-task callbacks, the single
// consumer is the main loop. Capacity 16 comfortably covers a stalled
// loop iteration at the default tick rates.
static EVENT_QUEUE: Q16<Event> = Q16::new();

/// Push an event into the queue.
/// Safe to call from timer-task context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    EVENT_QUEUE.enqueue(event).is_ok()
}

/// Pop the next event, FIFO order. `None` when empty.
pub fn pop_event() -> Option<Event> {
    EVENT_QUEUE.dequeue()
}

/// Drain all pending events into a callback.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}
