//! Signal/slot observer layer for UI notification.
//!
//! The client core has no rendering dependency: everything the UI needs to
//! know (log lines, connection status) is delivered through signals. A
//! front-end connects closures ("slots") and renders however it likes.
//!
//! Unlike a GUI toolkit there is no event loop to queue invocations on, so
//! slots are always invoked directly on the emitting task. Signals are cheap
//! to clone; clones share the same slot table, which lets background tasks
//! emit without borrowing the client that owns the signal.
//!
//! # Example
//!
//! ```
//! use echoline::Signal;
//!
//! let log_line = Signal::<String>::new();
//!
//! log_line.connect(|line| {
//!     println!("{}", line);
//! });
//!
//! log_line.emit("Connected".to_string());
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Identifier for a connected slot, returned by [`Signal::connect`].
    ///
    /// Remains valid until the slot is disconnected via [`Signal::disconnect`].
    pub struct SlotId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A type-safe signal with directly-invoked slots.
///
/// When a signal is emitted, every connected slot is called with a reference
/// to the emitted value, in an unspecified order, on the emitting task.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync` and `Clone`; all clones share one slot
/// table behind a mutex. The table is snapshotted before invocation, so a
/// slot may connect or disconnect other slots without deadlocking.
pub struct Signal<Args> {
    slots: Arc<Mutex<SlotMap<SlotId, Slot<Args>>>>,
}

impl<Args> Clone for Signal<Args> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connected slots.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a [`SlotId`] that can be used to disconnect the slot later.
    pub fn connect<F>(&self, slot: F) -> SlotId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Connect a slot that disconnects automatically when the returned guard
    /// is dropped.
    pub fn connect_scoped<F>(&self, slot: F) -> SlotGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        SlotGuard {
            signal: self.clone(),
            id: self.connect(slot),
        }
    }

    /// Disconnect a slot by its ID.
    ///
    /// Returns `true` if the slot was found and removed.
    pub fn disconnect(&self, id: SlotId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    /// Disconnect every slot from this signal.
    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    /// Number of currently connected slots.
    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Emit the signal, invoking all connected slots with `args`.
    pub fn emit(&self, args: Args) {
        // Snapshot under the lock, invoke outside it.
        let slots: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(
            target: "echoline::signal",
            slot_count = slots.len(),
            "emitting signal"
        );
        for slot in slots {
            slot(&args);
        }
    }
}

/// RAII guard that disconnects its slot when dropped.
///
/// Created via [`Signal::connect_scoped`]. Holds a clone of the signal, so
/// no lifetime relationship with the original handle is required.
pub struct SlotGuard<Args> {
    signal: Signal<Args>,
    id: SlotId,
}

impl<Args> SlotGuard<Args> {
    /// The ID of the guarded slot.
    pub fn id(&self) -> SlotId {
        self.id
    }
}

impl<Args> Drop for SlotGuard<Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}
