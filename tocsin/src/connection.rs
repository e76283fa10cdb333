use std::{
	fmt::{self, Debug, Formatter},
	sync::Weak,
};

use crate::raw::{RawRegistry, Registry, SlotState};

/// A handle to one slot registration.
///
/// Connections keep neither their [`Signal`](`crate::Signal`) nor their slot alive.
/// Once either is gone, every method here quietly does nothing and queries return `false`.
///
/// Dropping a [`Connection`] does **not** disconnect it. Use a
/// [`ScopedConnection`](`crate::ScopedConnection`) for that.
#[derive(Clone)]
pub struct Connection {
	registry: Weak<dyn RawRegistry>,
	slot: Weak<SlotState>,
}

impl Connection {
	pub(crate) fn new(registry: Weak<dyn RawRegistry>, slot: Weak<SlotState>) -> Self {
		Self { registry, slot }
	}

	/// Whether both the signal and the slot still exist and the slot hasn't been disconnected.
	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.registry.strong_count() > 0
			&& self
				.slot
				.upgrade()
				.is_some_and(|slot| !slot.is_pending_removal())
	}

	/// Removes the slot from its signal.
	///
	/// Idempotent. Safe to call from within any slot, including the disconnected one.
	/// If the slot is reached later in an ongoing emission, it is skipped.
	pub fn disconnect(&self) {
		if let (Some(registry), Some(slot)) = (self.registry.upgrade(), self.slot.upgrade()) {
			registry.mark_for_removal(&slot);
		}
	}

	/// Suppresses invocations of the slot until [unblocked](`Connection::unblock`).
	///
	/// The slot stays registered.
	pub fn block(&self) {
		self.set_blocked(true);
	}

	/// Undoes [`block`](`Connection::block`).
	pub fn unblock(&self) {
		self.set_blocked(false);
	}

	/// Blocks or unblocks the slot.
	pub fn set_blocked(&self, blocked: bool) {
		if let Some(slot) = self.slot.upgrade() {
			slot.set_blocked(blocked);
		}
	}

	/// `false` if the slot is gone.
	#[must_use]
	pub fn is_blocked(&self) -> bool {
		self.slot.upgrade().is_some_and(|slot| slot.is_blocked())
	}
}

impl Default for Connection {
	/// An inert connection that was never connected.
	fn default() -> Self {
		let registry: Weak<dyn RawRegistry> = Weak::<Registry<()>>::new();
		Self::new(registry, Weak::new())
	}
}

impl PartialEq for Connection {
	/// Connections are equal iff they refer to the same slot registration.
	fn eq(&self, other: &Self) -> bool {
		Weak::ptr_eq(&self.slot, &other.slot)
	}
}

impl Eq for Connection {}

impl Debug for Connection {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connection")
			.field("connected", &self.is_connected())
			.field("blocked", &self.is_blocked())
			.finish()
	}
}

