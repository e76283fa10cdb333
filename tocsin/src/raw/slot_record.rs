use std::{
	any::Any,
	fmt::{self, Debug, Formatter},
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use super::Track;
use crate::arity::Callback;

/// The per-slot flags a [`Connection`](`crate::Connection`) manipulates.
///
/// Every flag is its own atomic, so blocking, retiring and the single-shot claim
/// never need the registry lock.
#[derive(Debug, Default)]
pub(crate) struct SlotState {
	blocked: AtomicBool,
	pending_removal: AtomicBool,
	executed: AtomicBool,
}

impl SlotState {
	pub(crate) fn is_blocked(&self) -> bool {
		self.blocked.load(Ordering::Acquire)
	}

	pub(crate) fn set_blocked(&self, blocked: bool) {
		self.blocked.store(blocked, Ordering::Release);
	}

	pub(crate) fn is_pending_removal(&self) -> bool {
		self.pending_removal.load(Ordering::Acquire)
	}

	/// Idempotent. A retired slot is never invoked again.
	pub(crate) fn retire(&self) {
		self.pending_removal.store(true, Ordering::Release);
	}

	/// Claims the one execution of a single-shot slot.
	///
	/// Exactly one caller ever sees `true`.
	pub(crate) fn claim_execution(&self) -> bool {
		self.executed
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}
}

/// One registered callback plus its dispatch metadata.
pub(crate) struct SlotRecord<Args> {
	pub(crate) id: u64,
	pub(crate) priority: i32,
	pub(crate) single_shot: bool,
	pub(crate) state: Arc<SlotState>,
	callback: Callback<Args>,
	tracked: Option<Box<dyn Track>>,
}

impl<Args> Debug for SlotRecord<Args> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("SlotRecord")
			.field("id", &self.id)
			.field("priority", &self.priority)
			.field("single_shot", &self.single_shot)
			.field("state", &self.state)
			.field("tracked", &self.tracked.as_ref().map(|tracked| tracked.is_alive()))
			.finish_non_exhaustive()
	}
}

impl<Args> SlotRecord<Args> {
	pub(crate) fn new(
		id: u64,
		callback: Callback<Args>,
		priority: i32,
		single_shot: bool,
		tracked: Option<Box<dyn Track>>,
	) -> Self {
		Self {
			id,
			priority,
			single_shot,
			state: Arc::default(),
			callback,
			tracked,
		}
	}

	/// `false` iff a tracked referent exists and is gone.
	pub(crate) fn is_tracked_alive(&self) -> bool {
		self.tracked.as_ref().map_or(true, |tracked| tracked.is_alive())
	}

	pub(crate) fn tracks(&self, target: *const ()) -> bool {
		self.tracked
			.as_ref()
			.is_some_and(|tracked| tracked.target() == target)
	}

	/// Counts towards [`Signal::slot_count`](`crate::Signal::slot_count`). Blocked slots do.
	pub(crate) fn is_registered(&self) -> bool {
		!self.state.is_pending_removal() && self.is_tracked_alive()
	}

	/// Runs one dispatch step for this slot.
	///
	/// **Returns** whether the slot retired itself during this call, in which case
	/// the registry must be flagged dirty.
	pub(crate) fn fire(&self, args: Args, signal: &str) -> bool {
		if !self.is_tracked_alive() {
			self.state.retire();
			tracing::trace!(signal, slot = self.id, "tracked referent expired");
			return true;
		}

		if self.state.is_blocked() || self.state.is_pending_removal() {
			return false;
		}

		let retired = if self.single_shot {
			if !self.state.claim_execution() {
				return false;
			}
			self.state.retire();
			tracing::trace!(signal, slot = self.id, "single-shot slot consumed");
			true
		} else {
			false
		};

		if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.callback)(args))) {
			tracing::warn!(
				signal,
				slot = self.id,
				panic = panic_message(&*payload),
				"slot panicked during emit, continuing with the next slot"
			);
		}

		retired
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	payload
		.downcast_ref::<&'static str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("(non-string panic payload)")
}
