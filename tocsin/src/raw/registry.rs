use std::{
	borrow::Cow,
	cmp::Reverse,
	collections::HashMap,
	fmt::{self, Debug, Formatter},
	mem, ptr,
	sync::{
		atomic::{AtomicBool, AtomicU64, Ordering},
		Arc, Weak,
	},
};

use parking_lot::Mutex;

use super::{SlotRecord, SlotState, Tag, Track};
use crate::{arity::Callback, Connection};

/// The type-erased side of a [`Registry`] that [`Connection`]s talk to.
pub(crate) trait RawRegistry: Send + Sync {
	/// Retires `slot` and flags the registry for a rebuild.
	///
	/// Idempotent. Never waits for the registry lock, so it is safe to call from
	/// within a slot or a destructor.
	///
	/// If the lock is free, the slot's record is dropped right away.
	/// Otherwise it stays until the next [`Registry::snapshot`].
	fn mark_for_removal(&self, slot: &SlotState);
}

/// Per-registration dispatch settings.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SlotOptions {
	pub(crate) priority: i32,
	pub(crate) single_shot: bool,
}

/// The shared slot registry owned by a [`Signal`](`crate::Signal`).
pub(crate) struct Registry<Args> {
	label: Option<Cow<'static, str>>,
	slot_counter: AtomicU64,
	dirty: AtomicBool,
	critical: Mutex<RegistryState<Args>>,
}

struct RegistryState<Args> {
	/// Priority-ordered while the registry isn't dirty.
	slots: Vec<Arc<SlotRecord<Args>>>,
	tags: HashMap<Box<str>, Arc<Tag>>,
}

impl<Args> RegistryState<Args> {
	/// Drops retired slots, then restores descending priority order.
	///
	/// The sort is stable, so equal priorities stay in registration order.
	/// **Returns** the purged records so that they can be dropped outside the lock.
	fn rebuild(&mut self) -> Vec<Arc<SlotRecord<Args>>> {
		let (kept, purged): (Vec<_>, Vec<_>) = mem::take(&mut self.slots)
			.into_iter()
			.partition(|slot| !slot.state.is_pending_removal());
		self.slots = kept;
		self.slots.sort_by_key(|slot| Reverse(slot.priority));
		purged
	}
}

impl<Args> Debug for Registry<Args> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("Registry");
		debug
			.field("label", &self.label)
			.field("dirty", &self.dirty.load(Ordering::Relaxed));
		match self.critical.try_lock() {
			Some(state) => debug
				.field("slots", &state.slots)
				.field("tags", &state.tags.keys().collect::<Vec<_>>()),
			None => debug.field("slots", &"(locked)"),
		};
		debug.finish()
	}
}

impl<Args> Registry<Args> {
	pub(crate) fn new(label: Option<Cow<'static, str>>) -> Self {
		Self {
			label,
			slot_counter: AtomicU64::new(0),
			dirty: AtomicBool::new(false),
			critical: Mutex::new(RegistryState {
				slots: Vec::new(),
				tags: HashMap::new(),
			}),
		}
	}

	pub(crate) fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	/// The label as reported in log events.
	pub(crate) fn log_label(&self) -> &str {
		self.label().unwrap_or("(unnamed)")
	}

	fn mark_dirty(&self) {
		self.dirty.store(true, Ordering::Release);
	}

	fn next_slot(
		&self,
		callback: Callback<Args>,
		options: SlotOptions,
		tracked: Option<Box<dyn Track>>,
	) -> Arc<SlotRecord<Args>> {
		let id = self.slot_counter.fetch_add(1, Ordering::Relaxed);
		tracing::trace!(
			signal = self.log_label(),
			slot = id,
			priority = options.priority,
			single_shot = options.single_shot,
			tracked = tracked.is_some(),
			"registering slot"
		);
		Arc::new(SlotRecord::new(
			id,
			callback,
			options.priority,
			options.single_shot,
			tracked,
		))
	}

	/// Appends a new slot. It is sorted into place on the next [`snapshot`](`Registry::snapshot`).
	///
	/// `dirty` is set before the lock is released, so no snapshot can see the slot unsorted.
	pub(crate) fn register(
		self: &Arc<Self>,
		callback: Callback<Args>,
		options: SlotOptions,
		tracked: Option<Box<dyn Track>>,
	) -> Connection
	where
		Args: 'static,
	{
		let slot = self.next_slot(callback, options, tracked);
		let connection = self.connection_to(&slot);
		let mut state = self.critical.lock();
		state.slots.push(slot);
		self.mark_dirty();
		drop(state);
		connection
	}

	/// Like [`register`](`Registry::register`), tracking the marker of `tag`.
	///
	/// The marker is created on first use of the name.
	pub(crate) fn register_tagged(
		self: &Arc<Self>,
		tag: &str,
		callback: Callback<Args>,
		options: SlotOptions,
	) -> Connection
	where
		Args: 'static,
	{
		let mut state = self.critical.lock();
		let marker = state
			.tags
			.entry(tag.into())
			.or_insert_with(|| Arc::new(Tag::new(tag)));
		let tracked: Box<dyn Track> = Box::new(Arc::downgrade(marker));
		let slot = self.next_slot(callback, options, Some(tracked));
		let connection = self.connection_to(&slot);
		state.slots.push(slot);
		self.mark_dirty();
		drop(state);
		connection
	}

	fn connection_to(self: &Arc<Self>, slot: &Arc<SlotRecord<Args>>) -> Connection
	where
		Args: 'static,
	{
		let registry: Weak<dyn RawRegistry> = Arc::downgrade(self) as Weak<dyn RawRegistry>;
		Connection::new(registry, Arc::downgrade(&slot.state))
	}

	/// Retires and removes every slot registered under `tag`, and forgets the tag.
	///
	/// **Returns** `false` iff no such tag is known, including after an earlier
	/// call already removed it.
	pub(crate) fn disconnect_tag(&self, tag: &str) -> bool {
		let mut state = self.critical.lock();
		let Some(marker) = state.tags.remove(tag) else {
			return false;
		};

		let target = Arc::as_ptr(&marker).cast::<()>();
		let (removed, kept): (Vec<_>, Vec<_>) = mem::take(&mut state.slots)
			.into_iter()
			.partition(|slot| slot.tracks(target));
		state.slots = kept;
		for slot in &removed {
			slot.state.retire();
		}
		drop(state);
		let retired = removed.len();
		// Dropped outside the lock: captured state may disconnect on drop.
		drop(removed);

		tracing::debug!(
			signal = self.log_label(),
			tag = marker.name(),
			retired,
			"disconnected tag"
		);
		true
	}

	/// Retires every slot and forgets every tag.
	pub(crate) fn disconnect_all(&self) {
		let (slots, tags) = {
			let mut state = self.critical.lock();
			(mem::take(&mut state.slots), mem::take(&mut state.tags))
		};
		for slot in &slots {
			slot.state.retire();
		}
		tracing::debug!(
			signal = self.log_label(),
			slots = slots.len(),
			tags = tags.len(),
			"disconnected all slots"
		);
	}

	/// Number of slots that are neither retired nor expired. Blocked slots count.
	pub(crate) fn slot_count(&self) -> usize {
		self.critical
			.lock()
			.slots
			.iter()
			.filter(|slot| slot.is_registered())
			.count()
	}

	/// Copies out the priority-ordered slot list, rebuilding it first if needed.
	///
	/// The lock is released before this returns, so slots can be invoked from the
	/// copy while they connect or disconnect on the same registry.
	pub(crate) fn snapshot(&self) -> Vec<Arc<SlotRecord<Args>>> {
		let mut state = self.critical.lock();
		let purged = if self.dirty.swap(false, Ordering::AcqRel) {
			state.rebuild()
		} else {
			Vec::new()
		};
		let snapshot = state.slots.clone();
		let remaining = state.slots.len();
		drop(state);

		if !purged.is_empty() {
			tracing::debug!(
				signal = self.log_label(),
				purged = purged.len(),
				remaining,
				"purged retired slots"
			);
		}
		// Dropped here, outside the lock: captured state may disconnect on drop.
		drop(purged);
		snapshot
	}

	/// Dispatches `args` to `snapshot` front to back.
	///
	/// Every slot but the last receives a clone.
	pub(crate) fn dispatch(&self, snapshot: &[Arc<SlotRecord<Args>>], args: Args)
	where
		Args: Clone,
	{
		let Some((last, rest)) = snapshot.split_last() else {
			return;
		};

		let signal = self.log_label();
		let mut retired = false;
		for slot in rest {
			retired |= slot.fire(args.clone(), signal);
		}
		retired |= last.fire(args, signal);

		if retired {
			self.mark_dirty();
		}
	}
}

impl<Args> RawRegistry for Registry<Args> {
	fn mark_for_removal(&self, slot: &SlotState) {
		slot.retire();
		self.mark_dirty();

		let removed = self.critical.try_lock().and_then(|mut state| {
			let index = state
				.slots
				.iter()
				.position(|record| ptr::eq(&*record.state, slot))?;
			Some(state.slots.remove(index))
		});
		// The guard is gone by now.
		drop(removed);
	}
}

impl<Args> Drop for Registry<Args> {
	fn drop(&mut self) {
		// Copies held by an in-flight `emit` may outlive the registry.
		for slot in &self.critical.get_mut().slots {
			slot.state.retire();
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	fn noop() -> Callback<()> {
		Box::new(|()| ())
	}

	fn priorities(snapshot: &[Arc<SlotRecord<()>>]) -> Vec<(i32, u64)> {
		snapshot.iter().map(|slot| (slot.priority, slot.id)).collect()
	}

	#[test]
	fn rebuild_sorts_stably_by_descending_priority() {
		let registry = Arc::new(Registry::<()>::new(None));
		for priority in [0, 10, 0, -5, 10] {
			let _ = registry.register(
				noop(),
				SlotOptions {
					priority,
					single_shot: false,
				},
				None,
			);
		}

		assert_eq!(
			priorities(&registry.snapshot()),
			[(10, 1), (10, 4), (0, 0), (0, 2), (-5, 3)]
		);
	}

	#[test]
	fn rebuild_purges_retired_slots_only_when_dirty() {
		let registry = Arc::new(Registry::<()>::new(None));
		let a = registry.register(noop(), SlotOptions::default(), None);
		let _b = registry.register(noop(), SlotOptions::default(), None);
		assert_eq!(registry.snapshot().len(), 2);
		assert!(!registry.dirty.load(Ordering::Acquire));

		a.disconnect();
		assert!(registry.dirty.load(Ordering::Acquire));
		assert_eq!(registry.slot_count(), 1);
		assert_eq!(registry.snapshot().len(), 1);
		assert!(!registry.dirty.load(Ordering::Acquire));
		assert!(!a.is_connected());
	}

	#[test]
	fn tags_retire_only_their_own_slots() {
		let registry = Arc::new(Registry::<()>::new(Some("tags".into())));
		let log_a = registry.register_tagged("log", noop(), SlotOptions::default());
		let log_b = registry.register_tagged("log", noop(), SlotOptions::default());
		let ui = registry.register_tagged("ui", noop(), SlotOptions::default());

		assert!(!registry.disconnect_tag("unknown"));
		assert!(registry.disconnect_tag("log"));
		assert!(!registry.disconnect_tag("log"));

		assert!(!log_a.is_connected());
		assert!(!log_b.is_connected());
		assert!(ui.is_connected());
		assert_eq!(registry.slot_count(), 1);
	}

	fn capturing(token: &Arc<()>) -> Callback<()> {
		let token = Arc::clone(token);
		Box::new(move |()| drop(Arc::clone(&token)))
	}

	#[test]
	fn disconnecting_releases_the_callback_when_uncontended() {
		let registry = Arc::new(Registry::<()>::new(None));
		let token = Arc::new(());
		let connection = registry.register(capturing(&token), SlotOptions::default(), None);
		assert_eq!(Arc::strong_count(&token), 2);

		connection.disconnect();
		assert_eq!(Arc::strong_count(&token), 1);
		assert!(registry.critical.lock().slots.is_empty());
	}

	#[test]
	fn disconnecting_under_contention_defers_to_the_next_snapshot() {
		let registry = Arc::new(Registry::<()>::new(None));
		let token = Arc::new(());
		let connection = registry.register(capturing(&token), SlotOptions::default(), None);

		let guard = registry.critical.lock();
		connection.disconnect();
		drop(guard);

		assert!(!connection.is_connected());
		assert_eq!(Arc::strong_count(&token), 2);
		assert!(registry.snapshot().is_empty());
		assert_eq!(Arc::strong_count(&token), 1);
	}

	#[test]
	fn disconnecting_a_tag_releases_its_callbacks() {
		let registry = Arc::new(Registry::<()>::new(None));
		let token = Arc::new(());
		registry.register_tagged("owned", capturing(&token), SlotOptions::default());
		registry.register_tagged("other", noop(), SlotOptions::default());

		assert!(registry.disconnect_tag("owned"));
		assert_eq!(Arc::strong_count(&token), 1);
		assert_eq!(registry.critical.lock().slots.len(), 1);
	}

	#[test]
	fn registration_flags_the_registry_before_unlocking() {
		let registry = Arc::new(Registry::<()>::new(None));
		assert!(registry.snapshot().is_empty());

		let _low = registry.register(noop(), SlotOptions::default(), None);
		let state = registry.critical.lock();
		assert_eq!(state.slots.len(), 1);
		assert!(registry.dirty.load(Ordering::Acquire));
		drop(state);

		let _high = registry.register_tagged(
			"tag",
			noop(),
			SlotOptions {
				priority: 100,
				single_shot: false,
			},
		);
		assert_eq!(priorities(&registry.snapshot()), [(100, 1), (0, 0)]);
	}

	#[test]
	fn dropping_the_registry_retires_in_flight_copies() {
		let registry = Arc::new(Registry::<()>::new(None));
		let calls = Arc::new(AtomicUsize::new(0));
		let connection = registry.register(
			Box::new({
				let calls = Arc::clone(&calls);
				move |()| {
					calls.fetch_add(1, Ordering::Relaxed);
				}
			}),
			SlotOptions::default(),
			None,
		);
		let snapshot = registry.snapshot();
		drop(registry);

		assert!(!connection.is_connected());
		assert!(snapshot.iter().all(|slot| slot.state.is_pending_removal()));
		assert!(!snapshot[0].fire((), "dropped"));
		assert_eq!(calls.load(Ordering::Relaxed), 0);
	}
}
