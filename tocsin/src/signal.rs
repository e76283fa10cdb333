use std::{
	borrow::Cow,
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

use crate::{
	arity::{Callback, IntoMethodSlot, IntoSlot},
	raw::{Registry, SlotOptions, Track},
	Connection,
};

/// A typed event source that invokes its connected slots when emitted.
///
/// `Args` is the tuple of arguments every emission carries, for example `()`, `(i32,)`
/// or `(i32, String)`. Slots may accept any prefix of it (see [`IntoSlot`]).
///
/// # Dispatch order
///
/// Slots with higher priority run first. Equal priorities run in registration order.
///
/// # Threading
///
/// All methods take `&self` and may be called concurrently from any thread, including
/// from within a slot of the same signal. Slots run on the emitting thread, outside of
/// the signal's internal lock.
///
/// # Panics
///
/// A panicking slot never interrupts an emission. The panic is logged through
/// [`tracing`] and the next slot runs.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use tocsin::Signal;
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let message = Signal::<(i32, String)>::new();
///
/// message.connect_with_priority(
/// 	{
/// 		let log = Arc::clone(&log);
/// 		move |id: i32, text: String| log.lock().unwrap().push(format!("{id}: {text}"))
/// 	},
/// 	10,
/// );
/// message.connect_once({
/// 	let log = Arc::clone(&log);
/// 	move |id: i32| log.lock().unwrap().push(format!("once {id}"))
/// });
///
/// message.emit((1, "hello".to_string()));
/// message.emit((2, "again".to_string()));
///
/// assert_eq!(*log.lock().unwrap(), ["1: hello", "once 1", "2: again"]);
/// ```
pub struct Signal<Args> {
	registry: Arc<Registry<Args>>,
}

impl<Args> Debug for Signal<Args> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("label", &self.registry.label())
			.field("slot_count", &self.slot_count())
			.finish()
	}
}

impl<Args> Default for Signal<Args> {
	fn default() -> Self {
		Self::new()
	}
}

impl<Args> Signal<Args> {
	/// Creates a signal without slots.
	#[must_use]
	pub fn new() -> Self {
		Self {
			registry: Arc::new(Registry::new(None)),
		}
	}

	/// Creates a signal without slots that is identified by `label` in log events.
	#[must_use]
	pub fn named(label: impl Into<Cow<'static, str>>) -> Self {
		Self {
			registry: Arc::new(Registry::new(Some(label.into()))),
		}
	}

	/// The label given to [`Signal::named`], if any.
	#[must_use]
	pub fn label(&self) -> Option<&str> {
		self.registry.label()
	}

	/// Disconnects every slot registered under `tag`.
	///
	/// **Returns** `false` if `tag` is unknown, which includes tags that were
	/// already disconnected. Slots registered under other tags are unaffected.
	pub fn disconnect_tag(&self, tag: &str) -> bool {
		self.registry.disconnect_tag(tag)
	}

	/// Disconnects all slots and forgets all tags.
	pub fn disconnect_all(&self) {
		self.registry.disconnect_all();
	}

	/// The number of connected slots.
	///
	/// Blocked slots are counted. Slots whose receiver or tag is gone are not,
	/// even before the next emission cleans them up.
	#[must_use]
	pub fn slot_count(&self) -> usize {
		self.registry.slot_count()
	}

	/// Whether [`slot_count`](`Signal::slot_count`) is zero.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.slot_count() == 0
	}

	/// Invokes all live slots in priority order.
	///
	/// The order is fixed when the emission starts. Slots connected meanwhile are not
	/// guaranteed to run in this emission; slots disconnected meanwhile are skipped
	/// if not yet reached. Single-shot slots run exactly once even under concurrent emissions.
	///
	/// Every slot but the last receives a clone of `args`.
	pub fn emit(&self, args: Args)
	where
		Args: Clone,
	{
		let snapshot = self.registry.snapshot();
		self.registry.dispatch(&snapshot, args);
	}
}

impl<Args: 'static> Signal<Args> {
	fn register<M>(
		&self,
		slot: impl IntoSlot<Args, M>,
		priority: i32,
		single_shot: bool,
	) -> Connection {
		self.registry.register(
			slot.into_callback(),
			SlotOptions {
				priority,
				single_shot,
			},
			None,
		)
	}

	/// Connects `slot` with priority `0`.
	pub fn connect<M>(&self, slot: impl IntoSlot<Args, M>) -> Connection {
		self.register(slot, 0, false)
	}

	/// Connects `slot`. Higher priorities run earlier.
	pub fn connect_with_priority<M>(&self, slot: impl IntoSlot<Args, M>, priority: i32) -> Connection {
		self.register(slot, priority, false)
	}

	/// Connects a single-shot `slot` with priority `0`.
	///
	/// It runs on the next emission that reaches it (and exactly once, even if emissions race),
	/// then disconnects itself.
	pub fn connect_once<M>(&self, slot: impl IntoSlot<Args, M>) -> Connection {
		self.register(slot, 0, true)
	}

	/// Like [`connect_once`](`Signal::connect_once`), with a priority.
	pub fn connect_once_with_priority<M>(
		&self,
		slot: impl IntoSlot<Args, M>,
		priority: i32,
	) -> Connection {
		self.register(slot, priority, true)
	}

	/// Connects `slot` under `tag`, so it can be disconnected as part of that group
	/// through [`disconnect_tag`](`Signal::disconnect_tag`).
	pub fn connect_tagged<M>(&self, tag: &str, slot: impl IntoSlot<Args, M>) -> Connection {
		self.connect_tagged_with_priority(tag, slot, 0)
	}

	/// Like [`connect_tagged`](`Signal::connect_tagged`), with a priority.
	pub fn connect_tagged_with_priority<M>(
		&self,
		tag: &str,
		slot: impl IntoSlot<Args, M>,
		priority: i32,
	) -> Connection {
		self.registry.register_tagged(
			tag,
			slot.into_callback(),
			SlotOptions {
				priority,
				single_shot: false,
			},
		)
	}

	/// Connects `method` to `receiver` without keeping `receiver` alive.
	///
	/// Once the last strong reference to `receiver` is dropped, the slot stops counting as
	/// connected and is removed during the next emission. `method` never runs on a dead receiver.
	pub fn connect_method<R, M>(
		&self,
		receiver: &Arc<R>,
		method: impl IntoMethodSlot<R, Args, M>,
	) -> Connection
	where
		R: ?Sized + Send + Sync + 'static,
	{
		self.connect_method_with_priority(receiver, method, 0)
	}

	/// Like [`connect_method`](`Signal::connect_method`), with a priority.
	pub fn connect_method_with_priority<R, M>(
		&self,
		receiver: &Arc<R>,
		method: impl IntoMethodSlot<R, Args, M>,
		priority: i32,
	) -> Connection
	where
		R: ?Sized + Send + Sync + 'static,
	{
		let method = method.into_method_callback();
		let weak = Arc::downgrade(receiver);
		let tracked: Box<dyn Track> = Box::new(weak.clone());
		let callback: Callback<Args> = Box::new(move |args: Args| {
			if let Some(receiver) = weak.upgrade() {
				method(&*receiver, args);
			}
		});
		self.registry.register(
			callback,
			SlotOptions {
				priority,
				single_shot: false,
			},
			Some(tracked),
		)
	}

	/// Connects `method` to `receiver`, holding a strong reference to `receiver`.
	///
	/// The slot never expires by itself. Disconnecting it releases `receiver`, or, if the
	/// signal is busy at that moment, the next emission does.
	pub fn connect_method_untracked<R, M>(
		&self,
		receiver: Arc<R>,
		method: impl IntoMethodSlot<R, Args, M>,
	) -> Connection
	where
		R: ?Sized + Send + Sync + 'static,
	{
		self.connect_method_untracked_with_priority(receiver, method, 0)
	}

	/// Like [`connect_method_untracked`](`Signal::connect_method_untracked`), with a priority.
	pub fn connect_method_untracked_with_priority<R, M>(
		&self,
		receiver: Arc<R>,
		method: impl IntoMethodSlot<R, Args, M>,
		priority: i32,
	) -> Connection
	where
		R: ?Sized + Send + Sync + 'static,
	{
		let method = method.into_method_callback();
		let callback: Callback<Args> = Box::new(move |args: Args| method(&*receiver, args));
		self.registry.register(
			callback,
			SlotOptions {
				priority,
				single_shot: false,
			},
			None,
		)
	}
}
