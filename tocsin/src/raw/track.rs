//! Liveness tracking for slots that depend on another object.
//!
//! Receiver-bound slots and tagged slots both store a [`Track`] handle.
//! Once the tracked referent is gone, the slot is dead.

use std::sync::Weak;

/// A non-owning reference whose referent may disappear at any time.
pub(crate) trait Track: Send + Sync {
	/// Whether the referent still exists.
	fn is_alive(&self) -> bool;

	/// Address of the referent, used only for identity comparisons.
	///
	/// Stays stable after the referent is dropped.
	fn target(&self) -> *const ();
}

impl<T: ?Sized + Send + Sync> Track for Weak<T> {
	fn is_alive(&self) -> bool {
		self.strong_count() > 0
	}

	fn target(&self) -> *const () {
		self.as_ptr().cast::<()>()
	}
}

/// Shared marker behind a tag name.
///
/// The registry holds the only strong reference. Tagged slots hold [`Weak`]s,
/// so removing the marker from the registry expires all of them at once.
#[derive(Debug)]
pub(crate) struct Tag {
	name: Box<str>,
}

impl Tag {
	pub(crate) fn new(name: &str) -> Self {
		Self { name: name.into() }
	}

	pub(crate) fn name(&self) -> &str {
		&self.name
	}
}
