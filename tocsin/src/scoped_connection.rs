use std::{
	fmt::{self, Debug, Formatter},
	ops::Deref,
};

use scopeguard::{guard, ScopeGuard};

use crate::Connection;

/// A [`Connection`] that is disconnected when dropped.
///
/// Assigning over a [`ScopedConnection`] drops, and so disconnects, the one it held before.
#[must_use = "Dropping a `ScopedConnection` disconnects it immediately."]
pub struct ScopedConnection {
	connection: ScopeGuard<Connection, fn(Connection)>,
}

fn disconnect_on_drop(connection: Connection) {
	connection.disconnect();
}

impl ScopedConnection {
	/// Takes ownership of `connection`'s disconnection.
	pub fn new(connection: Connection) -> Self {
		Self {
			connection: guard(connection, disconnect_on_drop as fn(Connection)),
		}
	}

	/// Disconnects right away. Dropping afterwards does nothing further.
	pub fn disconnect(&self) {
		self.connection.disconnect();
	}

	/// Gives up ownership without disconnecting.
	#[must_use = "The returned `Connection` is the only remaining handle to the slot."]
	pub fn release(self) -> Connection {
		ScopeGuard::into_inner(self.connection)
	}
}

impl Default for ScopedConnection {
	/// Owns an inert connection.
	fn default() -> Self {
		Self::new(Connection::default())
	}
}

impl From<Connection> for ScopedConnection {
	fn from(connection: Connection) -> Self {
		Self::new(connection)
	}
}

impl Deref for ScopedConnection {
	type Target = Connection;

	fn deref(&self) -> &Self::Target {
		&self.connection
	}
}

impl Debug for ScopedConnection {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ScopedConnection")
			.field(&*self.connection)
			.finish()
	}
}
