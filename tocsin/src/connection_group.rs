use std::{
	fmt::{self, Debug, Formatter},
	ops::AddAssign,
};

use crate::{Connection, ScopedConnection};

/// An ordered collection of [`ScopedConnection`]s for batch disconnection.
///
/// Dropping the group disconnects everything it still holds.
#[derive(Default)]
#[must_use = "Dropping a `ConnectionGroup` disconnects all of its connections."]
pub struct ConnectionGroup {
	connections: Vec<ScopedConnection>,
}

impl ConnectionGroup {
	/// Creates an empty group.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a connection, taking ownership of its disconnection.
	pub fn add(&mut self, connection: impl Into<ScopedConnection>) {
		self.connections.push(connection.into());
	}

	/// Disconnects all held connections and empties the group.
	pub fn disconnect_all(&mut self) {
		self.connections.clear();
	}

	/// Number of held connections, including ones that have since been disconnected elsewhere.
	#[must_use]
	pub fn len(&self) -> usize {
		self.connections.len()
	}

	/// Whether the group holds no connections.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.connections.is_empty()
	}

	/// Iterates over the held connections in insertion order.
	pub fn iter(&self) -> impl '_ + Iterator<Item = &Connection> {
		self.connections.iter().map(|scoped| &**scoped)
	}
}

impl AddAssign<Connection> for ConnectionGroup {
	fn add_assign(&mut self, connection: Connection) {
		self.add(connection);
	}
}

impl AddAssign<ScopedConnection> for ConnectionGroup {
	fn add_assign(&mut self, connection: ScopedConnection) {
		self.add(connection);
	}
}

impl Extend<Connection> for ConnectionGroup {
	fn extend<T: IntoIterator<Item = Connection>>(&mut self, iter: T) {
		self.connections
			.extend(iter.into_iter().map(ScopedConnection::new));
	}
}

impl FromIterator<Connection> for ConnectionGroup {
	fn from_iter<T: IntoIterator<Item = Connection>>(iter: T) -> Self {
		let mut group = Self::new();
		group.extend(iter);
		group
	}
}

impl Debug for ConnectionGroup {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}
