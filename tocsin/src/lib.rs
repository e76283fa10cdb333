#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![cfg_attr(feature = "_doc", doc = include_str!("../README.md"))]
//!
//! # Threading Notes
//!
//! Slots run on whichever thread calls [`Signal::emit`], never while the signal's
//! internal lock is held. A slot that should only ever run once should be connected
//! with [`Signal::connect_once`] rather than guarding itself.

pub mod arity;
mod raw;

mod connection;
pub use connection::Connection;

mod connection_group;
pub use connection_group::ConnectionGroup;

mod scoped_connection;
pub use scoped_connection::ScopedConnection;

mod signal;
pub use signal::Signal;

pub use arity::{IntoMethodSlot, IntoSlot};
