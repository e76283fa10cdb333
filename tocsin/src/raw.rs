//! The registry behind [`Signal`](`crate::Signal`): slot records, their flags and liveness tracking.
//!
//! Nothing in here invokes a slot while holding the registry lock.

mod registry;
mod slot_record;
mod track;

pub(crate) use registry::{RawRegistry, Registry, SlotOptions};
pub(crate) use slot_record::{SlotRecord, SlotState};
pub(crate) use track::{Tag, Track};
