//! Multi-slot playback sessions with automatic failover.
//!
//! A [`SessionManager`] binds up to `max_slots` matches to view slots. Each
//! slot keeps its own selection; [`SessionManager::report_failure`] degrades
//! the slot's endpoint and moves the slot to the next best candidate without
//! touching the other slots. [`SessionManager::reselect`] does the same for
//! failures that probes have already recorded.

mod events;
mod manager;
mod slot;
mod sweeps;

pub use events::SessionEvent;
pub use manager::{FailoverOutcome, SessionManager};
pub use slot::{LayoutMode, SlotView};
