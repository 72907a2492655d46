//! Per-frame placement decisions, highlighting and drag resolution

mod controller;
mod state;

pub use controller::PlacementController;
pub use state::PlacementState;
