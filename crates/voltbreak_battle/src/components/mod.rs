//! Battle components

pub mod combatant;
pub mod part;
pub mod state;

// Re-export all components
pub use combatant::*;
pub use part::*;
pub use state::*;
