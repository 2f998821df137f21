pub mod clock;
pub mod memory;
pub mod state_store;
