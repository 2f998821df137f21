mod clock;
mod state_store;
mod timer_backend;

pub use clock::*;
pub use state_store::*;
pub use timer_backend::*;
