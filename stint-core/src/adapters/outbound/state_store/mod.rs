mod file;
mod memory;

pub use file::{workspace_slug, FileStateStore};
pub use memory::MemoryStateStore;
