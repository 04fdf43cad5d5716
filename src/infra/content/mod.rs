//! Content source adapters.

mod fs;
mod memory;

pub use fs::FsContentSource;
pub use memory::MemoryContentSource;
