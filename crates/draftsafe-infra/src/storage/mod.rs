//! Storage adapter and the raw areas it writes to.

pub mod adapter;
pub mod area;
pub mod envelope;
pub mod file;
pub mod memory;

pub use adapter::StorageAdapter;
pub use area::StorageArea;
pub use file::FileArea;
pub use memory::MemoryArea;
