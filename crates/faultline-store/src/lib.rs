//! faultline-store: durable homes for the single live session.

pub mod json_file;
pub mod memory;

pub use json_file::{JsonFileStore, STATE_FORMAT_VERSION};
pub use memory::MemoryStore;
