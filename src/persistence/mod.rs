//! Persistence layer: binary codec and atomic snapshot files.

pub mod codec;
pub mod snapshot;

pub use codec::{StoreSnapshot, FORMAT_VERSION, MAGIC};
