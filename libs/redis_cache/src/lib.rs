pub mod connection;
pub mod versioned;

pub use versioned::{VersionedCache, VersionedStore};
