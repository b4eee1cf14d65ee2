//! # Read-Through Cache Module
//!
//! The batch (`lookup`) and single-item (`get`) read-through paths, their request types,
//! origin handler traits and the pure helpers they are built from.

pub mod handler;
pub mod keys;
pub mod merge;
pub mod read_through;
pub mod request;
mod write_back;

pub use handler::{BatchOriginHandler, OriginHandler};
pub use read_through::{ReadThroughCache, ReadThroughCacheBuilder};
pub use request::{GetRequest, LookupRequest};
