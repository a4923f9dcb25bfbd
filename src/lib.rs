//! A fixed-capacity, concurrent in-memory disk block cache.
//!
//! Mediates every read and write between filesystems and a block-oriented
//! storage driver: one process-wide [`Cache`] instance, a pool of at most
//! `N` resident [`Block`](block::Block)s of `B` bytes each, an address
//! index, an LRU victim chain, and an interlock + condition variable that
//! together implement the per-block shared/exclusive content-lock
//! protocol. See `SPEC_FULL.md` for the full specification this crate
//! implements.

mod block;
mod cache;
mod config;
mod driver;
mod error;
mod io;
mod mapped;
mod session;

pub use cache::Cache;
pub use config::{CacheConfig, MapMode, UnmapMode};
pub use driver::{DiskDriver, DiskInfo, IoKind, IoRequest, IoStatus, IoVector};
pub use error::CacheError;
pub use mapped::MappedBlock;
pub use session::{DriverId, MediaId, SessionId};
