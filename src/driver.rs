//! The capabilities the cache consumes from a disk driver.
//!
//! A real driver lives entirely outside this crate; it is reached only
//! through this trait, keeping the cache itself agnostic to whatever
//! transport or controller sits behind a given disk.

use crate::error::CacheError;

/// Geometry/identity information a driver reports when a session is opened.
#[derive(Debug, Clone, Copy)]
pub struct DiskInfo {
    /// Bytes per sector.
    pub sector_size: u32,
    /// Sectors per read/write cluster (track-oriented amortization factor).
    pub sectors_per_rdwr: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoKind {
    Read,
    Write,
}

/// One (offset, length, buffer) leg of a possibly-clustered I/O request.
///
/// `buf` points into the cache's block pool, which never reallocates or
/// moves its storage once created, so the pointer stays valid for the
/// lifetime of the request.
pub struct IoVector {
    pub byte_offset: u64,
    pub len: usize,
    pub buf: *mut u8,
}

// SAFETY: `buf` addresses memory owned by the cache's block pool, which is
// pinned for the process lifetime; the cache guarantees no other thread
// mutates that range while the request is in flight (the owning block is
// exclusively or share-locked for the duration).
unsafe impl Send for IoVector {}

pub type IoStatus = Result<(), CacheError>;

pub struct IoRequest {
    /// Opaque request identity; the driver hands this straight back to
    /// `Cache::on_request_done` on completion, it does not interpret it.
    pub id: u64,
    pub kind: IoKind,
    pub vectors: Vec<IoVector>,
}

/// The driver channel capability consumed at session open and on every I/O.
pub trait DiskDriver: Send + Sync {
    /// Sector size and cluster factor for the media behind this channel.
    fn disk_info(&self) -> DiskInfo;

    /// Submit an asynchronous I/O request. Returns immediately; completion
    /// arrives later (possibly on another thread, possibly synchronously
    /// before `submit` even returns) via a call to
    /// `Cache::on_request_done(request.id, byte_count, status)`. A
    /// synchronous `CacheError` here means the request was rejected before
    /// it was ever queued (e.g. no medium) and no completion will follow.
    fn submit(&self, request: IoRequest) -> Result<(), CacheError>;
}
