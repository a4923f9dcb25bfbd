/// Configuration passed to `Cache::create`.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Bytes per block. Must be a positive power of two.
    pub block_size: u32,
    /// Maximum number of resident blocks.
    pub capacity: usize,
}

/// `map()` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Shared if data is resident, else a synchronous read-in.
    ReadOnly,
    /// Exclusive; synchronous read-in on miss (caller plans a partial write).
    Update,
    /// Exclusive; no read-in, caller writes every byte.
    Replace,
    /// Exclusive; buffer is zeroed, no read-in.
    Cleared,
}

/// `unmap()` write modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmapMode {
    /// Just unlock and release.
    None,
    /// Requires exclusive; sets dirty and releases.
    DeferredDirty,
    /// Requires exclusive; downgrades, writes synchronously, then releases.
    SyncWrite,
}
