use crate::cache::Cache;
use crate::config::UnmapMode;
use crate::error::CacheError;
use crate::session::SessionId;

/// A live mapping returned by [`Cache::map`] (spec.md §4.3). Dereferences to
/// the block's `B`-byte buffer. Must be consumed with [`MappedBlock::unmap`]
/// before it goes out of scope — mirrors the teacher's `Buf`
/// (`kernel-rs/src/bio.rs`), whose `Drop` impl panics rather than silently
/// leak a held lock; a disk-cache mapping is exactly the kind of resource
/// where "drop releases it for you" would hide a programming error instead
/// of catching one.
pub struct MappedBlock<'a> {
    pub(crate) cache: &'a Cache,
    pub(crate) session: SessionId,
    pub(crate) idx: usize,
    pub(crate) shared: bool,
    released: bool,
}

impl<'a> MappedBlock<'a> {
    pub(crate) fn new(cache: &'a Cache, session: SessionId, idx: usize, shared: bool) -> Self {
        Self {
            cache,
            session,
            idx,
            shared,
            released: false,
        }
    }

    /// Immutable view of the block's data.
    pub fn data(&self) -> &[u8] {
        self.cache.block_data(self.idx)
    }

    /// Mutable view of the block's data. Only valid while held exclusively
    /// (`Update`/`Replace`/`Cleared` mappings); a shared (`ReadOnly`)
    /// mapping may have other concurrent shared holders reading the same
    /// buffer, so handing out `&mut` there would alias.
    ///
    /// # Panics
    /// Panics if called on a shared mapping.
    pub fn data_mut(&mut self) -> &mut [u8] {
        assert!(
            !self.shared,
            "data_mut() called on a shared (read-only) mapping"
        );
        self.cache.block_data_mut(self.idx)
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Releases this mapping (spec.md §4.3 `unmap`).
    pub fn unmap(mut self, mode: UnmapMode) -> Result<(), CacheError> {
        self.released = true;
        self.cache.unmap(self.session, self.idx, self.shared, mode)
    }
}

impl Drop for MappedBlock<'_> {
    fn drop(&mut self) {
        if !self.released {
            panic!("MappedBlock dropped without calling unmap()");
        }
    }
}
