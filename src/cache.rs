use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::block::{Block, Op};
use crate::config::{CacheConfig, MapMode, UnmapMode};
use crate::driver::DiskDriver;
use crate::error::CacheError;
use crate::io::InflightMeta;
use crate::mapped::MappedBlock;
use crate::session::{DriverId, MediaId, Session, SessionId};

/// Outcome of [`Cache::try_acquire_existing`].
enum Acquired {
    Shared,
    ExclusiveNeedRead,
    ExclusiveNoRead,
}

pub(crate) struct DriverEntry {
    pub driver: Arc<dyn DiskDriver>,
    pub open_sessions: usize,
}

/// Everything protected by the single cache-wide interlock: block pool,
/// address index, LRU chain, session table, driver registry, counters.
pub(crate) struct CacheInner {
    pub block_size: u32,
    pub capacity: usize,
    pub blocks: Vec<Block>,
    pub free: Vec<usize>,
    pub index: HashMap<(SessionId, u64), usize>,
    pub lru_head: Option<usize>,
    pub lru_tail: Option<usize>,
    pub generation: u64,
    pub dirty_count: usize,
    pub sessions: HashMap<SessionId, Session>,
    pub drivers: HashMap<DriverId, DriverEntry>,
    pub next_session: u64,
    pub next_driver: u64,
    pub next_request: u64,
    pub inflight: HashMap<u64, InflightMeta>,
}

/// The disk block cache. One process-wide instance per `Cache::create`
/// call; consumers are expected to share it behind an `Arc` if multiple
/// drivers/filesystems need a handle.
pub struct Cache {
    pub(crate) inner: Mutex<CacheInner>,
    pub(crate) cond: Condvar,
}

impl Cache {
    /// Creates a cache with the given block size and capacity. Block size
    /// must be a positive power of two; capacity must be at least 1.
    pub fn create(config: CacheConfig) -> Result<Self, CacheError> {
        if config.block_size == 0 || !config.block_size.is_power_of_two() || config.capacity == 0
        {
            return Err(CacheError::NoMemory);
        }

        let mut blocks = Vec::with_capacity(config.capacity);
        let mut free = Vec::with_capacity(config.capacity);
        for i in 0..config.capacity {
            blocks.push(Block::new(config.block_size));
            free.push(config.capacity - 1 - i);
        }

        Ok(Self {
            inner: Mutex::new(CacheInner {
                block_size: config.block_size,
                capacity: config.capacity,
                blocks,
                free,
                index: HashMap::new(),
                lru_head: None,
                lru_tail: None,
                generation: 0,
                dirty_count: 0,
                sessions: HashMap::new(),
                drivers: HashMap::new(),
                next_session: 1,
                next_driver: 1,
                next_request: 1,
                inflight: HashMap::new(),
            }),
            cond: Condvar::new(),
        })
    }

    pub fn block_size(&self) -> u32 {
        self.inner.lock().block_size
    }

    /// N: the maximum number of resident blocks this cache was created with.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    // ---- driver registration --------------------------------------------

    pub fn register_disk(&self, driver: Arc<dyn DiskDriver>) -> DriverId {
        let mut g = self.inner.lock();
        let id = DriverId(g.next_driver);
        g.next_driver += 1;
        g.drivers.insert(
            id,
            DriverEntry {
                driver,
                open_sessions: 0,
            },
        );
        id
    }

    pub fn unregister_disk(&self, driver: DriverId) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        match g.drivers.get(&driver) {
            Some(entry) if entry.open_sessions > 0 => Err(CacheError::NoDevice),
            Some(_) => {
                g.drivers.remove(&driver);
                Ok(())
            }
            None => Err(CacheError::NoDevice),
        }
    }

    // ---- session lifecycle ------------------------------------------------

    pub fn open_session(&self, driver: DriverId, media_id: MediaId) -> Result<SessionId, CacheError> {
        let mut g = self.inner.lock();
        let info = {
            let entry = g.drivers.get(&driver).ok_or(CacheError::NoDevice)?;
            entry.driver.disk_info()
        };
        let block_size = g.block_size;
        let id = SessionId(g.next_session);
        g.next_session = g
            .next_session
            .checked_add(1)
            .expect("session id counter wrapped");
        g.sessions
            .insert(id, Session::new(driver, media_id, block_size, info));
        g.drivers.get_mut(&driver).unwrap().open_sessions += 1;
        log::debug!("opened session {id:?} driver={driver:?} media={media_id}");
        Ok(id)
    }

    /// The media identity this session was opened with.
    pub fn session_media_id(&self, session: SessionId) -> Result<MediaId, CacheError> {
        let g = self.inner.lock();
        g.sessions.get(&session).map(|s| s.media_id).ok_or(CacheError::NoDevice)
    }

    /// Blocks until every outstanding mapping on this session has been
    /// released, waiting on the condvar (broadcast on every unmap) rather
    /// than busy-polling.
    pub fn close_session(&self, session: SessionId) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        loop {
            let s = g.sessions.get(&session).ok_or(CacheError::NoDevice)?;
            if s.active_mappings == 0 {
                break;
            }
            self.cond.wait(&mut g);
        }
        let driver = g.sessions.get_mut(&session).unwrap().driver;
        g.sessions.get_mut(&session).unwrap().open = false;
        if let Some(entry) = g.drivers.get_mut(&driver) {
            entry.open_sessions = entry.open_sessions.saturating_sub(1);
        }
        Ok(())
    }

    /// Force-drops any resident dirty, unpinned blocks belonging to a
    /// closed session, discarding their unwritten contents. Pinned blocks
    /// are left alone even if dirty.
    pub fn purge_session(&self, session: SessionId) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        match g.sessions.get(&session) {
            Some(s) if !s.open => {}
            Some(_) => return Err(CacheError::NoDevice),
            None => return Err(CacheError::NoDevice),
        }

        let victims: Vec<usize> = g
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.resident && b.session == session && b.dirty && !b.in_use() && !b.pinned)
            .map(|(i, _)| i)
            .collect();

        for idx in victims {
            g.detach(idx);
            let key = (g.blocks[idx].session, g.blocks[idx].lba);
            g.index.remove(&key);
            g.dirty_count -= 1;
            g.blocks[idx].dirty = false;
            g.blocks[idx].has_data = false;
            g.blocks[idx].resident = false;
            g.free.push(idx);
        }
        Ok(())
    }

    // ---- pin / unpin ----------------------------------------------------

    pub fn pin(&self, session: SessionId, lba: u64) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        self.check_open(&g, session)?;
        let idx = g.index.get(&(session, lba)).copied().ok_or(CacheError::NoDevice)?;
        g.blocks[idx].pinned = true;
        log::debug!("pinned session={session:?} lba={lba}");
        Ok(())
    }

    pub fn unpin(&self, session: SessionId, lba: u64) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        self.check_open(&g, session)?;
        let idx = g.index.get(&(session, lba)).copied().ok_or(CacheError::NoDevice)?;
        g.blocks[idx].pinned = false;
        log::debug!("unpinned session={session:?} lba={lba}");
        self.cond.notify_all();
        Ok(())
    }

    // ---- map / unmap -------------------------------------------------------

    pub fn map(&self, session: SessionId, lba: u64, mode: MapMode) -> Result<MappedBlock<'_>, CacheError> {
        let mut g = self.inner.lock();
        loop {
            self.check_open(&g, session)?;

            if let Some(idx) = g.index.get(&(session, lba)).copied() {
                if let Some(outcome) = self.try_acquire_existing(&mut g, idx, mode)? {
                    match outcome {
                        Acquired::Shared => {
                            g.touch(idx);
                            return Ok(self.finish_map(&mut g, session, idx, true));
                        }
                        Acquired::ExclusiveNeedRead => {
                            g.touch(idx);
                            drop(g);
                            let status = self.do_sync_read(session, idx);
                            g = self.inner.lock();
                            self.finish_exclusive_read(&mut g, idx, status)?;
                            let shared = matches!(mode, MapMode::ReadOnly);
                            if shared {
                                g.blocks[idx].exclusive = false;
                                g.blocks[idx].shared = 1;
                            }
                            return Ok(self.finish_map(&mut g, session, idx, shared));
                        }
                        Acquired::ExclusiveNoRead => {
                            g.touch(idx);
                            return Ok(self.finish_map(&mut g, session, idx, false));
                        }
                    }
                }
                // Block is in use in a way incompatible with `mode`; wait.
                self.cond.wait(&mut g);
                continue;
            }

            // Miss: allocate (or evict a victim) and service it like a fresh block.
            let idx = match self.allocate(&mut g) {
                Some(idx) => idx,
                None => {
                    self.cond.wait(&mut g);
                    continue;
                }
            };
            g.insert(idx, session, lba);
            g.blocks[idx].exclusive = true;

            match mode {
                MapMode::Cleared => {
                    g.blocks[idx].has_data = true;
                    return Ok(self.finish_map(&mut g, session, idx, false));
                }
                MapMode::Replace => {
                    g.blocks[idx].has_data = true;
                    return Ok(self.finish_map(&mut g, session, idx, false));
                }
                MapMode::ReadOnly | MapMode::Update => {
                    drop(g);
                    let status = self.do_sync_read(session, idx);
                    g = self.inner.lock();
                    self.finish_exclusive_read(&mut g, idx, status)?;
                    let shared = mode == MapMode::ReadOnly;
                    if shared {
                        g.blocks[idx].exclusive = false;
                        g.blocks[idx].shared = 1;
                    }
                    return Ok(self.finish_map(&mut g, session, idx, shared));
                }
            }
        }
    }

    fn finish_exclusive_read(
        &self,
        g: &mut MutexGuard<'_, CacheInner>,
        idx: usize,
        status: Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        if let Err(e) = status {
            g.blocks[idx].exclusive = false;
            self.cond.notify_all();
            return Err(e);
        }
        Ok(())
    }

    /// Completes a successful `map()`: records the mapping against the
    /// session so `close_session` can wait for it to drain, then hands back
    /// the RAII handle.
    fn finish_map(
        &self,
        g: &mut MutexGuard<'_, CacheInner>,
        session: SessionId,
        idx: usize,
        shared: bool,
    ) -> MappedBlock<'_> {
        if let Some(s) = g.sessions.get_mut(&session) {
            s.active_mappings += 1;
        }
        MappedBlock::new(self, session, idx, shared)
    }

    /// Tries to acquire an existing resident block per `mode`. Returns
    /// `None` if the caller must wait and retry.
    fn try_acquire_existing(
        &self,
        g: &mut MutexGuard<'_, CacheInner>,
        idx: usize,
        mode: MapMode,
    ) -> Result<Option<Acquired>, CacheError> {
        let b = &g.blocks[idx];
        match mode {
            MapMode::ReadOnly => {
                if b.has_data {
                    if b.exclusive {
                        return Ok(None);
                    }
                    g.blocks[idx].shared += 1;
                    Ok(Some(Acquired::Shared))
                } else {
                    if b.in_use() {
                        return Ok(None);
                    }
                    g.blocks[idx].exclusive = true;
                    Ok(Some(Acquired::ExclusiveNeedRead))
                }
            }
            MapMode::Update => {
                if b.in_use() {
                    return Ok(None);
                }
                let has_data = b.has_data;
                g.blocks[idx].exclusive = true;
                if has_data {
                    Ok(Some(Acquired::ExclusiveNoRead))
                } else {
                    Ok(Some(Acquired::ExclusiveNeedRead))
                }
            }
            MapMode::Replace | MapMode::Cleared => {
                if b.in_use() {
                    return Ok(None);
                }
                g.blocks[idx].exclusive = true;
                g.blocks[idx].has_data = true;
                if mode == MapMode::Cleared {
                    g.blocks[idx].data.iter_mut().for_each(|x| *x = 0);
                }
                Ok(Some(Acquired::ExclusiveNoRead))
            }
        }
    }

    pub(crate) fn unmap(
        &self,
        session: SessionId,
        idx: usize,
        was_shared: bool,
        mode: UnmapMode,
    ) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        match mode {
            UnmapMode::None => {
                self.release_lock(&mut g, session, idx, was_shared);
            }
            UnmapMode::DeferredDirty => {
                if was_shared {
                    return Err(CacheError::NoSuchDevice);
                }
                if !g.blocks[idx].dirty {
                    g.blocks[idx].dirty = true;
                    g.dirty_count += 1;
                }
                self.release_lock(&mut g, session, idx, was_shared);
            }
            UnmapMode::SyncWrite => {
                if was_shared {
                    return Err(CacheError::NoSuchDevice);
                }
                g.blocks[idx].exclusive = false;
                g.blocks[idx].shared = 1;
                drop(g);
                let _ = self.do_sync_write(session, idx);
                g = self.inner.lock();
                g.blocks[idx].shared -= 1;
                if let Some(s) = g.sessions.get_mut(&session) {
                    s.active_mappings = s.active_mappings.saturating_sub(1);
                }
                self.cond.notify_all();
            }
        }
        Ok(())
    }

    fn release_lock(
        &self,
        g: &mut MutexGuard<'_, CacheInner>,
        session: SessionId,
        idx: usize,
        was_shared: bool,
    ) {
        if was_shared {
            g.blocks[idx].shared = g.blocks[idx].shared.saturating_sub(1);
        } else {
            g.blocks[idx].exclusive = false;
        }
        if let Some(s) = g.sessions.get_mut(&session) {
            s.active_mappings = s.active_mappings.saturating_sub(1);
        }
        self.cond.notify_all();
    }

    // ---- prefetch -----------------------------------------------------------

    pub fn prefetch(&self, session: SessionId, lba: u64) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        self.check_open(&g, session)?;

        let idx = if let Some(idx) = g.index.get(&(session, lba)).copied() {
            let b = &g.blocks[idx];
            if b.has_data || b.op != Op::Idle {
                g.touch(idx);
                return Ok(());
            }
            if b.in_use() {
                // Someone else already holds it; nothing to do here.
                return Ok(());
            }
            g.touch(idx);
            idx
        } else {
            match self.allocate(&mut g) {
                Some(idx) => {
                    g.insert(idx, session, lba);
                    idx
                }
                None => return Ok(()), // no buffer available; best-effort
            }
        };

        g.blocks[idx].exclusive = true;
        drop(g);
        if let Err(e) = self.do_async_read(session, idx) {
            let mut g = self.inner.lock();
            g.blocks[idx].exclusive = false;
            self.cond.notify_all();
            return Err(e);
        }
        Ok(())
    }

    // ---- sync ---------------------------------------------------------------

    pub fn sync_block(&self, session: SessionId, lba: u64) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        self.check_open(&g, session)?;
        let idx = match g.index.get(&(session, lba)).copied() {
            Some(idx) => idx,
            None => return Ok(()),
        };
        loop {
            let b = &g.blocks[idx];
            if !b.dirty || b.pinned {
                return Ok(());
            }
            if b.in_use() {
                self.cond.wait(&mut g);
                continue;
            }
            g.blocks[idx].shared = 1;
            drop(g);
            let _ = self.do_sync_write(session, idx);
            g = self.inner.lock();
            g.blocks[idx].shared -= 1;
            self.cond.notify_all();
            return Ok(());
        }
    }

    /// Scans the LRU tail to head looking for dirty, unpinned, unused
    /// blocks belonging to `session` and writes each one back, restarting
    /// the scan whenever the generation counter changes while the interlock
    /// was dropped for a write (so a concurrent reuse of a block this scan
    /// already passed can't be missed).
    pub fn sync_session(&self, session: SessionId) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        self.check_open(&g, session)?;

        'outer: loop {
            let snapshot = g.generation;
            let mut cursor = g.lru_tail;
            while let Some(idx) = cursor {
                let b = &g.blocks[idx];
                let eligible =
                    b.session == session && b.dirty && !b.pinned && !b.in_use();
                cursor = b.prev;
                if eligible {
                    g.blocks[idx].shared = 1;
                    drop(g);
                    let _ = self.do_sync_write(session, idx);
                    g = self.inner.lock();
                    g.blocks[idx].shared -= 1;
                    self.cond.notify_all();
                    if g.generation != snapshot {
                        continue 'outer;
                    }
                }
            }
            return Ok(());
        }
    }

    /// Debug-only probe over the cache's internal invariants (spec.md §8
    /// P1-P6). Briefly acquires the interlock and returns on the first
    /// violation found rather than panicking, so tests can assert on the
    /// message.
    pub fn check_invariants(&self) -> Result<(), String> {
        let g = self.inner.lock();

        // P3: no block is both shared and exclusively locked.
        for (idx, b) in g.blocks.iter().enumerate() {
            if b.shared > 0 && b.exclusive {
                return Err(format!("block {idx} is shared and exclusive at once"));
            }
        }

        // P5: resident count never exceeds capacity.
        let resident_count = g.blocks.iter().filter(|b| b.resident).count();
        if resident_count > g.capacity {
            return Err(format!(
                "resident count {resident_count} exceeds capacity {}",
                g.capacity
            ));
        }

        for (idx, b) in g.blocks.iter().enumerate() {
            // A free slot carries no residual state.
            if !b.resident && (b.dirty || b.pinned || b.in_use() || b.op != Op::Idle) {
                return Err(format!("block {idx} is free but not idle"));
            }
            // P6: dirty implies has_data.
            if b.dirty && !b.has_data {
                return Err(format!("block {idx} is dirty without has_data"));
            }
            // P4: an in-flight op implies the block is locked (shared or
            // exclusive); the contrapositive is what the leaked-neighbor
            // class of bug would violate (op cleared to idle but the
            // content lock never released, or vice versa).
            if b.op != Op::Idle && b.shared == 0 && !b.exclusive {
                return Err(format!(
                    "block {idx} has op={:?} but is not locked",
                    b.op
                ));
            }
        }

        // P1 (address-index half): every resident block has exactly one
        // index entry pointing back at it, and the index contains nothing
        // else.
        for (idx, b) in g.blocks.iter().enumerate() {
            if let Some(&found) = g.index.get(&(b.session, b.lba)) {
                if b.resident && found != idx {
                    return Err(format!(
                        "index maps ({:?}, {}) to {found}, not {idx}",
                        b.session, b.lba
                    ));
                }
            } else if b.resident {
                return Err(format!(
                    "resident block {idx} is missing from the address index"
                ));
            }
        }
        if g.index.len() != resident_count {
            return Err(format!(
                "address index has {} entries but {resident_count} blocks are resident",
                g.index.len()
            ));
        }

        // P1 (LRU half): walking the chain visits exactly the resident
        // blocks, once each, with no cycle back into already-visited nodes.
        let mut visited = std::collections::HashSet::new();
        let mut cursor = g.lru_head;
        let mut prev = None;
        while let Some(idx) = cursor {
            if !visited.insert(idx) {
                return Err(format!("LRU chain cycles back through block {idx}"));
            }
            if !g.blocks[idx].resident {
                return Err(format!("LRU chain references non-resident block {idx}"));
            }
            if g.blocks[idx].prev != prev {
                return Err(format!("block {idx}'s prev link disagrees with chain order"));
            }
            prev = Some(idx);
            cursor = g.blocks[idx].next;
        }
        if g.lru_tail != prev {
            return Err(format!(
                "lru_tail {:?} does not match the chain's actual last node {:?}",
                g.lru_tail, prev
            ));
        }
        if visited.len() != resident_count {
            return Err(format!(
                "LRU chain has {} entries but {resident_count} blocks are resident",
                visited.len()
            ));
        }

        // P2: the dirty counter matches the actual dirty blocks.
        let dirty_in_blocks = g.blocks.iter().filter(|b| b.dirty).count();
        if dirty_in_blocks != g.dirty_count {
            return Err(format!(
                "dirty_count {} does not match {dirty_in_blocks} dirty blocks",
                g.dirty_count
            ));
        }
        Ok(())
    }

    /// Optional convenience loop: periodically calls `sync_session` for
    /// every currently open session. Off by default; callers that want it
    /// spawn exactly one of these per `Cache` and hold onto the returned
    /// `JoinHandle` (or simply let it run for the life of the process, since
    /// it only ever observes state through the public API and never panics
    /// on a closed/missing session).
    pub fn spawn_auto_flush(
        self: &Arc<Self>,
        interval: std::time::Duration,
    ) -> std::thread::JoinHandle<()> {
        let cache = Arc::clone(self);
        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            let sessions: Vec<SessionId> = {
                let g = cache.inner.lock();
                g.sessions
                    .iter()
                    .filter(|(_, s)| s.open)
                    .map(|(id, _)| *id)
                    .collect()
            };
            for session in sessions {
                if let Err(e) = cache.sync_session(session) {
                    log::warn!("auto-flush sync_session({session:?}) failed: {e}");
                }
            }
        })
    }

    // ---- internal helpers used by io.rs and MappedBlock ----------------

    pub(crate) fn block_data(&self, idx: usize) -> &[u8] {
        let g = self.inner.lock();
        let ptr = g.blocks[idx].data.as_ptr();
        let len = g.blocks[idx].data.len();
        // SAFETY: the block's storage is pinned for the cache's lifetime and
        // the caller holds the content lock (shared or exclusive) for `idx`,
        // which the interlock guarantees no writer can violate concurrently.
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }

    // The content lock, not the `&self` borrow, is what makes this safe:
    // only the exclusive holder of `idx` ever calls this, enforced by
    // `MappedBlock` construction, not by the type system.
    #[allow(clippy::mut_from_ref)]
    pub(crate) fn block_data_mut(&self, idx: usize) -> &mut [u8] {
        let g = self.inner.lock();
        let ptr = g.blocks[idx].data.as_ptr() as *mut u8;
        let len = g.blocks[idx].data.len();
        // SAFETY: see `block_data`; exclusive content-lock holders are the
        // only callers of `data_mut`.
        unsafe { std::slice::from_raw_parts_mut(ptr, len) }
    }

    pub(crate) fn check_open(&self, g: &CacheInner, session: SessionId) -> Result<(), CacheError> {
        match g.sessions.get(&session) {
            Some(s) if s.open => Ok(()),
            Some(_) | None => Err(CacheError::NoDevice),
        }
    }

    /// Allocates a free slot or evicts an LRU victim. Returns `None` if the
    /// pool is full and no victim is currently eligible — the caller should
    /// wait on the condvar and retry.
    pub(crate) fn allocate(&self, g: &mut MutexGuard<'_, CacheInner>) -> Option<usize> {
        if let Some(idx) = g.free.pop() {
            return Some(idx);
        }
        let mut cursor = g.lru_tail;
        while let Some(idx) = cursor {
            cursor = g.blocks[idx].prev;
            if g.blocks[idx].is_victim_candidate() {
                g.detach(idx);
                let key = (g.blocks[idx].session, g.blocks[idx].lba);
                g.index.remove(&key);
                log::debug!(
                    "evicting block idx={idx} session={:?} lba={} to make room",
                    key.0, key.1
                );
                return Some(idx);
            }
        }
        None
    }
}

impl CacheInner {
    /// Moves `idx` to the LRU head; used both for fresh insertion and for
    /// "recent use" touches.
    pub(crate) fn touch(&mut self, idx: usize) {
        self.detach(idx);
        self.push_front(idx);
        self.generation += 1;
    }

    pub(crate) fn insert(&mut self, idx: usize, session: SessionId, lba: u64) {
        self.blocks[idx].retarget(session, lba);
        self.index.insert((session, lba), idx);
        self.push_front(idx);
        self.generation += 1;
    }

    fn push_front(&mut self, idx: usize) {
        self.blocks[idx].prev = None;
        self.blocks[idx].next = self.lru_head;
        if let Some(head) = self.lru_head {
            self.blocks[head].prev = Some(idx);
        }
        self.lru_head = Some(idx);
        if self.lru_tail.is_none() {
            self.lru_tail = Some(idx);
        }
    }

    pub(crate) fn detach(&mut self, idx: usize) {
        let prev = self.blocks[idx].prev;
        let next = self.blocks[idx].next;
        match prev {
            Some(p) => self.blocks[p].next = next,
            None => self.lru_head = next,
        }
        match next {
            Some(n) => self.blocks[n].prev = prev,
            None => self.lru_tail = prev,
        }
        self.blocks[idx].prev = None;
        self.blocks[idx].next = None;
    }
}
