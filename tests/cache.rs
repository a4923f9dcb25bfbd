//! End-to-end exercise of the public API against an in-memory fake driver,
//! independent of the unit tests colocated in `src/lib.rs` (SPEC_FULL.md §9).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serena_diskcache::{
    Cache, CacheConfig, CacheError, DiskDriver, DiskInfo, IoKind, IoRequest, MapMode, UnmapMode,
};

struct MemDisk {
    media: Mutex<Vec<u8>>,
    sector_size: u32,
    sectors_per_rdwr: u32,
}

static CURRENT_CACHE: AtomicU64 = AtomicU64::new(0);

impl MemDisk {
    fn new(bytes: usize, sector_size: u32, sectors_per_rdwr: u32) -> Arc<Self> {
        Arc::new(Self {
            media: Mutex::new(vec![0u8; bytes]),
            sector_size,
            sectors_per_rdwr,
        })
    }
}

impl DiskDriver for MemDisk {
    fn disk_info(&self) -> DiskInfo {
        DiskInfo {
            sector_size: self.sector_size,
            sectors_per_rdwr: self.sectors_per_rdwr,
        }
    }

    fn submit(&self, request: IoRequest) -> Result<(), CacheError> {
        let mut media = self.media.lock().unwrap();
        let mut total = 0usize;
        for v in &request.vectors {
            // SAFETY: the cache holds the content lock for every block this
            // request addresses for the full synchronous duration of submit.
            let slice = unsafe { std::slice::from_raw_parts_mut(v.buf, v.len) };
            let end = (v.byte_offset as usize + v.len).min(media.len());
            let start = (v.byte_offset as usize).min(end);
            let n = end - start;
            if request.kind == IoKind::Write {
                media[start..start + n].copy_from_slice(&slice[..n]);
            } else {
                slice[..n].copy_from_slice(&media[start..start + n]);
            }
            total += n;
        }
        drop(media);
        let ptr = CURRENT_CACHE.load(Ordering::SeqCst) as *const Cache;
        // SAFETY: test-only; set by `with_cache` before any request is issued
        // and the referenced `Cache` outlives the call on the caller's stack.
        unsafe { &*ptr }.on_request_done(request.id, total, Ok(()));
        Ok(())
    }
}

fn with_cache(cache: &Cache) {
    CURRENT_CACHE.store(cache as *const Cache as u64, Ordering::SeqCst);
}

#[test]
fn write_then_read_roundtrip() {
    let cache = Cache::create(CacheConfig {
        block_size: 512,
        capacity: 8,
    })
    .unwrap();
    with_cache(&cache);

    let drv = MemDisk::new(512 * 128, 512, 4);
    let driver_id = cache.register_disk(drv);
    let session = cache.open_session(driver_id, 1).unwrap();

    let mut m = cache.map(session, 5, MapMode::Replace).unwrap();
    m.data_mut().iter_mut().for_each(|b| *b = 0x42);
    m.unmap(UnmapMode::SyncWrite).unwrap();

    let m = cache.map(session, 5, MapMode::ReadOnly).unwrap();
    assert!(m.data().iter().all(|&b| b == 0x42));
    m.unmap(UnmapMode::None).unwrap();

    cache.close_session(session).unwrap();
}

#[test]
fn register_disk_rejects_unregister_with_open_session() {
    let cache = Cache::create(CacheConfig {
        block_size: 512,
        capacity: 4,
    })
    .unwrap();
    with_cache(&cache);

    let drv = MemDisk::new(512 * 16, 512, 1);
    let driver_id = cache.register_disk(drv);
    let session = cache.open_session(driver_id, 1).unwrap();

    assert!(cache.unregister_disk(driver_id).is_err());

    cache.close_session(session).unwrap();
    assert!(cache.unregister_disk(driver_id).is_ok());
}

#[test]
fn purge_session_drops_dirty_blocks_after_close() {
    let cache = Cache::create(CacheConfig {
        block_size: 512,
        capacity: 4,
    })
    .unwrap();
    with_cache(&cache);

    let drv = MemDisk::new(512 * 16, 512, 1);
    let driver_id = cache.register_disk(drv);
    let session = cache.open_session(driver_id, 1).unwrap();

    let mut m = cache.map(session, 2, MapMode::Replace).unwrap();
    m.data_mut().iter_mut().for_each(|b| *b = 7);
    m.unmap(UnmapMode::DeferredDirty).unwrap();

    cache.close_session(session).unwrap();
    // The dirty block can no longer be flushed against a closed session.
    assert!(cache.sync_session(session).is_err());
    cache.purge_session(session).unwrap();
}

#[test]
fn invariants_hold_after_ordinary_use() {
    let cache = Cache::create(CacheConfig {
        block_size: 256,
        capacity: 4,
    })
    .unwrap();
    with_cache(&cache);

    let drv = MemDisk::new(256 * 64, 256, 1);
    let driver_id = cache.register_disk(drv);
    let session = cache.open_session(driver_id, 1).unwrap();

    for lba in 0..6 {
        let m = cache.map(session, lba, MapMode::ReadOnly).unwrap();
        m.unmap(UnmapMode::None).unwrap();
    }

    cache.check_invariants().unwrap();
    cache.close_session(session).unwrap();
}
