use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::block::Op;
use crate::cache::{Cache, CacheInner};
use crate::driver::{DiskDriver, IoKind, IoRequest, IoVector};
use crate::error::CacheError;
use crate::session::SessionId;

/// Bookkeeping for one outstanding driver request, enough to fan a single
/// completion callback back out to every block it touched.
pub(crate) struct InflightMeta {
    pub kind: Op,
    /// Bytes submitted per block (block size minus the session's trailing
    /// pad); a full transfer for every block in `blocks` equals this many
    /// bytes, not the raw block size.
    pub io_len: usize,
    pub blocks: Vec<usize>,
}

impl Cache {
    /// Computes the cluster-aligned window around `primary` and
    /// opportunistically folds in neighbouring blocks that are idle,
    /// unlocked and missing data, so one driver request can warm several
    /// blocks at once. Blocks already in use are simply skipped rather than
    /// waited on.
    pub(crate) fn build_read_cluster(
        &self,
        g: &mut MutexGuard<'_, CacheInner>,
        session: SessionId,
        primary: usize,
    ) -> Vec<usize> {
        let cluster = g
            .sessions
            .get(&session)
            .map(|s| s.rw_cluster_size.max(1) as u64)
            .unwrap_or(1);
        let primary_lba = g.blocks[primary].lba;
        let start = (primary_lba / cluster) * cluster;

        let mut found = vec![(primary_lba, primary)];
        for offset in 0..cluster {
            let lba = start + offset;
            if lba == primary_lba {
                continue;
            }
            if let Some(idx) = self.try_include_cluster_block(g, session, lba) {
                found.push((lba, idx));
            }
        }
        found.sort_by_key(|(lba, _)| *lba);
        found.into_iter().map(|(_, idx)| idx).collect()
    }

    fn try_include_cluster_block(
        &self,
        g: &mut MutexGuard<'_, CacheInner>,
        session: SessionId,
        lba: u64,
    ) -> Option<usize> {
        if let Some(&idx) = g.index.get(&(session, lba)) {
            let b = &g.blocks[idx];
            if b.in_use() || b.has_data || b.op != Op::Idle {
                return None;
            }
            g.blocks[idx].exclusive = true;
            Some(idx)
        } else {
            let idx = self.allocate(g)?;
            g.insert(idx, session, lba);
            g.blocks[idx].exclusive = true;
            Some(idx)
        }
    }

    fn resolve_driver(
        &self,
        g: &CacheInner,
        session: SessionId,
    ) -> Result<Arc<dyn DiskDriver>, CacheError> {
        let s = g.sessions.get(&session).ok_or(CacheError::NoDevice)?;
        if !s.open {
            return Err(CacheError::NoDevice);
        }
        let entry = g.drivers.get(&s.driver).ok_or(CacheError::NoDevice)?;
        Ok(entry.driver.clone())
    }

    /// Builds I/O vectors for `idxs`, marks each block's `op`/`async` state,
    /// drops the interlock around the driver submission, and reacquires it.
    /// Blocks whose op already equals `kind` are treated as already in
    /// flight and are folded into this wait without a second request.
    ///
    /// `primary` names the one block (if any) whose caller is actually going
    /// to wait on this request when `is_sync` is set; every other block in
    /// `idxs` — cluster neighbors opportunistically folded in alongside a
    /// synchronous read, for instance — has no waiter of its own and must be
    /// marked async regardless of `is_sync`, so `complete_request` unlocks
    /// and releases it instead of leaving its content lock held forever.
    pub(crate) fn build_and_submit<'c>(
        &'c self,
        mut g: MutexGuard<'c, CacheInner>,
        session: SessionId,
        kind: Op,
        idxs: Vec<usize>,
        primary: Option<usize>,
        is_sync: bool,
    ) -> (MutexGuard<'c, CacheInner>, Result<(), CacheError>) {
        if kind == Op::Write {
            for &idx in &idxs {
                if g.blocks[idx].pinned {
                    return (g, Err(CacheError::NoSuchDevice));
                }
            }
        }

        let fresh: Vec<usize> = idxs
            .iter()
            .copied()
            .filter(|&idx| g.blocks[idx].op != kind)
            .collect();
        if fresh.is_empty() {
            return (g, Ok(()));
        }

        let driver = match self.resolve_driver(&g, session) {
            Ok(d) => d,
            Err(e) => return (g, Err(e)),
        };
        let block_size = g.block_size;
        let req_id = g.next_request;
        g.next_request += 1;

        let io_len = {
            let s = g.sessions.get(&session).unwrap();
            (block_size - s.trail_pad) as usize
        };

        let mut vectors = Vec::with_capacity(fresh.len());
        for &idx in &fresh {
            let lba = g.blocks[idx].lba;
            let offset = g.sessions.get(&session).unwrap().byte_offset(lba);
            let buf = g.blocks[idx].data.as_mut_ptr();
            vectors.push(IoVector {
                byte_offset: offset,
                len: io_len,
                buf,
            });
            g.blocks[idx].op = kind;
            g.blocks[idx].async_op = if Some(idx) == primary { !is_sync } else { true };
            if kind == Op::Read {
                g.blocks[idx].read_status = None;
            }
        }
        g.inflight.insert(
            req_id,
            InflightMeta {
                kind,
                io_len,
                blocks: fresh,
            },
        );

        let request = IoRequest {
            id: req_id,
            kind: if kind == Op::Read {
                IoKind::Read
            } else {
                IoKind::Write
            },
            vectors,
        };

        drop(g);
        let submit_result = driver.submit(request);
        let mut g = self.inner.lock();
        if let Err(e) = submit_result {
            self.complete_request(&mut g, req_id, 0, Err(e));
            return (g, Err(e));
        }
        (g, Ok(()))
    }

    /// Synchronous read-in for a block already held exclusively by the
    /// caller. Returns the per-block read status.
    pub(crate) fn do_sync_read(&self, session: SessionId, primary: usize) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        let idxs = self.build_read_cluster(&mut g, session, primary);
        let (mut g, res) = self.build_and_submit(g, session, Op::Read, idxs, Some(primary), true);
        res?;
        while g.blocks[primary].op != Op::Idle {
            self.cond.wait(&mut g);
        }
        match g.blocks[primary].read_status {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Fire-and-forget read for `prefetch`. The completion callback releases
    /// the exclusive lock the caller already holds.
    pub(crate) fn do_async_read(&self, session: SessionId, primary: usize) -> Result<(), CacheError> {
        let mut g = self.inner.lock();
        let idxs = self.build_read_cluster(&mut g, session, primary);
        let (_g, res) = self.build_and_submit(g, session, Op::Read, idxs, None, false);
        res
    }

    /// Synchronous writeback for a block already downgraded to shared by
    /// the caller. The dirty bit (not a returned error) is the only durable
    /// signal of a failed writeback; submission-time rejection (e.g. a
    /// pinned block) is still surfaced since it never touched the driver.
    pub(crate) fn do_sync_write(&self, session: SessionId, idx: usize) -> Result<(), CacheError> {
        let g = self.inner.lock();
        let (mut g, res) =
            self.build_and_submit(g, session, Op::Write, vec![idx], Some(idx), true);
        res?;
        while g.blocks[idx].op != Op::Idle {
            self.cond.wait(&mut g);
        }
        Ok(())
    }

    /// `on_request_done` (spec.md §6): invoked by the driver's completion
    /// context, never by filesystems.
    pub fn on_request_done(&self, request_id: u64, byte_count: usize, status: Result<(), CacheError>) {
        let mut g = self.inner.lock();
        self.complete_request(&mut g, request_id, byte_count, status);
    }

    fn complete_request(
        &self,
        g: &mut MutexGuard<'_, CacheInner>,
        request_id: u64,
        byte_count: usize,
        status: Result<(), CacheError>,
    ) {
        let meta = match g.inflight.remove(&request_id) {
            Some(m) => m,
            None => return,
        };
        let mut remaining = byte_count;
        for idx in meta.blocks {
            let give = remaining.min(meta.io_len);
            remaining -= give;
            let short = give < meta.io_len;
            let block_status = if let Err(e) = status {
                Err(e)
            } else if short {
                Err(CacheError::Io)
            } else {
                Ok(())
            };

            if let Err(e) = block_status {
                log::warn!(
                    "{:?} failed for block idx={idx} (lba={}): {e}",
                    meta.kind,
                    g.blocks[idx].lba
                );
            }

            let was_async = g.blocks[idx].async_op;
            match meta.kind {
                Op::Read => {
                    if block_status.is_ok() {
                        g.blocks[idx].has_data = true;
                    }
                    g.blocks[idx].read_status = block_status.err();
                    g.blocks[idx].op = Op::Idle;
                    g.blocks[idx].async_op = false;
                    if was_async {
                        g.blocks[idx].exclusive = false;
                    }
                }
                Op::Write => {
                    if block_status.is_ok() && g.blocks[idx].dirty {
                        g.blocks[idx].dirty = false;
                        g.dirty_count -= 1;
                    }
                    g.blocks[idx].op = Op::Idle;
                    g.blocks[idx].async_op = false;
                    if was_async {
                        g.blocks[idx].shared = g.blocks[idx].shared.saturating_sub(1);
                    }
                }
                Op::Idle => {}
            }
        }
        self.cond.notify_all();
    }
}
