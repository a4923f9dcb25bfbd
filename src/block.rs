use crate::error::CacheError;
use crate::session::SessionId;

/// Current disk operation in flight against a block, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Idle,
    Read,
    Write,
}

/// A single resident (or free) slot in the fixed-capacity block pool.
///
/// Slots are allocated once, up front, and never relocated or freed for the
/// life of the cache, so a raw pointer into `data` stays valid across a
/// dropped interlock — this is what lets `IoVector::buf` point directly at
/// a block's storage for the duration of a driver request.
pub(crate) struct Block {
    pub resident: bool,
    pub session: SessionId,
    pub lba: u64,

    pub data: Vec<u8>,
    pub has_data: bool,
    pub dirty: bool,
    pub pinned: bool,

    pub shared: u32,
    pub exclusive: bool,

    pub op: Op,
    pub async_op: bool,
    pub read_status: Option<CacheError>,

    // Intrusive LRU links (most-recently-used-first).
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

impl Block {
    pub fn new(block_size: u32) -> Self {
        Self {
            resident: false,
            session: SessionId(0),
            lba: 0,
            data: vec![0u8; block_size as usize],
            has_data: false,
            dirty: false,
            pinned: false,
            shared: 0,
            exclusive: false,
            op: Op::Idle,
            async_op: false,
            read_status: None,
            prev: None,
            next: None,
        }
    }

    /// A block is in use if it is shared or exclusively locked.
    pub fn in_use(&self) -> bool {
        self.shared > 0 || self.exclusive
    }

    /// A block is eligible for eviction only once it is clean, unpinned and
    /// unused.
    pub fn is_victim_candidate(&self) -> bool {
        !self.in_use() && !self.dirty && !self.pinned
    }

    /// Resets a slot for reuse at a new (session, lba) address: the data
    /// buffer is zeroed and every flag returns to its just-allocated state.
    pub fn retarget(&mut self, session: SessionId, lba: u64) {
        self.session = session;
        self.lba = lba;
        self.data.iter_mut().for_each(|b| *b = 0);
        self.has_data = false;
        self.dirty = false;
        self.pinned = false;
        self.shared = 0;
        self.exclusive = false;
        self.op = Op::Idle;
        self.async_op = false;
        self.read_status = None;
        self.resident = true;
    }
}
