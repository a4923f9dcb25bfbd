use crate::driver::DiskInfo;

/// Opaque session identity handed back by `Cache::open_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub(crate) u64);

/// Opaque identity of a registered disk driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(pub(crate) u64);

/// Media identity, as reported by the driver/filesystem at open time.
pub type MediaId = u64;

/// The geometry and bookkeeping a session carries for its lifetime
/// (spec.md §3 "Session"). `active_mappings` must reach zero before the
/// session can close (I9).
pub(crate) struct Session {
    pub driver: DriverId,
    pub media_id: MediaId,
    pub sector_size: u32,
    pub rw_cluster_size: u32,
    pub s2b_factor: u32,
    pub trail_pad: u32,
    pub active_mappings: u32,
    pub open: bool,
}

impl Session {
    pub fn new(driver: DriverId, media_id: MediaId, block_size: u32, info: DiskInfo) -> Self {
        let (s2b_factor, trail_pad) = if info.sector_size != 0
            && info.sector_size.is_power_of_two()
            && block_size.is_multiple_of(info.sector_size)
        {
            (block_size / info.sector_size, 0)
        } else {
            (1, block_size.saturating_sub(info.sector_size))
        };

        Self {
            driver,
            media_id,
            sector_size: info.sector_size,
            rw_cluster_size: info.sectors_per_rdwr.max(1),
            s2b_factor,
            trail_pad,
            active_mappings: 0,
            open: true,
        }
    }

    /// Absolute byte offset of `lba` on the device (§6).
    pub fn byte_offset(&self, lba: u64) -> u64 {
        lba * self.s2b_factor as u64 * self.sector_size as u64
    }
}
