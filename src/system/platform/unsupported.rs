use std::collections::HashMap;

use super::{IoStats, NicDrops, PlatformExtensions, SchedStats};
use crate::system::delta::DiskCounters;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_io(_pid: u32) -> Option<IoStats> {
        None
    }

    fn process_sched(_pid: u32) -> Option<SchedStats> {
        None
    }

    // Without an OS view, trust the sampling library's listing.
    fn process_exists(_pid: u32) -> bool {
        true
    }

    fn disk_io() -> Option<DiskCounters> {
        None
    }

    fn nic_drops() -> Option<HashMap<String, NicDrops>> {
        None
    }
}
