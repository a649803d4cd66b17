use std::collections::HashMap;

use sysinfo::Disks;

use crate::system::delta::DiskCounters;

/// Cumulative per-process I/O counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoStats {
    pub read_ops: u64,
    pub write_ops: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedStats {
    /// Voluntary plus involuntary.
    pub ctx_switches: u64,
    pub threads: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NicDrops {
    pub drops_in: u64,
    pub drops_out: u64,
}

/// Counters the sampling library does not expose.
pub trait PlatformExtensions {
    fn process_io(pid: u32) -> Option<IoStats>;
    fn process_sched(pid: u32) -> Option<SchedStats>;
    fn process_exists(pid: u32) -> bool;
    fn disk_io() -> Option<DiskCounters>;
    fn nic_drops() -> Option<HashMap<String, NicDrops>>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod unsupported;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(target_os = "macos")]
use macos as platform_impl;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
use unsupported as platform_impl;
#[cfg(target_os = "windows")]
use windows as platform_impl;

pub fn process_io(pid: u32) -> Option<IoStats> {
    platform_impl::Platform::process_io(pid)
}

pub fn process_sched(pid: u32) -> Option<SchedStats> {
    platform_impl::Platform::process_sched(pid)
}

pub fn process_exists(pid: u32) -> bool {
    platform_impl::Platform::process_exists(pid)
}

pub fn disk_io() -> Option<DiskCounters> {
    platform_impl::Platform::disk_io()
}

pub fn nic_drops() -> Option<HashMap<String, NicDrops>> {
    platform_impl::Platform::nic_drops()
}

/// Byte totals summed over the disks the sampling library lists. It exposes
/// no operation counts or busy times, so those stay at zero.
#[cfg_attr(target_os = "linux", allow(dead_code))]
fn sysinfo_disk_bytes() -> Option<DiskCounters> {
    let disks = Disks::new_with_refreshed_list();
    if disks.list().is_empty() {
        return None;
    }
    let mut counters = DiskCounters::default();
    for disk in disks.list() {
        let usage = disk.usage();
        counters.read_bytes += usage.total_read_bytes;
        counters.write_bytes += usage.total_written_bytes;
    }
    Some(counters)
}
