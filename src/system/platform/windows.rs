use std::collections::HashMap;

use windows_sys::Win32::{
    Foundation::CloseHandle,
    System::Threading::{
        GetExitCodeProcess, GetProcessIoCounters, IO_COUNTERS, OpenProcess,
        PROCESS_QUERY_LIMITED_INFORMATION,
    },
};

use super::{IoStats, NicDrops, PlatformExtensions, SchedStats};
use crate::system::delta::DiskCounters;

const STILL_ACTIVE: u32 = 259;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_io(pid: u32) -> Option<IoStats> {
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return None;
            }
            let mut counters = std::mem::zeroed::<IO_COUNTERS>();
            let ok = GetProcessIoCounters(handle, &mut counters);
            CloseHandle(handle);
            if ok == 0 {
                return None;
            }
            Some(IoStats {
                read_ops: counters.ReadOperationCount,
                write_ops: counters.WriteOperationCount,
                read_bytes: counters.ReadTransferCount,
                write_bytes: counters.WriteTransferCount,
            })
        }
    }

    fn process_sched(_pid: u32) -> Option<SchedStats> {
        None
    }

    fn process_exists(pid: u32) -> bool {
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return false;
            }
            let mut code = 0u32;
            let ok = GetExitCodeProcess(handle, &mut code);
            CloseHandle(handle);
            ok != 0 && code == STILL_ACTIVE
        }
    }

    fn disk_io() -> Option<DiskCounters> {
        super::sysinfo_disk_bytes()
    }

    fn nic_drops() -> Option<HashMap<String, NicDrops>> {
        None
    }
}
