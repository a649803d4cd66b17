use std::collections::HashMap;

use libproc::libproc::bsd_info::BSDInfo;
use libproc::libproc::pid_rusage::{RUsageInfoV2, pidrusage};
use libproc::libproc::proc_pid::pidinfo;
use libproc::libproc::task_info::TaskAllInfo;

use super::{IoStats, NicDrops, PlatformExtensions, SchedStats};
use crate::system::delta::DiskCounters;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_io(pid: u32) -> Option<IoStats> {
        // rusage exposes byte totals only; op counts stay at zero.
        let usage = pidrusage::<RUsageInfoV2>(pid as i32).ok()?;
        Some(IoStats {
            read_ops: 0,
            write_ops: 0,
            read_bytes: usage.ri_diskio_bytesread,
            write_bytes: usage.ri_diskio_byteswritten,
        })
    }

    fn process_sched(pid: u32) -> Option<SchedStats> {
        let info = pidinfo::<TaskAllInfo>(pid as i32, 0).ok()?;
        Some(SchedStats {
            ctx_switches: info.ptinfo.pti_csw.max(0) as u64,
            threads: info.ptinfo.pti_threadnum.max(0) as u64,
        })
    }

    fn process_exists(pid: u32) -> bool {
        pidinfo::<BSDInfo>(pid as i32, 0).is_ok()
    }

    fn disk_io() -> Option<DiskCounters> {
        super::sysinfo_disk_bytes()
    }

    fn nic_drops() -> Option<HashMap<String, NicDrops>> {
        None
    }
}
