use std::collections::HashMap;
use std::path::Path;

use super::{IoStats, NicDrops, PlatformExtensions, SchedStats};
use crate::system::delta::DiskCounters;

const SECTOR_SIZE: u64 = 512;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_io(pid: u32) -> Option<IoStats> {
        let contents = std::fs::read_to_string(format!("/proc/{pid}/io")).ok()?;
        parse_proc_io(&contents)
    }

    fn process_sched(pid: u32) -> Option<SchedStats> {
        let contents = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        parse_status(&contents)
    }

    fn process_exists(pid: u32) -> bool {
        Path::new(&format!("/proc/{pid}")).exists()
    }

    fn disk_io() -> Option<DiskCounters> {
        let contents = std::fs::read_to_string("/proc/diskstats").ok()?;
        // Whole devices only; partitions would be counted twice.
        Some(parse_diskstats(&contents, |name| {
            Path::new("/sys/block").join(name.replace('/', "!")).exists()
        }))
    }

    fn nic_drops() -> Option<HashMap<String, NicDrops>> {
        let contents = std::fs::read_to_string("/proc/net/dev").ok()?;
        Some(parse_net_dev(&contents))
    }
}

/// `/proc/<pid>/io`: syscall counts and storage-layer byte counts.
fn parse_proc_io(contents: &str) -> Option<IoStats> {
    let mut read_ops = None;
    let mut write_ops = None;
    let mut read_bytes = None;
    let mut write_bytes = None;
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().parse().ok();
        match key {
            "syscr" => read_ops = value,
            "syscw" => write_ops = value,
            "read_bytes" => read_bytes = value,
            "write_bytes" => write_bytes = value,
            _ => {}
        }
    }
    Some(IoStats {
        read_ops: read_ops?,
        write_ops: write_ops?,
        read_bytes: read_bytes?,
        write_bytes: write_bytes?,
    })
}

fn parse_status(contents: &str) -> Option<SchedStats> {
    let mut threads = None;
    let mut voluntary = None;
    let mut involuntary = None;
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().parse::<u64>().ok();
        match key {
            "Threads" => threads = value,
            "voluntary_ctxt_switches" => voluntary = value,
            "nonvoluntary_ctxt_switches" => involuntary = value,
            _ => {}
        }
    }
    Some(SchedStats {
        ctx_switches: voluntary? + involuntary?,
        threads: threads?,
    })
}

fn parse_diskstats(contents: &str, is_device: impl Fn(&str) -> bool) -> DiskCounters {
    let mut total = DiskCounters::default();
    for line in contents.lines() {
        // major minor name reads merged sectors ms writes merged sectors ms ...
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 11 || !is_device(fields[2]) {
            continue;
        }
        let num = |i: usize| fields[i].parse::<u64>().unwrap_or(0);
        total.read_ops += num(3);
        total.read_bytes += num(5) * SECTOR_SIZE;
        total.read_ms += num(6);
        total.write_ops += num(7);
        total.write_bytes += num(9) * SECTOR_SIZE;
        total.write_ms += num(10);
    }
    total
}

fn parse_net_dev(contents: &str) -> HashMap<String, NicDrops> {
    let mut drops = HashMap::new();
    // Two header lines, then "iface: rx(8 cols) tx(8 cols)".
    for line in contents.lines().skip(2) {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<u64> = counters
            .split_whitespace()
            .map(|f| f.parse().unwrap_or(0))
            .collect();
        if fields.len() < 12 {
            continue;
        }
        drops.insert(
            name.trim().to_string(),
            NicDrops {
                drops_in: fields[3],
                drops_out: fields[11],
            },
        );
    }
    drops
}
