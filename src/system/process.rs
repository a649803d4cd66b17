use std::collections::HashMap;
use std::ops::AddAssign;

use crate::emit::Field;
use crate::format::{round_to, to_kib};

/// One row of the live process listing.
#[derive(Clone, Debug)]
pub struct ProcessEntry {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub children: Vec<u32>,
}

impl ProcessEntry {
    pub fn new(pid: u32, ppid: u32, name: impl Into<String>) -> Self {
        ProcessEntry {
            pid,
            ppid,
            name: name.into(),
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProcessTree {
    pub processes: HashMap<u32, ProcessEntry>,
}

pub fn build_process_tree_from_flat(processes: Vec<ProcessEntry>) -> ProcessTree {
    let mut by_pid = HashMap::with_capacity(processes.len());
    for mut process in processes {
        // Build parent-child links from pid/ppid only.
        process.children.clear();
        by_pid.insert(process.pid, process);
    }

    let pids: Vec<u32> = by_pid.keys().copied().collect();
    for pid in pids {
        let ppid = by_pid.get(&pid).map(|p| p.ppid).unwrap_or(0);
        if ppid == pid {
            continue;
        }
        if let Some(parent) = by_pid.get_mut(&ppid) {
            parent.children.push(pid);
        }
    }

    for process in by_pid.values_mut() {
        process.children.sort_unstable();
    }

    ProcessTree { processes: by_pid }
}

impl ProcessTree {
    pub fn children(&self, pid: u32) -> &[u32] {
        self.processes
            .get(&pid)
            .map(|p| p.children.as_slice())
            .unwrap_or(&[])
    }

    /// Pids in ascending order.
    pub fn pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.processes.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

/// Instantaneous resource readings of one process.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub io_read_ops: u64,
    pub io_write_ops: u64,
    pub io_read_bytes: u64,
    pub io_write_bytes: u64,
    pub rss_bytes: u64,
    /// Share of total system memory, 0..=100.
    pub mem_percent: f64,
    /// Usage since this process was last observed; may exceed 100.
    pub cpu_percent: f64,
    pub ctx_switches: u64,
    pub num_threads: u64,
}

/// Element-wise sum of a set of [`ProcessSnapshot`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AggregateSnapshot {
    pub processes: u64,
    pub io_read_ops: u64,
    pub io_write_ops: u64,
    pub io_read_bytes: u64,
    pub io_write_bytes: u64,
    pub rss_bytes: u64,
    pub mem_percent: f64,
    pub cpu_percent: f64,
    pub ctx_switches: u64,
    pub num_threads: u64,
}

impl AddAssign<&ProcessSnapshot> for AggregateSnapshot {
    fn add_assign(&mut self, s: &ProcessSnapshot) {
        self.processes += 1;
        self.io_read_ops += s.io_read_ops;
        self.io_write_ops += s.io_write_ops;
        self.io_read_bytes += s.io_read_bytes;
        self.io_write_bytes += s.io_write_bytes;
        self.rss_bytes += s.rss_bytes;
        self.mem_percent += s.mem_percent;
        self.cpu_percent += s.cpu_percent;
        self.ctx_switches += s.ctx_switches;
        self.num_threads += s.num_threads;
    }
}

impl AggregateSnapshot {
    /// Column names, sorted by name.
    pub const COLUMNS: [&'static str; 9] = [
        "%CPU",
        "%MEM",
        "io.read",
        "io.read.KB",
        "io.write",
        "io.write.KB",
        "mem.rss.KB",
        "nctxsw",
        "nthreads",
    ];

    /// Record values in [`Self::COLUMNS`] order: percentages rounded to three
    /// digits, byte counts in KiB.
    pub fn fields(&self) -> Vec<Field> {
        vec![
            Field::Float(round_to(self.cpu_percent, 3)),
            Field::Float(round_to(self.mem_percent, 3)),
            Field::UInt(self.io_read_ops),
            Field::UInt(to_kib(self.io_read_bytes)),
            Field::UInt(self.io_write_ops),
            Field::UInt(to_kib(self.io_write_bytes)),
            Field::UInt(to_kib(self.rss_bytes)),
            Field::UInt(self.ctx_switches),
            Field::UInt(self.num_threads),
        ]
    }
}
