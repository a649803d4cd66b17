#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use resmon::emit::{MemoryEmitter, Recorded, SampleEmitter};
use resmon::error::ProbeError;
use resmon::system::delta::{DiskCounters, NicCounters};
use resmon::system::probe::{NicProbe, ProcessProbe, SystemProbe};
use resmon::system::process::{ProcessEntry, ProcessSnapshot};
use resmon::system::snapshot::SystemSnapshot;

/// Names of probes in the order they were read.
pub type Journal = Arc<Mutex<Vec<&'static str>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn memory_emitter() -> (Box<dyn SampleEmitter>, Arc<Mutex<Recorded>>) {
    let emitter = MemoryEmitter::new();
    let handle = emitter.handle();
    (Box::new(emitter), handle)
}

pub fn snapshot(pid: u32, rss_bytes: u64, cpu_percent: f64) -> ProcessSnapshot {
    ProcessSnapshot {
        pid,
        io_read_ops: 1,
        io_read_bytes: 1024,
        rss_bytes,
        cpu_percent,
        ctx_switches: 10,
        num_threads: 1,
        ..Default::default()
    }
}

/// A fixed process table. Listed pids without a reading behave as if they
/// exited between listing and read.
#[derive(Default)]
pub struct FakeProcesses {
    listing: Vec<ProcessEntry>,
    readings: HashMap<u32, ProcessSnapshot>,
    reads: RefCell<Vec<u32>>,
    fail_listing: bool,
    journal: Option<Journal>,
    interrupt: Option<(usize, watch::Sender<bool>)>,
    listings: usize,
}

impl FakeProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(mut self, pid: u32, ppid: u32, name: &str, rss_bytes: u64) -> Self {
        self.listing.push(ProcessEntry::new(pid, ppid, name));
        self.readings
            .insert(pid, snapshot(pid, rss_bytes, rss_bytes as f64 / 1024.0));
        self
    }

    pub fn vanished(mut self, pid: u32, ppid: u32, name: &str) -> Self {
        self.listing.push(ProcessEntry::new(pid, ppid, name));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(Arc::clone(journal));
        self
    }

    /// Requests shutdown from inside the `n`-th listing.
    pub fn interrupt_on_listing(mut self, n: usize, tx: watch::Sender<bool>) -> Self {
        self.interrupt = Some((n, tx));
        self
    }

    pub fn reads(&self) -> Vec<u32> {
        self.reads.borrow().clone()
    }
}

impl ProcessProbe for FakeProcesses {
    fn list(&mut self) -> Result<Vec<ProcessEntry>, ProbeError> {
        self.listings += 1;
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push("process-set");
        }
        if let Some((n, tx)) = &self.interrupt {
            if *n == self.listings {
                tx.send(true).unwrap();
            }
        }
        if self.fail_listing {
            return Err(ProbeError::Enumeration("process table unavailable".into()));
        }
        Ok(self.listing.clone())
    }

    fn read(&self, pid: u32) -> Result<ProcessSnapshot, ProbeError> {
        self.reads.borrow_mut().push(pid);
        self.readings
            .get(&pid)
            .copied()
            .ok_or(ProbeError::Vanished(pid))
    }
}

pub fn system_reading(disk_bytes: u64) -> SystemSnapshot {
    SystemSnapshot {
        cpu_usage_percent: 12.5,
        per_cpu_percent: vec![20.0, 5.0],
        memory_total: 16 * 1024 * 1024 * 1024,
        memory_used: 4 * 1024 * 1024 * 1024,
        memory_available: 12 * 1024 * 1024 * 1024,
        memory_free: 10 * 1024 * 1024 * 1024,
        swap_total: 2 * 1024 * 1024 * 1024,
        swap_used: 512 * 1024 * 1024,
        swap_free: 1536 * 1024 * 1024,
        disk: Some(DiskCounters {
            read_ops: disk_bytes / 4096,
            write_ops: disk_bytes / 8192,
            read_bytes: disk_bytes,
            write_bytes: disk_bytes / 2,
            read_ms: disk_bytes / 1024,
            write_ms: disk_bytes / 2048,
        }),
    }
}

/// Each read returns disk totals 8 KiB higher than the last.
#[derive(Default)]
pub struct FakeSystem {
    reads: u64,
    fail_on_read: Option<u64>,
    no_disk_on_read: Option<u64>,
    stall: HashMap<u64, Duration>,
    journal: Option<Journal>,
    read_times: Option<Arc<Mutex<Vec<Instant>>>>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `n` (the construction baseline is read 1) fails.
    pub fn failing_on_read(mut self, n: u64) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    /// Read `n` has no disk totals.
    pub fn without_disk_on_read(mut self, n: u64) -> Self {
        self.no_disk_on_read = Some(n);
        self
    }

    /// Read `n` blocks the thread for `duration`.
    pub fn stalling_on_read(mut self, n: u64, duration: Duration) -> Self {
        self.stall.insert(n, duration);
        self
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(Arc::clone(journal));
        self
    }

    pub fn read_times(mut self, times: &Arc<Mutex<Vec<Instant>>>) -> Self {
        self.read_times = Some(Arc::clone(times));
        self
    }
}

impl SystemProbe for FakeSystem {
    fn read(&mut self) -> Result<SystemSnapshot, ProbeError> {
        self.reads += 1;
        if let Some(times) = &self.read_times {
            times.lock().unwrap().push(Instant::now());
        }
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push("system");
        }
        if let Some(duration) = self.stall.get(&self.reads) {
            std::thread::sleep(*duration);
        }
        if self.fail_on_read == Some(self.reads) {
            return Err(ProbeError::Enumeration("counters unavailable".into()));
        }
        let mut reading = system_reading(self.reads * 8192);
        if self.no_disk_on_read == Some(self.reads) {
            reading.disk = None;
        }
        Ok(reading)
    }
}

/// Replays scripted interface readings; the last one repeats.
pub struct FakeNics {
    interfaces: Vec<String>,
    readings: VecDeque<HashMap<String, NicCounters>>,
    journal: Option<Journal>,
}

impl FakeNics {
    pub fn new(interfaces: &[&str]) -> Self {
        FakeNics {
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            readings: VecDeque::new(),
            journal: None,
        }
    }

    pub fn then(mut self, reading: &[(&str, NicCounters)]) -> Self {
        self.readings.push_back(
            reading
                .iter()
                .map(|(name, counters)| (name.to_string(), *counters))
                .collect(),
        );
        self
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(Arc::clone(journal));
        self
    }
}

impl NicProbe for FakeNics {
    fn interfaces(&self) -> Vec<String> {
        self.interfaces.clone()
    }

    fn read(&mut self) -> Result<HashMap<String, NicCounters>, ProbeError> {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push("nic");
        }
        let reading = if self.readings.len() > 1 {
            self.readings.pop_front()
        } else {
            self.readings.front().cloned()
        };
        Ok(reading.unwrap_or_default())
    }
}

pub fn sent(bytes: u64) -> NicCounters {
    NicCounters {
        bytes_sent: bytes,
        ..Default::default()
    }
}
