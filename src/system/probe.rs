//! OS-introspection seam.
//!
//! Monitors read counters only through these traits. The `Sysinfo*` types
//! back them with the `sysinfo` crate plus the readers in
//! [`super::platform`] for counters `sysinfo` does not expose.

use std::collections::HashMap;

use sysinfo::{Networks, Pid, ProcessRefreshKind, ProcessesToUpdate, System, ThreadKind};

use super::delta::NicCounters;
use super::platform;
use super::process::{ProcessEntry, ProcessSnapshot};
use super::snapshot::SystemSnapshot;
use crate::error::ProbeError;
use crate::format::percent_of;

pub trait SystemProbe: Send {
    fn read(&mut self) -> Result<SystemSnapshot, ProbeError>;
}

pub trait NicProbe: Send {
    /// Names of the interfaces currently known to the OS.
    fn interfaces(&self) -> Vec<String>;

    fn read(&mut self) -> Result<HashMap<String, NicCounters>, ProbeError>;
}

pub trait ProcessProbe: Send {
    /// Refreshes the process table and lists every live process. A failure
    /// here is fatal to the caller.
    fn list(&mut self) -> Result<Vec<ProcessEntry>, ProbeError>;

    /// Reads one process from the most recent listing. Fails with
    /// [`ProbeError::Vanished`] if it exited in the meantime.
    fn read(&self, pid: u32) -> Result<ProcessSnapshot, ProbeError>;
}

pub struct SysinfoSystemProbe {
    sys: System,
}

impl Default for SysinfoSystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSystemProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a difference between refreshes; prime it now.
        sys.refresh_memory();
        sys.refresh_cpu_all();
        SysinfoSystemProbe { sys }
    }
}

impl SystemProbe for SysinfoSystemProbe {
    fn read(&mut self) -> Result<SystemSnapshot, ProbeError> {
        self.sys.refresh_memory();
        self.sys.refresh_cpu_all();

        Ok(SystemSnapshot {
            cpu_usage_percent: f64::from(self.sys.global_cpu_usage()),
            per_cpu_percent: self
                .sys
                .cpus()
                .iter()
                .map(|cpu| f64::from(cpu.cpu_usage()))
                .collect(),
            memory_total: self.sys.total_memory(),
            memory_used: self.sys.used_memory(),
            memory_available: self.sys.available_memory(),
            memory_free: self.sys.free_memory(),
            swap_total: self.sys.total_swap(),
            swap_used: self.sys.used_swap(),
            swap_free: self.sys.free_swap(),
            disk: platform::disk_io(),
        })
    }
}

pub struct SysinfoNicProbe {
    networks: Networks,
}

impl Default for SysinfoNicProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoNicProbe {
    pub fn new() -> Self {
        SysinfoNicProbe {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl NicProbe for SysinfoNicProbe {
    fn interfaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.networks.list().keys().cloned().collect();
        names.sort();
        names
    }

    fn read(&mut self) -> Result<HashMap<String, NicCounters>, ProbeError> {
        self.networks.refresh(true);
        let drops = platform::nic_drops().unwrap_or_default();

        Ok(self
            .networks
            .list()
            .iter()
            .map(|(name, data)| {
                let dropped = drops.get(name).copied().unwrap_or_default();
                let counters = NicCounters {
                    bytes_sent: data.total_transmitted(),
                    bytes_recv: data.total_received(),
                    packets_sent: data.total_packets_transmitted(),
                    packets_recv: data.total_packets_received(),
                    errors_in: data.total_errors_on_received(),
                    errors_out: data.total_errors_on_transmitted(),
                    drops_in: dropped.drops_in,
                    drops_out: dropped.drops_out,
                };
                (name.clone(), counters)
            })
            .collect())
    }
}

pub struct SysinfoProcessProbe {
    sys: System,
}

impl Default for SysinfoProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProcessProbe {
    pub fn new() -> Self {
        let mut probe = SysinfoProcessProbe { sys: System::new() };
        // Per-process CPU usage is measured from the previous refresh.
        probe.refresh();
        probe
    }

    fn refresh(&mut self) {
        self.sys.refresh_memory();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
    }
}

impl ProcessProbe for SysinfoProcessProbe {
    fn list(&mut self) -> Result<Vec<ProcessEntry>, ProbeError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProbeError::Enumeration(format!(
                "process listing is not supported on {}",
                std::env::consts::OS
            )));
        }
        self.refresh();

        let mut entries: Vec<ProcessEntry> = self
            .sys
            .processes()
            .iter()
            // Userland threads show up as tasks of their process; skip them so
            // a thread is never walked as a child. Kernel threads are processes.
            .filter(|(_, process)| !matches!(process.thread_kind(), Some(ThreadKind::Userland)))
            .map(|(pid, process)| {
                let ppid = process.parent().map(|p| p.as_u32()).unwrap_or(0);
                ProcessEntry::new(
                    pid.as_u32(),
                    ppid,
                    process.name().to_string_lossy().into_owned(),
                )
            })
            .collect();

        if entries.is_empty() {
            return Err(ProbeError::Enumeration("process table is empty".into()));
        }
        entries.sort_unstable_by_key(|e| e.pid);
        Ok(entries)
    }

    fn read(&self, pid: u32) -> Result<ProcessSnapshot, ProbeError> {
        let Some(process) = self.sys.process(Pid::from_u32(pid)) else {
            return Err(ProbeError::Vanished(pid));
        };

        let io = platform::process_io(pid);
        let sched = platform::process_sched(pid);
        if io.is_none() && sched.is_none() && !platform::process_exists(pid) {
            return Err(ProbeError::Vanished(pid));
        }
        // Counters that are merely unreadable (permissions, platform) add 0.
        let io = io.unwrap_or_default();
        let sched = sched.unwrap_or_default();
        let rss_bytes = process.memory();

        Ok(ProcessSnapshot {
            pid,
            io_read_ops: io.read_ops,
            io_write_ops: io.write_ops,
            io_read_bytes: io.read_bytes,
            io_write_bytes: io.write_bytes,
            rss_bytes,
            mem_percent: percent_of(rss_bytes, self.sys.total_memory()),
            cpu_percent: f64::from(process.cpu_usage()),
            ctx_switches: sched.ctx_switches,
            num_threads: sched.threads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_listing_contains_current_process() {
        let mut probe = SysinfoProcessProbe::new();
        let entries = probe.list().unwrap();
        let me = std::process::id();
        assert!(entries.iter().any(|e| e.pid == me));
        assert!(entries.windows(2).all(|w| w[0].pid < w[1].pid));
    }

    #[test]
    fn reading_current_process_succeeds() {
        let mut probe = SysinfoProcessProbe::new();
        probe.list().unwrap();
        let snapshot = probe.read(std::process::id()).unwrap();
        assert!(snapshot.rss_bytes > 0);
        assert!(snapshot.mem_percent >= 0.0 && snapshot.mem_percent <= 100.0);
    }

    #[test]
    fn unknown_pid_is_vanished() {
        let mut probe = SysinfoProcessProbe::new();
        probe.list().unwrap();
        assert!(matches!(
            probe.read(u32::MAX),
            Err(ProbeError::Vanished(pid)) if pid == u32::MAX
        ));
    }

    #[test]
    fn system_reading_is_consistent() {
        let mut probe = SysinfoSystemProbe::new();
        let reading = probe.read().unwrap();
        assert!(!reading.per_cpu_percent.is_empty());
        assert!(reading.memory_total >= reading.memory_free);
    }
}
