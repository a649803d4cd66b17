use tracing::{debug, info, warn};

use super::close_stream;
use crate::emit::{Field, SampleEmitter};
use crate::error::MonitorError;
use crate::format::{delta_to_kib, format_bytes, percent_of, round_to, to_kib};
use crate::schedule::Tick;
use crate::system::delta::{CounterState, DiskCounters, DiskDelta};
use crate::system::probe::SystemProbe;
use crate::system::snapshot::SystemSnapshot;

/// CPU, memory, swap and disk I/O for the whole machine.
pub struct SystemMonitor {
    probe: Box<dyn SystemProbe>,
    emitter: Box<dyn SampleEmitter>,
    /// Unset until the first successful disk reading.
    disk: Option<CounterState<DiskCounters>>,
    ncpu: usize,
    started_at: i64,
    closed: bool,
}

impl SystemMonitor {
    /// Takes the baseline reading and writes the header. The core count is
    /// fixed from here on.
    pub fn new(
        mut probe: Box<dyn SystemProbe>,
        mut emitter: Box<dyn SampleEmitter>,
        started_at: i64,
    ) -> Result<Self, MonitorError> {
        let baseline = probe.read()?;
        let ncpu = baseline.per_cpu_percent.len();
        emitter.write_header(&columns(ncpu))?;
        info!(
            ncpu,
            memory = %format_bytes(baseline.memory_total),
            "system monitor started"
        );

        Ok(SystemMonitor {
            probe,
            emitter,
            disk: baseline.disk.map(CounterState::new),
            ncpu,
            started_at,
            closed: false,
        })
    }

    pub fn sample(&mut self, tick: &Tick) -> Result<(), MonitorError> {
        let reading = self.probe.read()?;
        let disk = self.advance_disk(reading.disk);

        let record = record(
            tick.timestamp,
            tick.timestamp - self.started_at,
            self.ncpu,
            &reading,
            &disk,
        );
        self.emitter.emit(&record)?;
        Ok(())
    }

    /// A missing reading keeps the previous baseline, so the next delta spans
    /// the gap instead of being measured from zero.
    fn advance_disk(&mut self, current: Option<DiskCounters>) -> DiskDelta {
        let Some(current) = current else {
            if self.disk.is_some() {
                warn!("disk counters unavailable this tick");
            }
            return DiskDelta::default();
        };
        let Some(state) = self.disk.take() else {
            debug!("first disk reading taken as baseline");
            self.disk = Some(CounterState::new(current));
            return DiskDelta::default();
        };
        let (delta, next) = state.advance(current);
        self.disk = Some(next);
        if delta.has_reset() {
            debug!(?delta, "disk counters went backwards");
        }
        delta
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        close_stream("system", self.emitter.as_mut());
        info!("system monitor closed");
    }
}

pub fn columns(ncpu: usize) -> Vec<String> {
    let mut columns: Vec<String> = ["Timestamp", "Uptime", "NCPU", "%CPU"]
        .into_iter()
        .map(String::from)
        .collect();
    columns.extend((0..ncpu).map(|i| format!("%CPU{i}")));
    columns.extend(
        [
            "%MEM",
            "mem.total.KB",
            "mem.used.KB",
            "mem.avail.KB",
            "mem.free.KB",
            "%SWAP",
            "swap.total.KB",
            "swap.used.KB",
            "swap.free.KB",
            "io.read",
            "io.write",
            "io.read.KB",
            "io.write.KB",
            "io.read.ms",
            "io.write.ms",
        ]
        .into_iter()
        .map(String::from),
    );
    columns
}

fn record(
    timestamp: i64,
    uptime: i64,
    ncpu: usize,
    reading: &SystemSnapshot,
    disk: &DiskDelta,
) -> Vec<Field> {
    let percent = |v: f64| Field::Float(round_to(v, 3));
    let kib = |v: u64| Field::UInt(to_kib(v));

    let mut fields = vec![
        Field::Int(timestamp),
        Field::Int(uptime),
        Field::UInt(ncpu as u64),
        // Scaled to 0..100*ncpu.
        percent(reading.cpu_usage_percent * ncpu as f64),
    ];
    fields.extend(
        (0..ncpu).map(|i| percent(reading.per_cpu_percent.get(i).copied().unwrap_or(0.0))),
    );
    fields.extend([
        percent(percent_of(
            reading
                .memory_total
                .saturating_sub(reading.memory_available),
            reading.memory_total,
        )),
        kib(reading.memory_total),
        kib(reading.memory_used),
        kib(reading.memory_available),
        kib(reading.memory_free),
        percent(percent_of(reading.swap_used, reading.swap_total)),
        kib(reading.swap_total),
        kib(reading.swap_used),
        kib(reading.swap_free),
        Field::Int(disk.read_ops),
        Field::Int(disk.write_ops),
        Field::Int(delta_to_kib(disk.read_bytes)),
        Field::Int(delta_to_kib(disk.write_bytes)),
        Field::Int(disk.read_ms),
        Field::Int(disk.write_ms),
    ]);
    fields
}
