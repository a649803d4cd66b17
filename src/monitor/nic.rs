use std::io;

use tracing::{debug, error, info, warn};

use super::close_stream;
use crate::emit::{Field, SampleEmitter};
use crate::error::MonitorError;
use crate::schedule::Tick;
use crate::system::delta::{CounterState, NicCounters};
use crate::system::probe::NicProbe;

pub const COLUMNS: [&str; 11] = [
    "Timestamp",
    "Uptime",
    "NIC",
    "sent.B",
    "recv.B",
    "sent.pkts",
    "recv.pkts",
    "err.in",
    "err.out",
    "drop.in",
    "drop.out",
];

struct NicStream {
    name: String,
    emitter: Box<dyn SampleEmitter>,
    counters: CounterState<NicCounters>,
}

/// Traffic deltas for a fixed set of interfaces, one stream each.
pub struct NicMonitor {
    probe: Box<dyn NicProbe>,
    streams: Vec<NicStream>,
    started_at: i64,
    closed: bool,
}

impl NicMonitor {
    /// Opens one stream per requested interface. Names the OS does not know
    /// are reported and skipped; `Ok(None)` means none were left to monitor.
    pub fn new<F>(
        mut probe: Box<dyn NicProbe>,
        requested: &[String],
        mut open: F,
        started_at: i64,
    ) -> Result<Option<Self>, MonitorError>
    where
        F: FnMut(&str) -> io::Result<Box<dyn SampleEmitter>>,
    {
        let known = probe.interfaces();
        let mut selected: Vec<&str> = Vec::new();
        for name in requested.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if !known.iter().any(|k| k == name) {
                error!(nic = name, "NIC does not exist, skipping");
            } else if !selected.contains(&name) {
                selected.push(name);
            }
        }
        if selected.is_empty() {
            return Ok(None);
        }

        let baseline = probe.read()?;
        let mut streams = Vec::with_capacity(selected.len());
        for name in selected {
            let mut emitter = open(name)?;
            emitter.write_header(&COLUMNS.map(String::from))?;
            streams.push(NicStream {
                name: name.to_string(),
                emitter,
                counters: CounterState::new(baseline.get(name).copied().unwrap_or_default()),
            });
        }
        info!(
            nics = ?streams.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "NIC monitor started"
        );

        Ok(Some(NicMonitor {
            probe,
            streams,
            started_at,
            closed: false,
        }))
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.streams.iter().map(|s| s.name.as_str())
    }

    pub fn sample(&mut self, tick: &Tick) -> Result<(), MonitorError> {
        let readings = self.probe.read()?;
        let uptime = tick.timestamp - self.started_at;

        for stream in &mut self.streams {
            let Some(current) = readings.get(&stream.name).copied() else {
                // Keep the previous reading so the next delta spans the gap.
                warn!(nic = %stream.name, "no counters for interface this tick");
                continue;
            };
            let (delta, next) = std::mem::take(&mut stream.counters).advance(current);
            stream.counters = next;
            if delta.has_reset() {
                debug!(nic = %stream.name, ?delta, "interface counters went backwards");
            }

            let mut record = vec![
                Field::Int(tick.timestamp),
                Field::Int(uptime),
                Field::Text(stream.name.clone()),
            ];
            record.extend(delta.as_array().map(Field::Int));
            stream.emitter.emit(&record)?;
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for stream in &mut self.streams {
            close_stream(&stream.name, stream.emitter.as_mut());
        }
        info!("NIC monitor closed");
    }
}
