//! Differences between successive readings of monotonic OS counters.
//!
//! A counter that went backwards (wraparound, driver reset) is not an error:
//! the delta is the raw signed difference and may be negative.

/// Raw signed difference `current - previous`.
pub fn counter_delta(previous: u64, current: u64) -> i64 {
    current.wrapping_sub(previous) as i64
}

pub trait CounterDelta {
    type Delta;

    fn delta(&self, previous: &Self) -> Self::Delta;
}

/// System-wide disk I/O totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_ops: u64,
    pub write_ops: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ms: u64,
    pub write_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiskDelta {
    pub read_ops: i64,
    pub write_ops: i64,
    pub read_bytes: i64,
    pub write_bytes: i64,
    pub read_ms: i64,
    pub write_ms: i64,
}

impl DiskDelta {
    pub fn has_reset(&self) -> bool {
        [
            self.read_ops,
            self.write_ops,
            self.read_bytes,
            self.write_bytes,
            self.read_ms,
            self.write_ms,
        ]
        .iter()
        .any(|v| *v < 0)
    }
}

impl CounterDelta for DiskCounters {
    type Delta = DiskDelta;

    fn delta(&self, previous: &Self) -> DiskDelta {
        DiskDelta {
            read_ops: counter_delta(previous.read_ops, self.read_ops),
            write_ops: counter_delta(previous.write_ops, self.write_ops),
            read_bytes: counter_delta(previous.read_bytes, self.read_bytes),
            write_bytes: counter_delta(previous.write_bytes, self.write_bytes),
            read_ms: counter_delta(previous.read_ms, self.read_ms),
            write_ms: counter_delta(previous.write_ms, self.write_ms),
        }
    }
}

/// Per-interface traffic totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NicCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
    pub drops_in: u64,
    pub drops_out: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NicDelta {
    pub bytes_sent: i64,
    pub bytes_recv: i64,
    pub packets_sent: i64,
    pub packets_recv: i64,
    pub errors_in: i64,
    pub errors_out: i64,
    pub drops_in: i64,
    pub drops_out: i64,
}

impl NicDelta {
    pub fn has_reset(&self) -> bool {
        self.as_array().iter().any(|v| *v < 0)
    }

    /// Values in record column order.
    pub fn as_array(&self) -> [i64; 8] {
        [
            self.bytes_sent,
            self.bytes_recv,
            self.packets_sent,
            self.packets_recv,
            self.errors_in,
            self.errors_out,
            self.drops_in,
            self.drops_out,
        ]
    }
}

impl CounterDelta for NicCounters {
    type Delta = NicDelta;

    fn delta(&self, previous: &Self) -> NicDelta {
        NicDelta {
            bytes_sent: counter_delta(previous.bytes_sent, self.bytes_sent),
            bytes_recv: counter_delta(previous.bytes_recv, self.bytes_recv),
            packets_sent: counter_delta(previous.packets_sent, self.packets_sent),
            packets_recv: counter_delta(previous.packets_recv, self.packets_recv),
            errors_in: counter_delta(previous.errors_in, self.errors_in),
            errors_out: counter_delta(previous.errors_out, self.errors_out),
            drops_in: counter_delta(previous.drops_in, self.drops_in),
            drops_out: counter_delta(previous.drops_out, self.drops_out),
        }
    }
}

/// The most recent reading of a counter set, owned by a single monitor.
///
/// [`CounterState::advance`] consumes the state and hands back its
/// successor, which always holds the fresh reading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CounterState<C> {
    previous: C,
}

impl<C: CounterDelta> CounterState<C> {
    pub fn new(baseline: C) -> Self {
        CounterState { previous: baseline }
    }

    pub fn previous(&self) -> &C {
        &self.previous
    }

    pub fn advance(self, current: C) -> (C::Delta, Self) {
        let delta = current.delta(&self.previous);
        (delta, CounterState { previous: current })
    }
}
