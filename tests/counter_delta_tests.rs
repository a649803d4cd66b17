mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use common::{FakeNics, FakeSystem, memory_emitter, sent};
use resmon::emit::{Field, Recorded, SampleEmitter};
use resmon::monitor::{NicMonitor, SystemMonitor};
use resmon::schedule::Tick;
use resmon::system::delta::{CounterDelta, CounterState, DiskCounters, NicCounters};

fn tick(seq: u64, timestamp: i64) -> Tick {
    Tick {
        seq,
        target: tokio::time::Instant::now(),
        timestamp,
    }
}

fn nic_monitor(
    probe: FakeNics,
    requested: &[&str],
) -> (Option<NicMonitor>, HashMap<String, Arc<Mutex<Recorded>>>) {
    let mut outputs = HashMap::new();
    let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
    let monitor = NicMonitor::new(
        Box::new(probe),
        &requested,
        |name| {
            let (emitter, recorded) = memory_emitter();
            outputs.insert(name.to_string(), recorded);
            Ok::<Box<dyn SampleEmitter>, std::io::Error>(emitter)
        },
        1_700_000_000,
    )
    .unwrap();
    (monitor, outputs)
}

#[test]
fn second_tick_reports_the_difference() {
    let probe = FakeNics::new(&["eth0"])
        .then(&[("eth0", sent(1000))])
        .then(&[("eth0", sent(1500))]);
    let (monitor, outputs) = nic_monitor(probe, &["eth0"]);
    let mut monitor = monitor.unwrap();

    monitor.sample(&tick(1, 1_700_000_001)).unwrap();
    monitor.close();

    let out = outputs["eth0"].lock().unwrap();
    assert_eq!(out.header.as_ref().unwrap().len(), 11);
    assert_eq!(
        out.records,
        vec![vec![
            Field::Int(1_700_000_001),
            Field::Int(1),
            Field::Text("eth0".into()),
            Field::Int(500),
            Field::Int(0),
            Field::Int(0),
            Field::Int(0),
            Field::Int(0),
            Field::Int(0),
            Field::Int(0),
            Field::Int(0),
        ]]
    );
    assert_eq!(out.close_calls, 1);
}

#[test]
fn unknown_interfaces_are_skipped() {
    let probe = FakeNics::new(&["eth0", "lo"]).then(&[("eth0", sent(0)), ("lo", sent(0))]);
    let (monitor, outputs) = nic_monitor(probe, &["wlan9", "lo", " lo "]);
    let monitor = monitor.unwrap();

    assert_eq!(monitor.interfaces().collect::<Vec<_>>(), vec!["lo"]);
    assert_eq!(outputs.len(), 1);
}

#[test]
fn no_known_interface_disables_the_monitor() {
    let probe = FakeNics::new(&["eth0"]).then(&[("eth0", sent(0))]);
    let (monitor, outputs) = nic_monitor(probe, &["wlan9"]);
    assert!(monitor.is_none());
    assert!(outputs.is_empty());
}

#[test]
fn interface_missing_for_one_tick_resumes_from_its_last_reading() {
    let probe = FakeNics::new(&["eth0"])
        .then(&[("eth0", sent(100))])
        .then(&[])
        .then(&[("eth0", sent(700))]);
    let (monitor, outputs) = nic_monitor(probe, &["eth0"]);
    let mut monitor = monitor.unwrap();

    monitor.sample(&tick(1, 1_700_000_001)).unwrap();
    monitor.sample(&tick(2, 1_700_000_002)).unwrap();

    let out = outputs["eth0"].lock().unwrap();
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0][3], Field::Int(600));
}

// io.read, io.write, io.read.KB, io.write.KB, io.read.ms, io.write.ms
fn disk_columns(record: &[Field]) -> Vec<Field> {
    record[record.len() - 6..].to_vec()
}

fn system_records(probe: FakeSystem, ticks: u64) -> Vec<Vec<Field>> {
    let (emitter, recorded) = memory_emitter();
    let mut monitor = SystemMonitor::new(Box::new(probe), emitter, 1_700_000_000).unwrap();
    for seq in 1..=ticks {
        monitor.sample(&tick(seq, 1_700_000_000 + seq as i64)).unwrap();
    }
    monitor.close();
    let records = recorded.lock().unwrap().records.clone();
    records
}

#[test]
fn missing_disk_reading_keeps_the_previous_baseline() {
    // Read 1 is the baseline; read 3 (tick 2) has no disk totals.
    let records = system_records(FakeSystem::new().without_disk_on_read(3), 3);

    assert_eq!(records.len(), 3);
    let one_interval = [2, 1, 8, 4, 8, 4].map(Field::Int).to_vec();
    assert_eq!(disk_columns(&records[0]), one_interval);
    assert_eq!(disk_columns(&records[1]), vec![Field::Int(0); 6]);
    // Tick 3 spans both intervals since the last good reading.
    assert_eq!(
        disk_columns(&records[2]),
        [4, 2, 16, 8, 16, 8].map(Field::Int).to_vec()
    );
}

#[test]
fn first_disk_reading_after_startup_becomes_the_baseline() {
    let records = system_records(FakeSystem::new().without_disk_on_read(1), 2);

    assert_eq!(disk_columns(&records[0]), vec![Field::Int(0); 6]);
    assert_eq!(
        disk_columns(&records[1]),
        [2, 1, 8, 4, 8, 4].map(Field::Int).to_vec()
    );
}

#[test]
fn counter_reset_is_reported_as_a_negative_delta() {
    let probe = FakeNics::new(&["eth0"])
        .then(&[("eth0", sent(5000))])
        .then(&[("eth0", sent(200))]);
    let (monitor, outputs) = nic_monitor(probe, &["eth0"]);
    let mut monitor = monitor.unwrap();

    monitor.sample(&tick(1, 1_700_000_001)).unwrap();

    let out = outputs["eth0"].lock().unwrap();
    assert_eq!(out.records[0][3], Field::Int(-4800));
}

fn nic_counters() -> impl Strategy<Value = NicCounters> {
    prop::array::uniform8(0u64..(1 << 62)).prop_map(|v| NicCounters {
        bytes_sent: v[0],
        bytes_recv: v[1],
        packets_sent: v[2],
        packets_recv: v[3],
        errors_in: v[4],
        errors_out: v[5],
        drops_in: v[6],
        drops_out: v[7],
    })
}

fn growth() -> impl Strategy<Value = [u64; 8]> {
    prop::array::uniform8(0u64..(1 << 40))
}

proptest! {
    #[test]
    fn nic_delta_is_exact_per_field(base in nic_counters(), step in growth()) {
        let next = NicCounters {
            bytes_sent: base.bytes_sent + step[0],
            bytes_recv: base.bytes_recv + step[1],
            packets_sent: base.packets_sent + step[2],
            packets_recv: base.packets_recv + step[3],
            errors_in: base.errors_in + step[4],
            errors_out: base.errors_out + step[5],
            drops_in: base.drops_in + step[6],
            drops_out: base.drops_out + step[7],
        };
        let delta = next.delta(&base);
        prop_assert_eq!(delta.as_array(), step.map(|s| s as i64));
        prop_assert!(!delta.has_reset());
    }

    #[test]
    fn disk_delta_is_exact_per_field(
        base in prop::array::uniform6(0u64..(1 << 62)),
        step in prop::array::uniform6(0u64..(1 << 40)),
    ) {
        let counters = |v: [u64; 6]| DiskCounters {
            read_ops: v[0],
            write_ops: v[1],
            read_bytes: v[2],
            write_bytes: v[3],
            read_ms: v[4],
            write_ms: v[5],
        };
        let previous = counters(base);
        let current = counters(std::array::from_fn(|i| base[i] + step[i]));

        let (delta, state) = CounterState::new(previous).advance(current);

        prop_assert_eq!(
            [delta.read_ops, delta.write_ops, delta.read_bytes, delta.write_bytes, delta.read_ms, delta.write_ms],
            step.map(|s| s as i64)
        );
        prop_assert_eq!(*state.previous(), current);
    }

    #[test]
    fn consecutive_deltas_sum_to_the_overall_growth(
        steps in prop::collection::vec(0u64..(1 << 32), 1..20),
    ) {
        let mut state = CounterState::new(sent(0));
        let mut total = 0i64;
        let mut reading = 0u64;
        for step in &steps {
            reading += step;
            let (delta, next) = state.advance(sent(reading));
            state = next;
            total += delta.bytes_sent;
        }
        prop_assert_eq!(total, reading as i64);
    }
}
