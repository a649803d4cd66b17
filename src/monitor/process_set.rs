//! Aggregated usage of a dynamically matched set of processes.
//!
//! Roots are picked by pid or by a case-insensitive substring of the process
//! name. Every root is folded together with all of its descendants, and a
//! process reachable from several roots is counted once.

use std::collections::HashSet;

use tracing::{info, trace};

use super::close_stream;
use crate::emit::{Field, SampleEmitter};
use crate::error::{ConfigError, MonitorError, ProbeError};
use crate::schedule::Tick;
use crate::system::probe::ProcessProbe;
use crate::system::process::{
    AggregateSnapshot, ProcessEntry, ProcessTree, build_process_tree_from_flat,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootSelectors {
    pids: HashSet<u32>,
    keywords: Vec<String>,
}

impl RootSelectors {
    /// Keywords are trimmed and lowercased; blank ones are dropped.
    pub fn new<I, S>(pids: impl IntoIterator<Item = u32>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        RootSelectors {
            pids: pids.into_iter().collect(),
            keywords: normalized,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty() && self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches(&self, entry: &ProcessEntry) -> bool {
        if self.pids.contains(&entry.pid) {
            return true;
        }
        if self.keywords.is_empty() {
            return false;
        }
        let name = entry.name.to_lowercase();
        self.keywords.iter().any(|k| name.contains(k.as_str()))
    }
}

/// Sums every matched root and its descendants into one snapshot.
///
/// Only a failed enumeration is an error; processes that vanish before they
/// are read are left out of the sum.
pub fn aggregate_process_set(
    probe: &mut dyn ProcessProbe,
    selectors: &RootSelectors,
) -> Result<AggregateSnapshot, ProbeError> {
    let tree = build_process_tree_from_flat(probe.list()?);
    let mut visited = HashSet::with_capacity(tree.processes.len());
    let mut total = AggregateSnapshot::default();

    for pid in tree.pids() {
        if visited.contains(&pid) {
            continue;
        }
        let Some(entry) = tree.processes.get(&pid) else {
            continue;
        };
        if selectors.matches(entry) {
            fold_subtree(&*probe, &tree, pid, &mut visited, &mut total)?;
        }
    }
    Ok(total)
}

fn fold_subtree(
    probe: &dyn ProcessProbe,
    tree: &ProcessTree,
    root: u32,
    visited: &mut HashSet<u32>,
    total: &mut AggregateSnapshot,
) -> Result<(), ProbeError> {
    let mut stack = vec![root];
    while let Some(pid) = stack.pop() {
        if !visited.insert(pid) {
            continue;
        }
        match probe.read(pid) {
            Ok(snapshot) => *total += &snapshot,
            Err(ProbeError::Vanished(_)) => {
                trace!(pid, "process vanished before it could be read");
            }
            Err(err) => return Err(err),
        }
        // Children from the same listing; some may have been re-parented.
        stack.extend(tree.children(pid).iter().rev());
    }
    Ok(())
}

pub struct ProcessSetMonitor {
    probe: Box<dyn ProcessProbe>,
    emitter: Box<dyn SampleEmitter>,
    selectors: RootSelectors,
    started_at: i64,
    closed: bool,
}

impl ProcessSetMonitor {
    pub fn new(
        probe: Box<dyn ProcessProbe>,
        mut emitter: Box<dyn SampleEmitter>,
        selectors: RootSelectors,
        started_at: i64,
    ) -> Result<Self, MonitorError> {
        if selectors.is_empty() {
            return Err(ConfigError::MissingSelectors.into());
        }
        let mut columns = vec!["Timestamp".to_string(), "Uptime".to_string()];
        columns.extend(AggregateSnapshot::COLUMNS.map(String::from));
        emitter.write_header(&columns)?;
        info!(
            pids = ?selectors.pids,
            keywords = ?selectors.keywords,
            "process-set monitor started"
        );

        Ok(ProcessSetMonitor {
            probe,
            emitter,
            selectors,
            started_at,
            closed: false,
        })
    }

    pub fn sample(&mut self, tick: &Tick) -> Result<(), MonitorError> {
        let aggregate = aggregate_process_set(self.probe.as_mut(), &self.selectors)?;
        trace!(processes = aggregate.processes, "process set sampled");

        let mut record = vec![
            Field::Int(tick.timestamp),
            Field::Int(tick.timestamp - self.started_at),
        ];
        record.extend(aggregate.fields());
        self.emitter.emit(&record)?;
        Ok(())
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        close_stream("process-set", self.emitter.as_mut());
        info!("process-set monitor closed");
    }
}
