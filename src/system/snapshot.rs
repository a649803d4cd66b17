use super::delta::DiskCounters;

/// One reading of the system-wide counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemSnapshot {
    /// Global utilisation, 0..=100.
    pub cpu_usage_percent: f64,
    pub per_cpu_percent: Vec<f64>,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_available: u64,
    pub memory_free: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    /// `None` when the disk totals could not be read this time.
    pub disk: Option<DiskCounters>,
}
