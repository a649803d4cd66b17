//! Periodic resource sampler.
//!
//! A [`schedule::Scheduler`] fires the registered monitors on a drift-free
//! cadence; each monitor reads OS counters through a probe from
//! [`system::probe`] and writes one record per tick through an
//! [`emit::SampleEmitter`].

pub mod config;
pub mod emit;
pub mod error;
pub mod format;
pub mod monitor;
pub mod schedule;
pub mod shutdown;
pub mod system;
