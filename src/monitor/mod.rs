//! The closed set of collectors the scheduler drives.

pub mod nic;
pub mod process_set;
pub mod system;

use tracing::warn;

pub use nic::NicMonitor;
pub use process_set::{ProcessSetMonitor, RootSelectors};
pub use system::SystemMonitor;

use crate::emit::SampleEmitter;
use crate::error::MonitorError;
use crate::schedule::Tick;

pub enum Monitor {
    ProcessSet(ProcessSetMonitor),
    Nic(NicMonitor),
    System(SystemMonitor),
}

impl Monitor {
    pub fn name(&self) -> &'static str {
        match self {
            Monitor::ProcessSet(_) => "process-set",
            Monitor::Nic(_) => "nic",
            Monitor::System(_) => "system",
        }
    }

    /// Lower runs earlier within a tick.
    pub fn priority(&self) -> u8 {
        match self {
            Monitor::ProcessSet(_) => 0,
            Monitor::Nic(_) => 1,
            Monitor::System(_) => 2,
        }
    }

    pub fn sample(&mut self, tick: &Tick) -> Result<(), MonitorError> {
        match self {
            Monitor::ProcessSet(m) => m.sample(tick),
            Monitor::Nic(m) => m.sample(tick),
            Monitor::System(m) => m.sample(tick),
        }
    }

    /// Releases every output stream. Safe to call more than once.
    pub fn close(&mut self) {
        match self {
            Monitor::ProcessSet(m) => m.close(),
            Monitor::Nic(m) => m.close(),
            Monitor::System(m) => m.close(),
        }
    }
}

fn close_stream(stream: &str, emitter: &mut dyn SampleEmitter) {
    if let Err(err) = emitter.close() {
        warn!(stream, %err, "failed to close output stream");
    }
}
