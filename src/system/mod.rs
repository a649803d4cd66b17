pub mod delta;
pub mod platform;
pub mod probe;
pub mod process;
pub mod snapshot;
