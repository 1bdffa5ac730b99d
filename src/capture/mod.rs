//! Capture records: the log format and its validated model.

pub mod log;
pub mod record;

#[cfg(test)]
mod tests;

pub use log::{CaptureLog, HostCall, LogEntry};
pub use record::{
    AccessFlag, AccessFlags, BufferArgument, BufferInit, CaptureRecord, KernelArgument,
    ScalarValue, ScalarWidth,
};
