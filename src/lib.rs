//! Capture-to-replay translator for OpenCL kernel dispatches.
//!
//! A capture log records kernel launches observed in a running program.
//! For each record this crate emits one self-contained C program that
//! re-creates the dispatch on a real device: it checks the device can
//! take the recorded shape, binds the captured arguments positionally,
//! launches once and prints every output buffer.

pub mod api;
pub mod capture;
pub mod config;
pub mod diagnostic;
pub mod emit;
pub mod span;

pub use api::*;
pub use capture::{CaptureLog, CaptureRecord, KernelArgument};
pub use config::{DeviceSelection, ReplayConfig};
pub use diagnostic::{render_diagnostics, Diagnostic, ErrorKind, Severity};
