//! C replay program emission.
//!
//! A replay program is assembled by a fixed pipeline of stages, each
//! appending to one [`SourceWriter`]. The order is load-bearing: the
//! capability checks run before any context or buffer exists, argument
//! binding follows program build, and read-back only happens after the
//! dispatch has finished.

mod capability;
mod driver;
mod marshal;
mod prelude;
pub mod render;
pub mod writer;


use crate::capture::CaptureRecord;
use crate::config::ReplayConfig;

pub use render::ElementType;
pub use writer::SourceWriter;

/// Everything a stage may read while emitting.
pub struct EmitContext<'a> {
    pub record: &'a CaptureRecord,
    pub config: &'a ReplayConfig,
}

type StageFn = fn(&EmitContext<'_>, &mut SourceWriter);

/// One named step of the generated program.
pub struct Stage {
    pub name: &'static str,
    run: StageFn,
}

pub const PIPELINE: &[Stage] = &[
    Stage { name: "header", run: prelude::emit_header },
    Stage { name: "includes", run: prelude::emit_includes },
    Stage { name: "helpers", run: prelude::emit_helpers },
    Stage { name: "main", run: driver::emit_main_entry },
    Stage { name: "device", run: driver::emit_device_binding },
    Stage { name: "capability", run: capability::emit_capability_checks },
    Stage { name: "context", run: driver::emit_context_and_queue },
    Stage { name: "program", run: driver::emit_program_and_kernel },
    Stage { name: "arguments", run: marshal::emit_arguments },
    Stage { name: "dispatch", run: driver::emit_dispatch },
    Stage { name: "readback", run: render::emit_readback },
    Stage { name: "render", run: render::emit_render },
    Stage { name: "cleanup", run: driver::emit_cleanup },
];

/// Translate one validated record into a complete C source file.
///
/// Pure: the same record and config always produce the same text.
pub fn translate(record: &CaptureRecord, config: &ReplayConfig) -> String {
    let ctx = EmitContext { record, config };
    let mut out = SourceWriter::new();
    for stage in PIPELINE {
        (stage.run)(&ctx, &mut out);
    }
    out.finish()
}
