//! Positional argument binding.
//!
//! Arguments are bound strictly in capture order through one running
//! `kernel_arg` counter shared by every kind, so position `i` in the
//! record is always kernel parameter `i`.

use super::writer::{c_format_string, c_string, SourceWriter};
use super::EmitContext;
use crate::capture::{BufferArgument, BufferInit, KernelArgument, ScalarValue};

/// Inline byte tables are wrapped at this many values per line.
const BYTES_PER_LINE: usize = 16;

pub(crate) fn emit_arguments(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.section("Setting up the arguments");
    out.line("cl_uint kernel_arg = 0;");
    for (i, arg) in ctx.record.arguments.iter().enumerate() {
        match arg {
            KernelArgument::Scalar(value) => emit_scalar(i, value, out),
            KernelArgument::Buffer(buffer) => emit_buffer(i, buffer, out),
            KernelArgument::Local { size } => emit_local(i, *size, out),
        }
    }
}

fn emit_scalar(i: usize, value: &ScalarValue, out: &mut SourceWriter) {
    let ty = value.width.cl_type();
    out.section(format!(
        "Argument {}: scalar, {} byte{}",
        i,
        value.width.bytes(),
        if value.width.bytes() == 1 { "" } else { "s" }
    ));
    out.line(format!("{} scalar_arg_{} = {};", ty, i, value.c_literal()));
    emit_set_arg(i, &format!("sizeof({})", ty), &format!("&scalar_arg_{}", i), out);
}

fn emit_buffer(i: usize, buffer: &BufferArgument, out: &mut SourceWriter) {
    let size = buffer.size;
    out.section(format!("Argument {}: buffer, {} bytes, {}", i, size, buffer.flags));
    out.line(format!(
        "cl_mem array_arg_{} = clCreateBuffer(context, {}, {}, NULL, &err);",
        i,
        buffer.flags.c_expr(),
        size
    ));
    out.check_err(&format!("Error creating buffer for kernel argument {}", i));
    out.line(format!("char *array_data_{} = (char *)malloc({});", i, size));
    out.fail_if(
        &format!("array_data_{} == NULL", i),
        &format!(
            "\"Error allocating host memory for kernel argument {}\\n\"",
            i
        ),
    );

    match &buffer.init {
        BufferInit::File(path) => {
            let path = path.to_string_lossy();
            let shown = c_format_string(&path);
            let shown = &shown[1..shown.len() - 1];
            out.line("{");
            out.indent();
            out.line(format!("FILE *data_file = fopen({}, \"rb\");", c_string(&path)));
            out.fail_if(
                "data_file == NULL",
                &format!(
                    "\"Error opening data file {} for kernel argument {}\\n\"",
                    shown, i
                ),
            );
            out.fail_if(
                &format!("fread(array_data_{}, 1, {}, data_file) != {}", i, size, size),
                &format!(
                    "\"Short read from data file {} for kernel argument {} (expected {} bytes)\\n\"",
                    shown, i, size
                ),
            );
            out.line("fclose(data_file);");
            out.dedent();
            out.line("}");
        }
        BufferInit::Inline(bytes) => {
            out.line("{");
            out.indent();
            out.line(format!("static const unsigned char initial_data[{}] = {{", size));
            out.indent();
            for chunk in bytes.chunks(BYTES_PER_LINE) {
                let values: Vec<String> = chunk.iter().map(|b| b.to_string()).collect();
                out.line(format!("{},", values.join(", ")));
            }
            out.dedent();
            out.line("};");
            out.line(format!("memcpy(array_data_{}, initial_data, {});", i, size));
            out.dedent();
            out.line("}");
        }
        BufferInit::Zeroed => {
            out.line(format!("memset(array_data_{}, 0, {});", i, size));
        }
    }

    out.line(format!(
        "err = clEnqueueWriteBuffer(command_queue, array_arg_{i}, CL_TRUE, 0, {size}, array_data_{i}, 0, NULL, NULL);",
        i = i,
        size = size
    ));
    out.check_err(&format!("Error copying to device for kernel argument {}", i));
    emit_set_arg(i, "sizeof(cl_mem)", &format!("&array_arg_{}", i), out);
}

fn emit_local(i: usize, size: u64, out: &mut SourceWriter) {
    out.section(format!("Argument {}: local memory, {} bytes", i, size));
    emit_set_arg(i, &size.to_string(), "NULL", out);
}

fn emit_set_arg(i: usize, size_expr: &str, value_expr: &str, out: &mut SourceWriter) {
    out.line(format!(
        "err = clSetKernelArg(kernel, kernel_arg++, {}, {});",
        size_expr, value_expr
    ));
    out.check_err(&format!("Error setting kernel argument {}", i));
}
