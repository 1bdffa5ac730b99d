//! Execution driver: `main`, device binding, context, queue, program,
//! kernel, the dispatch itself and final cleanup.

use super::writer::{c_format_string, c_string, SourceWriter};
use super::EmitContext;
use crate::capture::KernelArgument;
use crate::config::DeviceSelection;

pub(crate) fn emit_main_entry(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.blank();
    out.line("int main(int argc, char **argv) {");
    out.indent();
    if ctx.config.device.kernel_path_from_argv() {
        out.fail_if(
            "argc != 2",
            "\"usage: %s <kernel-source>\\n\", argv[0]",
        );
        out.line("const char *kernel_filename = argv[1];");
    } else {
        out.line("(void)argc;");
        out.line("(void)argv;");
        out.line(format!(
            "const char *kernel_filename = {};",
            c_string(&ctx.record.kernel_file.to_string_lossy())
        ));
    }
    out.line("cl_int err;");
    out.line("cl_platform_id platform_id = NULL;");
    out.line("cl_device_id device_id = NULL;");
}

pub(crate) fn emit_device_binding(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.section("Selecting a device");
    match &ctx.config.device {
        DeviceSelection::VersionMatch(pattern) => {
            let shown = c_format_string(pattern);
            out.fail_if(
                &format!(
                    "!select_device({}, &platform_id, &device_id)",
                    c_string(pattern)
                ),
                &format!(
                    "\"No OpenCL device found whose version contains \\\"{}\\\"\\n\"",
                    &shown[1..shown.len() - 1]
                ),
            );
        }
        DeviceSelection::Ordinal { platform, device } => {
            out.fail_if(
                &format!(
                    "!select_device({}, {}, &platform_id, &device_id)",
                    platform, device
                ),
                &format!(
                    "\"No OpenCL device {} on platform {}\\n\"",
                    device, platform
                ),
            );
        }
    }
}

pub(crate) fn emit_context_and_queue(_ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.section("Creating a context");
    out.line("cl_context_properties properties[3] = { CL_CONTEXT_PLATFORM, (cl_context_properties)platform_id, 0 };");
    out.line("cl_context context = clCreateContext(properties, 1, &device_id, error_callback, NULL, &err);");
    out.check_err("Error creating context");

    out.section("Creating a command queue");
    out.line("cl_command_queue command_queue = clCreateCommandQueue(context, device_id, 0, &err);");
    out.check_err("Error creating command queue");
}

pub(crate) fn emit_program_and_kernel(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.section("Reading the kernel source");
    out.line("char *source_text = NULL;");
    out.line("size_t source_size = 0;");
    out.line("{");
    out.indent();
    out.line("struct stat source_stat;");
    out.fail_if(
        "stat(kernel_filename, &source_stat) != 0",
        "\"Could not stat kernel source %s\\n\", kernel_filename",
    );
    out.line("source_size = (size_t)source_stat.st_size;");
    out.line("FILE *source = fopen(kernel_filename, \"rb\");");
    out.fail_if(
        "source == NULL",
        "\"Could not open kernel source %s\\n\", kernel_filename",
    );
    out.line("source_text = (char *)calloc(1, source_size + 1);");
    out.fail_if(
        "source_text == NULL",
        "\"Failed to allocate %lu bytes for kernel source\\n\", (unsigned long)source_size",
    );
    out.fail_if(
        "fread(source_text, 1, source_size, source) != source_size",
        "\"Short read from kernel source %s\\n\", kernel_filename",
    );
    out.line("fclose(source);");
    out.dedent();
    out.line("}");

    out.section("Creating a program");
    out.line("const char *const_source = source_text;");
    out.line("cl_program program = clCreateProgramWithSource(context, 1, &const_source, &source_size, &err);");
    out.check_err("Error creating program");

    let options = ctx
        .config
        .effective_build_options(ctx.record.compiler_flags.as_deref());
    out.section("Building the program");
    out.line(format!(
        "err = clBuildProgram(program, 1, &device_id, {}, NULL, NULL);",
        c_string(&options)
    ));
    out.line("if (cl_error_check(err, \"Error building program\")) {");
    out.indent();
    out.line("size_t log_size = 0;");
    out.line("err = clGetProgramBuildInfo(program, device_id, CL_PROGRAM_BUILD_LOG, 0, NULL, &log_size);");
    out.check_err("Error getting build log size");
    out.line("char *build_log = (char *)malloc(log_size + 1);");
    out.fail_if(
        "build_log == NULL",
        "\"Failed to allocate %lu bytes for the build log\\n\", (unsigned long)log_size",
    );
    out.line("err = clGetProgramBuildInfo(program, device_id, CL_PROGRAM_BUILD_LOG, log_size, build_log, NULL);");
    out.line("if (!cl_error_check(err, \"Error getting build log\")) {");
    out.indent();
    out.line("build_log[log_size] = '\\0';");
    out.line("fprintf(stderr, \"%s\\n\", build_log);");
    out.dedent();
    out.line("}");
    out.line("free(build_log);");
    out.line("exit(1);");
    out.dedent();
    out.line("}");

    out.section("Creating the kernel");
    out.line(format!(
        "cl_kernel kernel = clCreateKernel(program, {}, &err);",
        c_string(&ctx.record.entry_point)
    ));
    out.check_err("Error creating kernel");
}

pub(crate) fn emit_dispatch(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    let record = ctx.record;
    let dims = record.dimensions();

    out.section("Launching the kernel");
    out.line(format!(
        "size_t global_size[{}] = {{ {} }};",
        dims,
        list(&record.global_size)
    ));
    let offset_arg = match &record.global_offset {
        Some(offset) => {
            out.line(format!("size_t global_offset[{}] = {{ {} }};", dims, list(offset)));
            "global_offset"
        }
        None => "NULL",
    };
    let local_arg = match &record.local_size {
        Some(local) => {
            out.line(format!("size_t local_size[{}] = {{ {} }};", dims, list(local)));
            "local_size"
        }
        None => "NULL",
    };
    out.line(format!(
        "err = clEnqueueNDRangeKernel(command_queue, kernel, {}, {}, global_size, {}, 0, NULL, NULL);",
        dims, offset_arg, local_arg
    ));
    out.check_err("Error enqueueing kernel");
    out.line("err = clFinish(command_queue);");
    out.check_err("Error waiting for the kernel to finish");
}

pub(crate) fn emit_cleanup(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.section("Releasing resources");
    for (i, _) in ctx.record.buffers() {
        out.line(format!("clReleaseMemObject(array_arg_{});", i));
    }
    out.line("clReleaseKernel(kernel);");
    out.line("clReleaseProgram(program);");
    out.line("clReleaseCommandQueue(command_queue);");
    out.line("clReleaseContext(context);");
    for (i, arg) in ctx.record.arguments.iter().enumerate() {
        if let KernelArgument::Buffer(_) = arg {
            out.line(format!("free(array_data_{});", i));
        }
    }
    out.line("free(source_text);");
    out.line("return 0;");
    out.dedent();
    out.line("}");
}

fn list(values: &[u64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
