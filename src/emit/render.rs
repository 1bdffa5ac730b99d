//! Result read-back and type-directed rendering.
//!
//! After the dispatch completes, every buffer that is not a pure input is
//! copied back into its shadow buffer and printed as `[v0,v1,...]`. The
//! element type comes from kernel argument reflection at runtime and is
//! classified once into a closed set; anything else prints a single
//! "unsupported type" line and the program carries on.

use super::writer::SourceWriter;
use super::EmitContext;

/// Element types the generated program can print.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
}

impl ElementType {
    pub const ALL: [ElementType; 7] = [
        ElementType::Char,
        ElementType::UChar,
        ElementType::Short,
        ElementType::UShort,
        ElementType::Int,
        ElementType::UInt,
        ElementType::Float,
    ];

    /// Pointer type names reported by `CL_KERNEL_ARG_TYPE_NAME`, with
    /// whitespace removed.
    pub fn type_names(self) -> &'static [&'static str] {
        match self {
            ElementType::Char => &["char*"],
            ElementType::UChar => &["uchar*", "unsignedchar*"],
            ElementType::Short => &["short*"],
            ElementType::UShort => &["ushort*", "unsignedshort*"],
            ElementType::Int => &["int*"],
            ElementType::UInt => &["uint*", "unsignedint*"],
            ElementType::Float => &["float*"],
        }
    }

    pub fn cl_type(self) -> &'static str {
        match self {
            ElementType::Char => "cl_char",
            ElementType::UChar => "cl_uchar",
            ElementType::Short => "cl_short",
            ElementType::UShort => "cl_ushort",
            ElementType::Int => "cl_int",
            ElementType::UInt => "cl_uint",
            ElementType::Float => "cl_float",
        }
    }

    /// Enumerator name in the generated `enum element_type`.
    pub fn c_enumerator(self) -> &'static str {
        match self {
            ElementType::Char => "ELEMENT_CHAR",
            ElementType::UChar => "ELEMENT_UCHAR",
            ElementType::Short => "ELEMENT_SHORT",
            ElementType::UShort => "ELEMENT_USHORT",
            ElementType::Int => "ELEMENT_INT",
            ElementType::UInt => "ELEMENT_UINT",
            ElementType::Float => "ELEMENT_FLOAT",
        }
    }

    /// printf conversion and the promotion applied to each value.
    fn printf(self) -> (&'static str, &'static str) {
        match self {
            ElementType::Char | ElementType::Short | ElementType::Int => ("%d", "(int)"),
            ElementType::UChar | ElementType::UShort | ElementType::UInt => ("%u", "(unsigned)"),
            ElementType::Float => ("%f", "(double)"),
        }
    }
}

pub(crate) const UNSUPPORTED_ENUMERATOR: &str = "ELEMENT_UNSUPPORTED";

/// Helper functions: the element type enum, its classifier and
/// `show_array`. Emitted once at file scope.
pub(crate) fn emit_render_helpers(out: &mut SourceWriter) {
    out.line("enum element_type {");
    out.indent();
    for ty in ElementType::ALL {
        out.line(format!("{},", ty.c_enumerator()));
    }
    out.line(UNSUPPORTED_ENUMERATOR);
    out.dedent();
    out.line("};");
    out.blank();

    out.line("static enum element_type classify_element_type(const char *type_name) {");
    out.indent();
    out.line("char compact[256];");
    out.line("size_t n = 0;");
    out.line("for (const char *p = type_name; *p != '\\0' && n + 1 < sizeof(compact); ++p) {");
    out.indent();
    out.line("if (*p != ' ' && *p != '\\t')");
    out.indent();
    out.line("compact[n++] = *p;");
    out.dedent();
    out.dedent();
    out.line("}");
    out.line("compact[n] = '\\0';");
    for ty in ElementType::ALL {
        for name in ty.type_names() {
            out.line(format!("if (strcmp(compact, \"{}\") == 0)", name));
            out.indent();
            out.line(format!("return {};", ty.c_enumerator()));
            out.dedent();
        }
    }
    out.line(format!("return {};", UNSUPPORTED_ENUMERATOR));
    out.dedent();
    out.line("}");
    out.blank();

    out.line("static void show_array(const char *data, size_t size, const char *type_name) {");
    out.indent();
    out.line("switch (classify_element_type(type_name)) {");
    for ty in ElementType::ALL {
        let (conversion, promote) = ty.printf();
        out.line(format!("case {}: {{", ty.c_enumerator()));
        out.indent();
        out.line(format!(
            "const {t} *values = (const {t} *)data;",
            t = ty.cl_type()
        ));
        out.line(format!("size_t count = size / sizeof({});", ty.cl_type()));
        out.line("printf(\"[\");");
        out.line("for (size_t i = 0; i < count; ++i) {");
        out.indent();
        out.line("if (i > 0)");
        out.indent();
        out.line("printf(\",\");");
        out.dedent();
        out.line(format!("printf(\"{}\", {}values[i]);", conversion, promote));
        out.dedent();
        out.line("}");
        out.line("printf(\"]\\n\");");
        out.line("break;");
        out.dedent();
        out.line("}");
    }
    out.line(format!("case {}:", UNSUPPORTED_ENUMERATOR));
    out.line("default:");
    out.indent();
    out.line("printf(\"Array of unsupported type %s\\n\", type_name);");
    out.line("break;");
    out.dedent();
    out.line("}");
    out.dedent();
    out.line("}");
}

/// Blocking device-to-host copies for every output buffer.
pub(crate) fn emit_readback(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    let mut outputs = ctx.record.buffers().filter(|(_, b)| b.is_output()).peekable();
    if outputs.peek().is_none() {
        return;
    }
    out.section("Copying back results");
    for (i, buffer) in outputs {
        out.line(format!(
            "err = clEnqueueReadBuffer(command_queue, array_arg_{i}, CL_TRUE, 0, {size}, array_data_{i}, 0, NULL, NULL);",
            i = i,
            size = buffer.size
        ));
        out.check_err(&format!(
            "Error copying results from device for kernel argument {}",
            i
        ));
    }
}

/// Query each output buffer's element type and print it.
pub(crate) fn emit_render(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    let mut outputs = ctx.record.buffers().filter(|(_, b)| b.is_output()).peekable();
    if outputs.peek().is_none() {
        return;
    }
    out.section("Writing out results");
    for (i, buffer) in outputs {
        out.line("{");
        out.indent();
        out.line("size_t type_name_size = 0;");
        out.line(format!(
            "err = clGetKernelArgInfo(kernel, {}, CL_KERNEL_ARG_TYPE_NAME, 0, NULL, &type_name_size);",
            i
        ));
        out.check_err(&format!("Error querying type of kernel argument {}", i));
        out.line("char *type_name = (char *)malloc(type_name_size + 1);");
        out.fail_if(
            "type_name == NULL",
            &format!(
                "\"Error allocating the type name of kernel argument {}\\n\"",
                i
            ),
        );
        out.line(format!(
            "err = clGetKernelArgInfo(kernel, {}, CL_KERNEL_ARG_TYPE_NAME, type_name_size, type_name, NULL);",
            i
        ));
        out.check_err(&format!("Error querying type of kernel argument {}", i));
        out.line("type_name[type_name_size] = '\\0';");
        out.line(format!(
            "show_array(array_data_{}, {}, type_name);",
            i, buffer.size
        ));
        out.line("free(type_name);");
        out.dedent();
        out.line("}");
    }
}
