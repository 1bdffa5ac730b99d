//! Device capability checks.
//!
//! Emitted straight after device binding, before any context, queue or
//! buffer exists. A device weaker than the one the dispatch was captured
//! on must fail here with the limit and the recorded value, not later in
//! the driver.

use super::writer::SourceWriter;
use super::EmitContext;

pub(crate) fn emit_capability_checks(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    let record = ctx.record;
    let dims = record.dimensions();

    out.section(format!(
        "Checking the device supports {} work-item dimension{}",
        dims,
        if dims == 1 { "" } else { "s" }
    ));
    out.line("cl_uint max_dimensions = 0;");
    out.line("err = clGetDeviceInfo(device_id, CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS, sizeof(cl_uint), &max_dimensions, NULL);");
    out.check_err("Error querying CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS");
    out.fail_if(
        &format!("max_dimensions < {}", dims),
        &format!(
            "\"Kernel uses {} dimensions, which exceeds the maximum of %u dimensions for this device\\n\", (unsigned)max_dimensions",
            dims
        ),
    );

    let local = match &record.local_size {
        Some(local) => local,
        None => return,
    };

    out.section("Checking the work-item count in each dimension");
    out.line("size_t *max_work_items = (size_t *)malloc(sizeof(size_t) * max_dimensions);");
    out.fail_if(
        "max_work_items == NULL",
        "\"Failed to allocate work-item limits\\n\"",
    );
    out.line("err = clGetDeviceInfo(device_id, CL_DEVICE_MAX_WORK_ITEM_SIZES, sizeof(size_t) * max_dimensions, max_work_items, NULL);");
    out.check_err("Error querying CL_DEVICE_MAX_WORK_ITEM_SIZES");
    for (dim, size) in local.iter().enumerate() {
        out.fail_if(
            &format!("max_work_items[{}] < {}", dim, size),
            &format!(
                "\"Local work size in dimension {} is {}, which exceeds the maximum of %lu for this device\\n\", (unsigned long)max_work_items[{}]",
                dim, size, dim
            ),
        );
    }
    out.line("free(max_work_items);");

    let group = record.work_group_size().unwrap_or(1);
    out.section("Checking the work-group size");
    out.line("size_t max_work_group_size = 0;");
    out.line("err = clGetDeviceInfo(device_id, CL_DEVICE_MAX_WORK_GROUP_SIZE, sizeof(size_t), &max_work_group_size, NULL);");
    out.check_err("Error querying CL_DEVICE_MAX_WORK_GROUP_SIZE");
    out.fail_if(
        &format!("max_work_group_size < {}", group),
        &format!(
            "\"Kernel work-group size is {}, which exceeds the maximum work-group size of %lu for this device\\n\", (unsigned long)max_work_group_size",
            group
        ),
    );
}
