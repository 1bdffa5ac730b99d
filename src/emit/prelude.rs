//! File-scope parts of the generated program: provenance header,
//! includes, error helpers and the device selection routine.

use super::render::emit_render_helpers;
use super::writer::SourceWriter;
use super::EmitContext;
use crate::config::DeviceSelection;

pub(crate) fn emit_header(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    let record = ctx.record;
    out.comment(format!(
        "Replay of captured {} dispatch `{}`.",
        record.language, record.entry_point
    ));
    out.comment("Generated by minihost; edits will be overwritten.");
    out.comment(format!("global size: {}", dims(&record.global_size)));
    match &record.local_size {
        Some(local) => out.comment(format!("local size: {}", dims(local))),
        None => out.comment("local size: chosen by the runtime"),
    }
    for call in &record.host_calls {
        out.comment(format!(
            "captured at {} ({}:{})",
            call.function_name, call.compilation_unit, call.line_number
        ));
    }
}

pub(crate) fn emit_includes(_ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.blank();
    out.raw(INCLUDES);
}

pub(crate) fn emit_helpers(ctx: &EmitContext<'_>, out: &mut SourceWriter) {
    out.blank();
    out.raw(ERROR_HELPERS);
    out.blank();
    emit_render_helpers(out);
    out.blank();
    match &ctx.config.device {
        DeviceSelection::VersionMatch(_) => out.raw(SELECT_BY_VERSION),
        DeviceSelection::Ordinal { .. } => out.raw(SELECT_BY_ORDINAL),
    }
}

fn dims(sizes: &[u64]) -> String {
    let parts: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

const INCLUDES: &str = r#"#define CL_TARGET_OPENCL_VERSION 120
#define CL_USE_DEPRECATED_OPENCL_1_2_APIS
#ifdef __APPLE__
  #include <OpenCL/opencl.h>
#else
  #include <CL/cl.h>
#endif
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <sys/stat.h>"#;

const ERROR_HELPERS: &str = r#"static int cl_error_check(cl_int err, const char *what) {
  if (err == CL_SUCCESS)
    return 0;
  fprintf(stderr, "%s: %d\n", what, (int)err);
  return 1;
}

// The runtime may invoke this from any thread, any number of times.
// It must only log.
static void CL_CALLBACK error_callback(const char *errinfo, const void *private_info, size_t cb, void *user_data) {
  (void)private_info;
  (void)cb;
  (void)user_data;
  fprintf(stderr, "OpenCL error (callback): %s\n", errinfo);
}"#;

const SELECT_BY_VERSION: &str = r#"// First device whose CL_DEVICE_VERSION contains `pattern`.
static int select_device(const char *pattern, cl_platform_id *platform_id, cl_device_id *device_id) {
  cl_uint num_platforms = 0;
  if (clGetPlatformIDs(0, NULL, &num_platforms) != CL_SUCCESS || num_platforms == 0)
    return 0;
  cl_platform_id *platforms = (cl_platform_id *)malloc(num_platforms * sizeof(cl_platform_id));
  if (platforms == NULL)
    return 0;
  int found = 0;
  if (clGetPlatformIDs(num_platforms, platforms, NULL) == CL_SUCCESS) {
    for (cl_uint i = 0; i < num_platforms && !found; ++i) {
      cl_uint num_devices = 0;
      if (clGetDeviceIDs(platforms[i], CL_DEVICE_TYPE_ALL, 0, NULL, &num_devices) != CL_SUCCESS || num_devices == 0)
        continue;
      cl_device_id *devices = (cl_device_id *)malloc(num_devices * sizeof(cl_device_id));
      if (devices == NULL)
        break;
      if (clGetDeviceIDs(platforms[i], CL_DEVICE_TYPE_ALL, num_devices, devices, NULL) == CL_SUCCESS) {
        for (cl_uint j = 0; j < num_devices && !found; ++j) {
          size_t version_size = 0;
          if (clGetDeviceInfo(devices[j], CL_DEVICE_VERSION, 0, NULL, &version_size) != CL_SUCCESS || version_size == 0)
            continue;
          char *version = (char *)malloc(version_size);
          if (version == NULL)
            continue;
          if (clGetDeviceInfo(devices[j], CL_DEVICE_VERSION, version_size, version, NULL) == CL_SUCCESS
              && strstr(version, pattern) != NULL) {
            *platform_id = platforms[i];
            *device_id = devices[j];
            found = 1;
          }
          free(version);
        }
      }
      free(devices);
    }
  }
  free(platforms);
  return found;
}"#;

const SELECT_BY_ORDINAL: &str = r#"// Device `device_index` of platform `platform_index`.
static int select_device(cl_uint platform_index, cl_uint device_index, cl_platform_id *platform_id, cl_device_id *device_id) {
  cl_uint num_platforms = 0;
  if (clGetPlatformIDs(0, NULL, &num_platforms) != CL_SUCCESS || platform_index >= num_platforms)
    return 0;
  cl_platform_id *platforms = (cl_platform_id *)malloc(num_platforms * sizeof(cl_platform_id));
  if (platforms == NULL)
    return 0;
  int found = 0;
  if (clGetPlatformIDs(num_platforms, platforms, NULL) == CL_SUCCESS) {
    cl_uint num_devices = 0;
    if (clGetDeviceIDs(platforms[platform_index], CL_DEVICE_TYPE_ALL, 0, NULL, &num_devices) == CL_SUCCESS
        && device_index < num_devices) {
      cl_device_id *devices = (cl_device_id *)malloc(num_devices * sizeof(cl_device_id));
      if (devices != NULL) {
        if (clGetDeviceIDs(platforms[platform_index], CL_DEVICE_TYPE_ALL, num_devices, devices, NULL) == CL_SUCCESS) {
          *platform_id = platforms[platform_index];
          *device_id = devices[device_index];
          found = 1;
        }
        free(devices);
      }
    }
  }
  free(platforms);
  return found;
}"#;
