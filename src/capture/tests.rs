use std::path::{Path, PathBuf};

use super::*;
use crate::diagnostic::ErrorKind;

fn parse(source: &str) -> CaptureLog {
    CaptureLog::parse(Path::new("captures/log.json"), source.to_string()).unwrap()
}

fn record(source: &str) -> Result<CaptureRecord, crate::diagnostic::Diagnostic> {
    let log = parse(source);
    CaptureRecord::from_entry(&log.entries[0], log.base_dir())
}

const VECADD: &str = r#"[
{
"language": "OpenCL",
"kernel_file": "vecadd.1.cl",
"global_size": [1024],
"local_size": [64],
"compiler_flags": "-DN=1024",
"entry_point": "vecadd",
"kernel_arguments": [
{"type": "array", "size": 4096, "flags": "CL_MEM_READ_ONLY", "data": "a.bin"},
{"type": "array", "size": 4096, "flags": ["CL_MEM_READ_ONLY"], "data": "b.bin"},
{"type": "array", "size": 4096, "flags": ["CL_MEM_WRITE_ONLY"]}
]
}
]"#;

// --- Log parsing ---

#[test]
fn test_parse_vecadd_log() {
    let log = parse(VECADD);
    assert_eq!(log.len(), 1);
    let entry = &log.entries[0];
    assert_eq!(entry.entry_point.as_deref(), Some("vecadd"));
    assert_eq!(entry.kernel_arguments.len(), 3);
    assert_eq!(&log.source[entry.span.range()][..1], "{");
}

#[test]
fn test_parse_rejects_non_array() {
    let err = CaptureLog::parse(Path::new("log.json"), "{\"language\": \"OpenCL\"}".to_string())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
}

#[test]
fn test_parse_rejects_truncated_log() {
    let truncated = &VECADD[..VECADD.len() - 4];
    let err = CaptureLog::parse(Path::new("log.json"), truncated.to_string()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(!err.message.contains(" at line "));
}

#[test]
fn test_parse_rejects_wrongly_typed_field() {
    let src = r#"[{"language": "OpenCL"}, {"global_size": "big"}]"#;
    let err = CaptureLog::parse(Path::new("log.json"), src.to_string()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.notes, vec!["in record 1"]);
    // The span points inside the second record.
    assert!(err.span.start as usize > src.find("}, {").unwrap());
}

#[test]
fn test_parse_empty_log() {
    let log = parse("[]");
    assert!(log.is_empty());
    assert!(log.select(None).unwrap().is_empty());
}

#[test]
fn test_local_memory_size_with_spaced_colon() {
    let log = parse(r#"[{"kernel_arguments": [{"type": "array","size" : 256}]}]"#);
    assert_eq!(log.entries[0].kernel_arguments[0].size, Some(256));
}

// --- Selection ---

#[test]
fn test_select_all_in_file_order() {
    let log = parse(r#"[{"entry_point": "a"}, {"entry_point": "b"}, {"entry_point": "c"}]"#);
    let selected = log.select(None).unwrap();
    let names: Vec<_> = selected
        .iter()
        .map(|(i, e)| (*i, e.entry_point.clone().unwrap()))
        .collect();
    assert_eq!(
        names,
        vec![(0, "a".to_string()), (1, "b".to_string()), (2, "c".to_string())]
    );
}

#[test]
fn test_select_one() {
    let log = parse(r#"[{"entry_point": "a"}, {"entry_point": "b"}]"#);
    let selected = log.select(Some(1)).unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].0, 1);
    assert_eq!(selected[0].1.entry_point.as_deref(), Some("b"));
}

#[test]
fn test_select_out_of_range() {
    let log = parse(r#"[{"entry_point": "a"}, {"entry_point": "b"}]"#);
    let err = log.select(Some(2)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Index);
    assert!(err.message.contains("has 2 records"));
}

// --- Record validation ---

#[test]
fn test_vecadd_record() {
    let rec = record(VECADD).unwrap();
    assert_eq!(rec.language, "OpenCL");
    assert_eq!(rec.kernel_file, PathBuf::from("captures/vecadd.1.cl"));
    assert_eq!(rec.global_size, vec![1024]);
    assert_eq!(rec.local_size, Some(vec![64]));
    assert_eq!(rec.work_group_size(), Some(64));
    assert_eq!(rec.compiler_flags.as_deref(), Some("-DN=1024"));
    assert_eq!(rec.arguments.len(), 3);

    match &rec.arguments[0] {
        KernelArgument::Buffer(b) => {
            assert_eq!(b.size, 4096);
            assert!(b.flags.is_exactly(AccessFlag::ReadOnly));
            assert_eq!(b.init, BufferInit::File(PathBuf::from("captures/a.bin")));
            assert!(!b.is_output());
        }
        other => panic!("expected buffer, got {:?}", other),
    }
    match &rec.arguments[2] {
        KernelArgument::Buffer(b) => {
            assert!(b.flags.is_exactly(AccessFlag::WriteOnly));
            assert_eq!(b.init, BufferInit::Zeroed);
            assert!(b.is_output());
        }
        other => panic!("expected buffer, got {:?}", other),
    }
    assert_eq!(
        rec.input_files(),
        vec![
            Path::new("captures/vecadd.1.cl"),
            Path::new("captures/a.bin"),
            Path::new("captures/b.bin"),
        ]
    );
}

#[test]
fn test_mismatched_dimensions_is_format_error() {
    let err = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [64, 64], "local_size": [8]}]"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Format);
    assert!(err.message.contains("`local_size` has 1"));
}

#[test]
fn test_mismatched_offset_is_format_error() {
    let err = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [64], "global_offset": [0, 0]}]"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Format);
}

#[test]
fn test_too_many_dimensions() {
    let err = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [2, 2, 2, 2]}]"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Format);
}

#[test]
fn test_zero_work_sizes_rejected() {
    let global = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [0]}]"#,
    );
    assert!(global.is_err());
    let local = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [8, 8], "local_size": [8, 0]}]"#,
    );
    assert!(local.unwrap_err().message.contains("dimension 1"));
}

#[test]
fn test_unconstrained_local_size() {
    let rec = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [100]}]"#,
    )
    .unwrap();
    assert_eq!(rec.local_size, None);
    assert_eq!(rec.work_group_size(), None);
    assert!(rec.arguments.is_empty());
}

#[test]
fn test_wrong_language_rejected() {
    let err = record(
        r#"[{"language": "CUDA", "kernel_file": "k.cu", "entry_point": "k",
            "global_size": [1]}]"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Format);
    assert!(err.message.contains("CUDA"));
    assert!(err.help.is_some());
}

#[test]
fn test_missing_fields_are_format_errors() {
    for src in [
        r#"[{"kernel_file": "k.cl", "entry_point": "k", "global_size": [1]}]"#,
        r#"[{"language": "OpenCL", "entry_point": "k", "global_size": [1]}]"#,
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "global_size": [1]}]"#,
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k"}]"#,
    ] {
        let err = record(src).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Format, "{}", src);
    }
}

#[test]
fn test_unsupported_argument_kind() {
    let err = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [1],
            "kernel_arguments": [{"type": "scalar", "value": "0x01"}, {"type": "image"}]}]"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Format);
    assert!(err.message.starts_with("argument 1:"));
    assert!(err.message.contains("'image'"));
}

#[test]
fn test_read_buffers_need_data() {
    let err = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [1],
            "kernel_arguments": [{"type": "array", "size": 4, "flags": "CL_MEM_READ_WRITE"}]}]"#,
    )
    .unwrap_err();
    assert!(err.message.contains("needs initial `data`"));
}

#[test]
fn test_write_only_ignores_data() {
    let rec = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [1],
            "kernel_arguments": [{"type": "array", "size": 4, "flags": "CL_MEM_WRITE_ONLY", "data": "out.bin"}]}]"#,
    )
    .unwrap();
    match &rec.arguments[0] {
        KernelArgument::Buffer(b) => assert_eq!(b.init, BufferInit::Zeroed),
        other => panic!("expected buffer, got {:?}", other),
    }
    assert_eq!(rec.input_files(), vec![Path::new("captures/k.cl")]);
}

#[test]
fn test_inline_data() {
    let rec = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [1],
            "kernel_arguments": [{"type": "array", "size": 3, "flags": "CL_MEM_READ_WRITE", "data": [1, 2, 255]}]}]"#,
    )
    .unwrap();
    match &rec.arguments[0] {
        KernelArgument::Buffer(b) => assert_eq!(b.init, BufferInit::Inline(vec![1, 2, 255])),
        other => panic!("expected buffer, got {:?}", other),
    }

    let short = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [1],
            "kernel_arguments": [{"type": "array", "size": 4, "flags": "CL_MEM_READ_ONLY", "data": [1, 2]}]}]"#,
    );
    assert!(short.unwrap_err().message.contains("2 bytes"));
}

#[test]
fn test_local_memory_argument() {
    let rec = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [1],
            "kernel_arguments": [{"type": "array", "size": 512}]}]"#,
    )
    .unwrap();
    assert_eq!(rec.arguments[0], KernelArgument::Local { size: 512 });
    assert_eq!(rec.buffers().count(), 0);
}

#[test]
fn test_absolute_paths_kept() {
    let rec = record(
        r#"[{"language": "OpenCL", "kernel_file": "/tmp/k.cl", "entry_point": "k",
            "global_size": [1]}]"#,
    )
    .unwrap();
    assert_eq!(rec.kernel_file, PathBuf::from("/tmp/k.cl"));
}

// --- Scalars ---

#[test]
fn test_scalar_decoding() {
    let v = ScalarValue::parse("0x1234").unwrap();
    assert_eq!(v.width, ScalarWidth::U16);
    assert_eq!(v.value, 4660);
    assert_eq!(v.width.cl_type(), "cl_ushort");
    assert_eq!(v.c_literal(), "0x1234");
}

#[test]
fn test_scalar_widths() {
    assert_eq!(ScalarValue::parse("0xff").unwrap().width, ScalarWidth::U8);
    let word = ScalarValue::parse("0x00000400").unwrap();
    assert_eq!(word.width, ScalarWidth::U32);
    assert_eq!(word.value, 1024);
    assert_eq!(word.c_literal(), "0x00000400");
    let long = ScalarValue::parse("0xFFFFFFFFFFFFFFFF").unwrap();
    assert_eq!(long.width, ScalarWidth::U64);
    assert_eq!(long.value, u64::MAX);
    assert_eq!(long.c_literal(), "0xffffffffffffffff");
}

#[test]
fn test_scalar_rejects_bad_values() {
    assert!(ScalarValue::parse("1234").is_err());
    assert!(ScalarValue::parse("0x").is_err());
    assert!(ScalarValue::parse("0x123").is_err());
    assert!(ScalarValue::parse("0x123456").is_err());
    assert!(ScalarValue::parse("0xzz").is_err());
}

// --- Access flags ---

#[test]
fn test_flags_from_string_and_list() {
    let one = RawFlagsCase::parse(r#""CL_MEM_READ_WRITE""#);
    assert!(one.is_exactly(AccessFlag::ReadWrite));

    let many = RawFlagsCase::parse(r#"["CL_MEM_READ_ONLY", "CL_MEM_WRITE_ONLY"]"#);
    assert!(many.contains(AccessFlag::ReadOnly));
    assert!(many.contains(AccessFlag::WriteOnly));
    assert!(!many.is_exactly(AccessFlag::ReadOnly));
    assert!(many.needs_initial_data());
    assert_eq!(many.c_expr(), "CL_MEM_WRITE_ONLY | CL_MEM_READ_ONLY");

    let piped = RawFlagsCase::parse(r#""CL_MEM_READ_ONLY | CL_MEM_READ_WRITE""#);
    assert!(piped.contains(AccessFlag::ReadWrite));
}

#[test]
fn test_unknown_flag_rejected() {
    let err = record(
        r#"[{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
            "global_size": [1],
            "kernel_arguments": [{"type": "array", "size": 4, "flags": "UNKNOWN"}]}]"#,
    )
    .unwrap_err();
    assert!(err.message.contains("'UNKNOWN'"));
}

/// Builds flags through a full record so the raw form goes through the log parser.
struct RawFlagsCase;

impl RawFlagsCase {
    fn parse(flags_json: &str) -> AccessFlags {
        let src = format!(
            r#"[{{"language": "OpenCL", "kernel_file": "k.cl", "entry_point": "k",
                "global_size": [1],
                "kernel_arguments": [{{"type": "array", "size": 4, "flags": {}, "data": "d.bin"}}]}}]"#,
            flags_json
        );
        match &record(&src).unwrap().arguments[0] {
            KernelArgument::Buffer(b) => b.flags,
            other => panic!("expected buffer, got {:?}", other),
        }
    }
}
