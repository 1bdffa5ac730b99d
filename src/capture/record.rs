//! Validated capture records.
//!
//! A [`LogEntry`] is whatever the capture log said; a [`CaptureRecord`] is
//! an entry that passed every structural check and can be emitted without
//! further validation. Conversion is the only place FormatErrors arise.

use std::fmt;
use std::path::{Path, PathBuf};

use super::log::{HostCall, LogEntry, RawArgument, RawData, RawFlags};
use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// The only dispatch dialect the replay driver knows how to set up.
pub const SUPPORTED_LANGUAGE: &str = "OpenCL";

/// Maximum dispatch dimensionality of the dispatch model.
pub const MAX_DIMENSIONS: usize = 3;

/// One observed kernel dispatch, ready for emission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRecord {
    pub language: String,
    pub kernel_file: PathBuf,
    pub entry_point: String,
    pub global_size: Vec<u64>,
    /// `None` when the capture left the work-group size to the runtime.
    pub local_size: Option<Vec<u64>>,
    pub global_offset: Option<Vec<u64>>,
    pub compiler_flags: Option<String>,
    /// Positional: index `i` binds kernel parameter `i`.
    pub arguments: Vec<KernelArgument>,
    pub host_calls: Vec<HostCall>,
}

impl CaptureRecord {
    /// Validate a log entry. Relative kernel and data paths are resolved
    /// against `base_dir`, the directory holding the log.
    pub fn from_entry(entry: &LogEntry, base_dir: &Path) -> Result<Self, Diagnostic> {
        let span = entry.span;
        let err = |msg: String| Diagnostic::format(msg, span);

        let language = match entry.language.as_deref() {
            None => return Err(err("record has no `language`".to_string())),
            Some(SUPPORTED_LANGUAGE) => SUPPORTED_LANGUAGE.to_string(),
            Some(other) => {
                return Err(err(format!("unsupported kernel language '{}'", other))
                    .with_help(format!("only {} dispatches can be replayed", SUPPORTED_LANGUAGE)))
            }
        };

        let kernel_file = match entry.kernel_file.as_deref() {
            Some(f) if !f.trim().is_empty() => resolve_path(base_dir, f),
            _ => return Err(err("record has no `kernel_file`".to_string())),
        };

        let entry_point = match entry.entry_point.as_deref() {
            Some(e) if !e.trim().is_empty() => e.to_string(),
            _ => return Err(err("record has no `entry_point`".to_string())),
        };

        let global_size = match &entry.global_size {
            Some(g) => g.clone(),
            None => return Err(err("record has no `global_size`".to_string())),
        };
        if global_size.is_empty() || global_size.len() > MAX_DIMENSIONS {
            return Err(err(format!(
                "`global_size` has {} dimensions; expected 1 to {}",
                global_size.len(),
                MAX_DIMENSIONS
            )));
        }
        if let Some(dim) = global_size.iter().position(|&g| g == 0) {
            return Err(err(format!("`global_size` is zero in dimension {}", dim)));
        }

        if let Some(local) = &entry.local_size {
            if local.len() != global_size.len() {
                return Err(err(format!(
                    "`global_size` has {} dimensions but `local_size` has {}",
                    global_size.len(),
                    local.len()
                )));
            }
            if let Some(dim) = local.iter().position(|&l| l == 0) {
                return Err(err(format!("`local_size` is zero in dimension {}", dim)));
            }
        }

        if let Some(offset) = &entry.global_offset {
            if offset.len() != global_size.len() {
                return Err(err(format!(
                    "`global_size` has {} dimensions but `global_offset` has {}",
                    global_size.len(),
                    offset.len()
                )));
            }
        }

        let arguments = entry
            .kernel_arguments
            .iter()
            .enumerate()
            .map(|(i, arg)| KernelArgument::from_raw(i, arg, base_dir, span))
            .collect::<Result<Vec<_>, _>>()?;

        let compiler_flags = entry
            .compiler_flags
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        Ok(Self {
            language,
            kernel_file,
            entry_point,
            global_size,
            local_size: entry.local_size.clone(),
            global_offset: entry.global_offset.clone(),
            compiler_flags,
            arguments,
            host_calls: entry.host_api_calls.clone(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.global_size.len()
    }

    /// Product of the local size components, if the capture fixed them.
    pub fn work_group_size(&self) -> Option<u64> {
        self.local_size
            .as_ref()
            .map(|l| l.iter().fold(1u64, |acc, &x| acc.saturating_mul(x)))
    }

    /// Buffer arguments with their positions.
    pub fn buffers(&self) -> impl Iterator<Item = (usize, &BufferArgument)> {
        self.arguments.iter().enumerate().filter_map(|(i, a)| match a {
            KernelArgument::Buffer(b) => Some((i, b)),
            _ => None,
        })
    }

    /// Files the generated program will read at runtime, kernel source first.
    pub fn input_files(&self) -> Vec<&Path> {
        let mut files = vec![self.kernel_file.as_path()];
        for (_, buffer) in self.buffers() {
            if let BufferInit::File(path) = &buffer.init {
                files.push(path.as_path());
            }
        }
        files
    }
}

/// One positional kernel argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelArgument {
    /// Bound by value.
    Scalar(ScalarValue),
    /// Device buffer with a host shadow copy.
    Buffer(BufferArgument),
    /// Work-group local memory of the given size; no host data.
    Local { size: u64 },
}

impl KernelArgument {
    fn from_raw(
        index: usize,
        raw: &RawArgument,
        base_dir: &Path,
        span: Span,
    ) -> Result<Self, Diagnostic> {
        let err = |msg: String| Diagnostic::format(format!("argument {}: {}", index, msg), span);

        match raw.kind.as_deref() {
            Some("scalar") => {
                let value = raw
                    .value
                    .as_deref()
                    .ok_or_else(|| err("scalar has no `value`".to_string()))?;
                ScalarValue::parse(value).map(KernelArgument::Scalar).map_err(err)
            }
            Some("array") => {
                let size = match raw.size {
                    Some(0) => return Err(err("array has zero `size`".to_string())),
                    Some(s) => s,
                    None => return Err(err("array has no `size`".to_string())),
                };
                let flags = match (&raw.flags, &raw.data) {
                    (None, None) => return Ok(KernelArgument::Local { size }),
                    (None, Some(_)) => return Err(err("array has `data` but no `flags`".to_string())),
                    (Some(flags), _) => AccessFlags::from_raw(flags).map_err(err)?,
                };
                let init = if flags.needs_initial_data() {
                    match &raw.data {
                        Some(RawData::Path(p)) if !p.trim().is_empty() => {
                            BufferInit::File(resolve_path(base_dir, p))
                        }
                        Some(RawData::Bytes(bytes)) => {
                            if bytes.len() as u64 != size {
                                return Err(err(format!(
                                    "inline `data` has {} bytes but `size` is {}",
                                    bytes.len(),
                                    size
                                )));
                            }
                            BufferInit::Inline(bytes.clone())
                        }
                        _ => {
                            return Err(err(format!(
                                "{} array needs initial `data`",
                                flags
                            )))
                        }
                    }
                } else {
                    BufferInit::Zeroed
                };
                Ok(KernelArgument::Buffer(BufferArgument { size, flags, init }))
            }
            Some(other) => Err(err(format!("unsupported argument kind '{}'", other))
                .with_help("only `scalar` and `array` arguments can be replayed".to_string())),
            None => Err(err("argument has no `type`".to_string())),
        }
    }
}

/// Host integer type for a scalar, chosen by its byte width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarWidth {
    U8,
    U16,
    U32,
    U64,
}

impl ScalarWidth {
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(ScalarWidth::U8),
            2 => Some(ScalarWidth::U16),
            4 => Some(ScalarWidth::U32),
            8 => Some(ScalarWidth::U64),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            ScalarWidth::U8 => 1,
            ScalarWidth::U16 => 2,
            ScalarWidth::U32 => 4,
            ScalarWidth::U64 => 8,
        }
    }

    /// OpenCL host type name.
    pub fn cl_type(self) -> &'static str {
        match self {
            ScalarWidth::U8 => "cl_uchar",
            ScalarWidth::U16 => "cl_ushort",
            ScalarWidth::U32 => "cl_uint",
            ScalarWidth::U64 => "cl_ulong",
        }
    }
}

/// A scalar argument decoded from its `0x`-prefixed capture string.
///
/// The capture prints the bytes most-significant first, so the digits
/// read directly as the numeric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarValue {
    pub width: ScalarWidth,
    pub value: u64,
}

impl ScalarValue {
    pub fn parse(text: &str) -> Result<Self, String> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .ok_or_else(|| format!("scalar value '{}' does not start with 0x", text))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("scalar value '{}' is not hexadecimal", text));
        }
        if digits.len() % 2 != 0 {
            return Err(format!(
                "scalar value '{}' has an odd number of hex digits",
                text
            ));
        }
        let width = ScalarWidth::from_bytes(digits.len() / 2).ok_or_else(|| {
            format!(
                "scalar value '{}' is {} bytes wide; expected 1, 2, 4 or 8",
                text,
                digits.len() / 2
            )
        })?;
        let value = u64::from_str_radix(digits, 16)
            .map_err(|e| format!("scalar value '{}': {}", text, e))?;
        Ok(Self { width, value })
    }

    /// Hex literal padded to the full width, e.g. `0x00000400`.
    pub fn c_literal(&self) -> String {
        format!("0x{:0width$x}", self.value, width = self.width.bytes() * 2)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferArgument {
    pub size: u64,
    pub flags: AccessFlags,
    pub init: BufferInit,
}

impl BufferArgument {
    /// Pure inputs are neither read back nor rendered.
    pub fn is_output(&self) -> bool {
        !self.flags.is_exactly(AccessFlag::ReadOnly)
    }
}

/// Where a buffer's initial contents come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferInit {
    /// Read exactly `size` bytes from this file at runtime.
    File(PathBuf),
    /// Bytes carried in the log itself.
    Inline(Vec<u8>),
    /// Write-only buffers start out zeroed.
    Zeroed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessFlag {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessFlag {
    pub const ALL: [AccessFlag; 3] = [
        AccessFlag::ReadWrite,
        AccessFlag::WriteOnly,
        AccessFlag::ReadOnly,
    ];

    pub fn token(self) -> &'static str {
        match self {
            AccessFlag::ReadOnly => "CL_MEM_READ_ONLY",
            AccessFlag::WriteOnly => "CL_MEM_WRITE_ONLY",
            AccessFlag::ReadWrite => "CL_MEM_READ_WRITE",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.token() == token)
    }

    fn bit(self) -> u8 {
        match self {
            AccessFlag::ReadWrite => 1,
            AccessFlag::WriteOnly => 2,
            AccessFlag::ReadOnly => 4,
        }
    }
}

/// Set of access flags recorded for a buffer. Not assumed exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessFlags(u8);

impl AccessFlags {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, flag: AccessFlag) {
        self.0 |= flag.bit();
    }

    pub fn contains(&self, flag: AccessFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if `flag` is the only member.
    pub fn is_exactly(&self, flag: AccessFlag) -> bool {
        self.0 == flag.bit()
    }

    /// Buffers the kernel may read from must be seeded with captured data.
    pub fn needs_initial_data(&self) -> bool {
        self.contains(AccessFlag::ReadOnly) || self.contains(AccessFlag::ReadWrite)
    }

    pub fn iter(&self) -> impl Iterator<Item = AccessFlag> {
        let flags = *self;
        AccessFlag::ALL.into_iter().filter(move |f| flags.contains(*f))
    }

    /// C expression for `clCreateBuffer`, e.g. `CL_MEM_READ_ONLY`.
    pub fn c_expr(&self) -> String {
        self.iter().map(AccessFlag::token).collect::<Vec<_>>().join(" | ")
    }

    fn from_raw(raw: &RawFlags) -> Result<Self, String> {
        let tokens: Vec<&str> = match raw {
            RawFlags::One(s) => s
                .split(|c: char| c == '|' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .collect(),
            RawFlags::Many(v) => v.iter().map(|s| s.trim()).collect(),
        };
        let mut flags = AccessFlags::empty();
        for token in tokens {
            let flag = AccessFlag::from_token(token)
                .ok_or_else(|| format!("unknown buffer access flag '{}'", token))?;
            flags.insert(flag);
        }
        if flags.is_empty() {
            return Err("array has empty `flags`".to_string());
        }
        Ok(flags)
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.c_expr())
    }
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
