use std::path::PathBuf;

/// Build options every replay needs; `-cl-kernel-arg-info` keeps
/// argument type names queryable after the build.
pub const DEFAULT_BUILD_OPTIONS: &str = "-I . -D__NATIVE_EXECUTION -cl-kernel-arg-info";

const ARG_INFO_OPTION: &str = "-cl-kernel-arg-info";

/// How the generated program picks its compute device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSelection {
    /// First device whose version string contains the pattern.
    /// The kernel source path is baked into the program.
    VersionMatch(String),
    /// Fixed platform/device ordinals. The kernel source path is the
    /// program's single command-line argument.
    Ordinal { platform: u32, device: u32 },
}

impl Default for DeviceSelection {
    fn default() -> Self {
        DeviceSelection::VersionMatch(String::new())
    }
}

impl DeviceSelection {
    /// Whether the generated program reads the kernel path from `argv[1]`.
    pub fn kernel_path_from_argv(&self) -> bool {
        matches!(self, DeviceSelection::Ordinal { .. })
    }
}

/// Generation settings shared by every emitter stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    pub device: DeviceSelection,
    /// Base options passed to `clBuildProgram`; recorded compiler flags
    /// are appended per record.
    pub build_options: String,
    /// Directory generated sources are written to.
    pub output_dir: PathBuf,
    /// File name prefix; the run position and `.c` follow it.
    pub output_prefix: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            device: DeviceSelection::default(),
            build_options: DEFAULT_BUILD_OPTIONS.to_string(),
            output_dir: PathBuf::from("."),
            output_prefix: "minihost_".to_string(),
        }
    }
}

impl ReplayConfig {
    /// Output path for the record at run position `position`.
    pub fn output_path(&self, position: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.c", self.output_prefix, position))
    }

    /// Effective build options: base options, the reflection flag if the
    /// base lacks it, then whatever the capture recorded.
    pub fn effective_build_options(&self, recorded: Option<&str>) -> String {
        let mut parts: Vec<&str> = self.build_options.split_whitespace().collect();
        if !parts.contains(&ARG_INFO_OPTION) {
            parts.push(ARG_INFO_OPTION);
        }
        if let Some(flags) = recorded {
            parts.extend(flags.split_whitespace());
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReplayConfig::default();
        assert_eq!(config.device, DeviceSelection::VersionMatch(String::new()));
        assert_eq!(config.build_options, DEFAULT_BUILD_OPTIONS);
        assert_eq!(config.output_path(3), PathBuf::from("./minihost_3.c"));
        assert!(!config.device.kernel_path_from_argv());
    }

    #[test]
    fn test_ordinal_reads_kernel_from_argv() {
        let sel = DeviceSelection::Ordinal {
            platform: 1,
            device: 0,
        };
        assert!(sel.kernel_path_from_argv());
    }

    #[test]
    fn test_build_options_keep_arg_info() {
        let config = ReplayConfig {
            build_options: "-O0".to_string(),
            ..ReplayConfig::default()
        };
        assert_eq!(
            config.effective_build_options(None),
            "-O0 -cl-kernel-arg-info"
        );
    }

    #[test]
    fn test_build_options_append_recorded_flags() {
        let config = ReplayConfig::default();
        assert_eq!(
            config.effective_build_options(Some("  -DN=4   -cl-fast-relaxed-math ")),
            "-I . -D__NATIVE_EXECUTION -cl-kernel-arg-info -DN=4 -cl-fast-relaxed-math"
        );
    }
}
