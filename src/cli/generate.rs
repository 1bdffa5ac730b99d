use std::path::PathBuf;
use std::process;

use clap::Args;

use minihost::config::DEFAULT_BUILD_OPTIONS;
use minihost::{DeviceSelection, ReplayConfig};

use super::{load_log, report};

#[derive(Args)]
pub struct GenerateArgs {
    /// Capture log (JSON array of dispatch records)
    pub log: PathBuf,
    /// Zero-based record to generate (default: every record)
    pub index: Option<usize>,
    /// Pick the first device whose version string contains PATTERN
    #[arg(long, value_name = "PATTERN", conflicts_with_all = ["platform", "device"])]
    pub device_match: Option<String>,
    /// Platform ordinal; the generated program takes the kernel path as its argument
    #[arg(long, value_name = "N")]
    pub platform: Option<u32>,
    /// Device ordinal within the platform
    #[arg(long, value_name = "N")]
    pub device: Option<u32>,
    /// Base options for clBuildProgram; recorded compiler flags are appended
    #[arg(long, value_name = "OPTS", default_value = DEFAULT_BUILD_OPTIONS, allow_hyphen_values = true)]
    pub build_options: String,
    /// Directory to write generated sources to
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,
    /// Output file name prefix
    #[arg(long, default_value = "minihost_")]
    pub prefix: String,
}

impl GenerateArgs {
    fn replay_config(&self) -> ReplayConfig {
        let device = match (self.platform, self.device) {
            (None, None) => {
                DeviceSelection::VersionMatch(self.device_match.clone().unwrap_or_default())
            }
            (platform, device) => DeviceSelection::Ordinal {
                platform: platform.unwrap_or(0),
                device: device.unwrap_or(0),
            },
        };
        ReplayConfig {
            device,
            build_options: self.build_options.clone(),
            output_dir: self.out_dir.clone(),
            output_prefix: self.prefix.clone(),
        }
    }
}

pub fn cmd_generate(args: GenerateArgs) {
    let config = args.replay_config();
    let log = load_log(&args.log);

    let run = match minihost::generate(&log, args.index, &config) {
        Ok(run) => run,
        Err(diag) => {
            report(&[diag], &args.log, &log.source);
            process::exit(1);
        }
    };

    for outcome in &run.outcomes {
        report(&outcome.warnings, &args.log, &log.source);
        match &outcome.result {
            Ok(path) => eprintln!(
                "Generated record {} -> {}",
                outcome.log_index,
                path.display()
            ),
            Err(diag) => report(std::slice::from_ref(diag), &args.log, &log.source),
        }
    }

    let failed = run.failures().count();
    if failed > 0 {
        eprintln!(
            "error: {} of {} record(s) could not be generated",
            failed,
            run.outcomes.len()
        );
        process::exit(1);
    }
    if log.is_empty() {
        eprintln!("warning: '{}' contains no records", args.log.display());
    }
}
