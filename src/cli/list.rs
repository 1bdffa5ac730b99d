use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{load_log, report};

#[derive(Args)]
pub struct ListArgs {
    /// Capture log (JSON array of dispatch records)
    pub log: PathBuf,
}

pub fn cmd_list(args: ListArgs) {
    let log = load_log(&args.log);

    let mut invalid = 0usize;
    for (index, checked) in minihost::check_records(&log) {
        match checked {
            Ok(record) => println!("{}", minihost::describe_record(index, &record)),
            Err(diag) => {
                println!("#{} invalid", index);
                report(&[diag], &args.log, &log.source);
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        eprintln!("error: {} of {} record(s) are invalid", invalid, log.len());
        process::exit(1);
    }
}
