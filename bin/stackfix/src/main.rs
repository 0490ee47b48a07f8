use stackfix::jvm;
use stackfix::jvm::code::{parse_listing, render_listing};
use stackfix::repair::{repair_methods, Settings};

use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use std::fs;
use std::path::PathBuf;
use std::process;

fn main() -> Result<(), jvm::Error> {
    env_logger::init();

    let matches = Command::new("try/catch stack repair")
        .version(crate_version!())
        .about("Insert stack save/restore markers around try/catch regions in method listings")
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .action(ArgAction::SetTrue)
                .help("Repair methods one at a time instead of on a thread pool"),
        )
        .arg(
            Arg::new("no-validate")
                .long("no-validate")
                .action(ArgAction::SetTrue)
                .help("Skip checking exception table labels before repairing"),
        )
        .arg(
            Arg::new("jobs")
                .long("jobs")
                .short('j')
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Number of worker threads (defaults to one per CPU)"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Method listing files to repair")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    let settings = Settings {
        validate_table: !matches.get_flag("no-validate"),
        parallel: !matches.get_flag("sequential"),
    };

    if let Some(jobs) = matches.get_one::<usize>("jobs") {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(*jobs)
            .build_global()
        {
            log::warn!("Could not size worker pool to {} threads: {}", jobs, err);
        }
    }

    let mut failures = 0;
    for input in matches.get_many::<PathBuf>("INPUT").into_iter().flatten() {
        log::info!("Reading '{}'", input.display());
        let listing = fs::read_to_string(input)?;
        let mut methods = parse_listing(&listing)?;

        let results = repair_methods(&mut methods, &settings);
        for (method, result) in methods.iter().zip(&results) {
            match result {
                Ok(summary) if summary.skipped => {
                    log::info!("'{}' has no protected regions", method.name)
                }
                Ok(summary) => log::info!(
                    "'{}': {} save markers, {} restore markers",
                    method.name,
                    summary.save_markers,
                    summary.region_restore_markers + summary.handler_restore_markers
                ),
                Err(err) => {
                    log::error!("'{}' in '{}': {}", method.name, input.display(), err);
                    failures += 1;
                }
            }
        }

        print!("{}", render_listing(&methods));
    }

    if failures > 0 {
        log::error!("Failed to repair {} method(s)", failures);
        process::exit(1);
    }
    Ok(())
}
