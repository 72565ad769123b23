//! dtlink CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info, warn};

use dtlink_cli::{
    Args,
    error_adapter::{diagnostic_reportables, to_reportables},
};

fn main() {
    // Install miette's pretty panic hook early for better panic reports
    miette::set_panic_hook();

    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting dtlink");
    debug!(args:?; "Parsed arguments");

    let reporter = miette::GraphicalReportHandler::new();

    let outcome = match dtlink_cli::run(&args) {
        Ok(outcome) => outcome,
        Err(err) => {
            for reportable in to_reportables(&err) {
                let mut writer = String::new();
                reporter
                    .render_report(&mut writer, &reportable)
                    .expect("Writing to String buffer is infallible");

                error!("{writer}");
            }
            process::exit(1);
        }
    };

    for reportable in diagnostic_reportables(&outcome.context, &outcome.diagnostics) {
        let mut writer = String::new();
        reporter
            .render_report(&mut writer, &reportable)
            .expect("Writing to String buffer is infallible");

        if reportable.is_error() {
            error!("{writer}");
        } else {
            warn!("{writer}");
        }
    }

    if args.dump_tree {
        println!("{}", outcome.tree());
    }

    if outcome.failed() {
        process::exit(1);
    }

    info!("Completed successfully");
}
