//! Gesture-driven presentation control.

use anyhow::Result;
use clap::Parser;
use log::info;
use pose_gesture_control::{
    app::{build_and_run, run_bounded},
    cli::Args,
    config::EXAMPLE_CONFIG,
};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Pose Gesture Control");

    let config = args.resolve_config()?;
    let source = args.pose_source();
    let timeout = config.session.timeout();

    let summary = run_bounded(timeout, move |stop| build_and_run(&config, &source, stop))?;

    println!(
        "{} frames, {} gestures, {} failed dispatches",
        summary.frames, summary.events, summary.dispatch_failures
    );
    if let Some(report) = summary.report {
        print!("{report}");
    }

    Ok(())
}
