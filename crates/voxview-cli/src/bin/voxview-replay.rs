//! Voxview Replay
//!
//! Apply a replay script to a fresh viewer state and print what happened.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxview_cli::{run, Script};

#[derive(Parser, Debug)]
#[command(name = "voxview-replay")]
#[command(about = "Replay a scripted viewer state session", long_about = None)]
struct Args {
    /// Path to the replay script (JSON)
    script: PathBuf,

    /// Log every change at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Print the recorded change timeline as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "voxview_replay=debug,voxview_cli=debug,voxview_state=debug"
    } else {
        "voxview_replay=info,voxview_cli=info,voxview_state=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(script = %args.script.display(), "Starting replay");

    let script = Script::load(&args.script)?;
    let report = run(&script)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.timeline)?);
        return Ok(());
    }

    println!("Voxview Replay");
    println!("==============");
    println!();
    for outcome in &report.steps {
        let marker = if outcome.changed { "*" } else { " " };
        println!(
            "{} step {:>3}: visible [{}]",
            marker,
            outcome.index,
            outcome.visible.join(", ")
        );
        for change in &outcome.changes {
            println!("           {}", change);
        }
    }
    println!();
    println!("Steps: {}", report.steps.len());
    println!("Changes: {}", report.timeline.len());

    Ok(())
}
