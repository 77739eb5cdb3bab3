#[macro_use]
extern crate tracing;

use std::env;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use sheet_motion::animation::{SpringParams, SpringSolution, TimingCurve};
use sheet_motion::cli::{Cli, Sub};
use sheet_motion::headless::{FrameRecord, Simulation};
use sheet_motion::snap::{resolve_snap_point, SnapPoint};
use sheet_motion::trace::Trace;
use sheet_motion_config::Config;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "sheet_motion=debug,sheet_motion_config=debug";

fn main() -> anyhow::Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();
    let _client = tracy_client::Client::start();

    match cli.subcommand {
        Sub::Curve {
            mass,
            stiffness,
            damping,
            epsilon,
            velocity,
            steps,
        } => {
            let params = SpringParams::new(mass, stiffness, damping, epsilon);
            let solution = SpringSolution::new(params, velocity);
            let duration = solution.settle_duration();

            let curve = TimingCurve::from_spring(&solution, steps);
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}s", duration.as_secs_f64())?;
            writeln!(stdout, "{curve}")?;
        }
        Sub::Resolve {
            points,
            offset,
            velocity,
            extent,
        } => {
            let points = points
                .iter()
                .map(|point| point.parse::<SnapPoint>())
                .collect::<Result<Vec<_>, _>>()
                .context("error parsing snap points")?;
            let config = load_config(cli.config.as_deref())?;
            let threshold = config.sheet.flick_threshold;

            match resolve_snap_point(&points, offset, velocity, extent, threshold) {
                Some(target) => println!("{} ({}px)", target.index, target.position),
                None => println!("dismiss"),
            }
        }
        Sub::Simulate { trace, json } => {
            let config = load_config(cli.config.as_deref())?;
            let trace = Trace::load(&trace)?;

            let mut simulation = Simulation::new(config, trace.extent, trace.max_scroll);
            let records = trace.replay(&mut simulation);
            info!("replayed {} events over {} frames", trace.events.len(), records.len());

            let mut stdout = io::stdout().lock();
            for record in &records {
                if json {
                    writeln!(stdout, "{}", frame_json(record))?;
                } else {
                    writeln!(stdout, "{}", frame_line(record))?;
                }
            }
        }
        Sub::Validate => {
            let Some(path) = cli.config else {
                bail!("no config file given, pass one with --config");
            };
            Config::load(&path)?;
            info!("config is valid");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => {
            debug!("no config file given, using defaults");
            Ok(Config::default())
        }
    }
}

fn frame_line(record: &FrameRecord) -> String {
    let rendered = record
        .rendered
        .map_or_else(|| String::from("?"), |y| format!("{y:.2}"));
    format!(
        "{:>6}ms  offset {:>8.2}  rendered {:>8}  scroll {:>7.2}  {:?}  {:?}",
        record.at.as_millis(),
        record.offset,
        rendered,
        record.scroll,
        record.mode,
        record.phase,
    )
}

fn frame_json(record: &FrameRecord) -> serde_json::Value {
    serde_json::json!({
        "at-ms": record.at.as_millis() as u64,
        "offset": record.offset,
        "rendered": record.rendered,
        "scroll": record.scroll,
        "mode": format!("{:?}", record.mode),
        "phase": format!("{:?}", record.phase),
    })
}
