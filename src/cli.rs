use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::version;

#[derive(Parser)]
#[command(author, version = version(), about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_value_name = "SUBCOMMAND")]
#[command(subcommand_help_heading = "Subcommands")]
pub struct Cli {
    /// Path to config file.
    ///
    /// When omitted, the built-in defaults are used.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub subcommand: Sub,
}

#[derive(Subcommand)]
pub enum Sub {
    /// Print the CSS easing function and settle duration of a spring.
    Curve {
        #[arg(long, default_value_t = 1.)]
        mass: f64,
        #[arg(long, default_value_t = 130.)]
        stiffness: f64,
        #[arg(long, default_value_t = 26.)]
        damping: f64,
        #[arg(long, default_value_t = 0.0001)]
        epsilon: f64,
        /// Initial velocity, in normalized units per second.
        #[arg(long, default_value_t = 0., allow_negative_numbers = true)]
        velocity: f64,
        /// Number of points in the curve.
        #[arg(long, default_value_t = crate::animation::DEFAULT_STEP_COUNT)]
        steps: usize,
    },
    /// Resolve the snap point a release lands on.
    Resolve {
        /// Snap points, like `0.5`, `40%` or `120px`.
        #[arg(long, value_delimiter = ',', required = true)]
        points: Vec<String>,
        /// Offset of the sheet when released.
        #[arg(long, allow_negative_numbers = true)]
        offset: f64,
        /// Pointer velocity, in pixels per sample. Positive moves toward closed.
        #[arg(long, default_value_t = 0., allow_negative_numbers = true)]
        velocity: f64,
        /// Extent of the container.
        #[arg(long)]
        extent: f64,
    },
    /// Replay a recorded gesture trace and print every frame.
    Simulate {
        /// Path to the JSON trace.
        trace: PathBuf,
        /// Print frames as JSON lines.
        #[arg(long)]
        json: bool,
    },
    /// Validate the config file.
    Validate,
}
