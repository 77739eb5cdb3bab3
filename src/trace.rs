//! Recorded input traces for replaying gestures against a [`Simulation`].

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context};
use serde::Deserialize;

use crate::headless::{FrameRecord, Simulation};

const fn default_frame_interval_ms() -> u64 {
    16
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Trace {
    pub extent: f64,
    #[serde(default)]
    pub max_scroll: f64,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Keep rendering frames for this long after the last event.
    #[serde(default)]
    pub settle_ms: u64,
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TraceEvent {
    pub at_ms: u64,
    pub input: Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Input {
    Mount,
    Exit,
    Press { y: f64 },
    Move { y: f64 },
    Release,
    Cancel,
    Scroll { offset: f64 },
    Backdrop,
    Resize { extent: f64 },
    PanelResize { height: f64 },
    Navigate { index: usize },
}

impl Trace {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("error reading {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("error parsing {}", path.display()))
    }

    /// Replays the trace, rendering frames in between and after the events.
    pub fn replay(&self, simulation: &mut Simulation) -> Vec<FrameRecord> {
        let interval = Duration::from_millis(self.frame_interval_ms);
        let mut records = Vec::new();

        for event in &self.events {
            let at = Duration::from_millis(event.at_ms);
            records.extend(simulation.run_until(at, interval));
            apply(simulation, event.input);
        }

        let end = self
            .events
            .last()
            .map_or(Duration::ZERO, |event| Duration::from_millis(event.at_ms))
            + Duration::from_millis(self.settle_ms);
        records.extend(simulation.run_until(end, interval));
        records
    }
}

impl std::str::FromStr for Trace {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trace: Self = serde_json::from_str(s)?;
        ensure!(
            trace.extent.is_finite() && trace.extent > 0.,
            "extent must be positive"
        );
        ensure!(
            trace
                .events
                .windows(2)
                .all(|pair| pair[0].at_ms <= pair[1].at_ms),
            "events must be in chronological order"
        );
        Ok(trace)
    }
}

fn apply(simulation: &mut Simulation, input: Input) {
    trace!("replaying {input:?}");
    match input {
        Input::Mount => simulation.mount(),
        Input::Exit => simulation.exit(),
        Input::Press { y } => simulation.press(y),
        Input::Move { y } => simulation.pointer_move(y),
        Input::Release => simulation.release(),
        Input::Cancel => simulation.cancel(),
        Input::Scroll { offset } => simulation.scroll(offset),
        Input::Backdrop => simulation.backdrop_click(),
        Input::Resize { extent } => simulation.resize(extent),
        Input::PanelResize { height } => simulation.panel_resized(height),
        Input::Navigate { index } => {
            if !simulation.navigate(index) {
                warn!("trace navigates to a missing snap point {index}");
            }
        }
    }
}
