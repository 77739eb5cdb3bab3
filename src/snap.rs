//! Resting positions of the sheet and the choice between them on release.

use std::rc::Rc;

pub use sheet_motion_config::SnapPoint;

use crate::reactive::ReactiveCell;

/// Release velocity, in pixels per sample, below which the gesture counts as stationary.
pub const STATIONARY_THRESHOLD: f64 = 2.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    /// Index into the points as given by the caller.
    pub index: usize,
    /// Visible extent of the sheet at that point, in pixels.
    pub position: f64,
}

/// Picks the snap point a released sheet should settle at.
///
/// `offset` is the distance of the sheet's leading edge from the open edge of a container of
/// `extent` pixels, and `velocity` is negative when moving toward open. The sheet settles at one
/// of the two points bracketing its current position: the nearer one when the release is
/// stationary, otherwise the one in the direction of travel. Below the most closed point sits an
/// implicit dismiss point at zero visible pixels; choosing it returns `None`.
pub fn resolve_snap_point(
    points: &[SnapPoint],
    offset: f64,
    velocity: f64,
    extent: f64,
    threshold: f64,
) -> Option<SnapTarget> {
    let sorted = sorted_pixels(points, extent);
    let &(_, most_open) = sorted.last()?;
    let from_closed = extent - offset;

    // `None` is the dismiss point.
    let mut lower = None;
    let mut lower_dist = from_closed;
    let mut upper = sorted.len() - 1;
    let mut upper_dist = from_closed - most_open;

    // Past the most open point both brackets are that point.
    for (i, &(_, px)) in sorted.iter().enumerate() {
        let dist = from_closed - px;
        if dist < 0. {
            upper = i;
            upper_dist = dist;
            break;
        }
        lower = Some(i);
        lower_dist = dist;
    }

    let chosen = if velocity.abs() < threshold {
        // Ties go to the more open point.
        if lower_dist.abs() < upper_dist.abs() {
            lower
        } else {
            Some(upper)
        }
    } else if velocity < 0. {
        Some(upper)
    } else {
        lower
    };

    let target = chosen.map(|i| {
        let (index, position) = sorted[i];
        SnapTarget { index, position }
    });
    trace!(
        "resolved offset {offset} velocity {velocity} within {extent}px to {:?}",
        target.map(|t| t.index)
    );
    target
}

/// Pairs of (original index, visible pixels), most closed first.
fn sorted_pixels(points: &[SnapPoint], extent: f64) -> Vec<(usize, f64)> {
    let mut sorted: Vec<_> = points
        .iter()
        .map(|point| point.to_pixels(extent))
        .enumerate()
        .collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
    sorted
}

/// The configured snap points together with the one the sheet currently rests at.
#[derive(Debug, Clone)]
pub struct SnapControl {
    points: Rc<[SnapPoint]>,
    current: ReactiveCell<usize>,
}

impl SnapControl {
    /// Creates the control; an out of bounds `initial_index` falls back to 0.
    pub fn new(points: impl Into<Rc<[SnapPoint]>>, initial_index: usize) -> Self {
        let points = points.into();
        let initial_index = if initial_index < points.len() {
            initial_index
        } else {
            0
        };

        Self {
            points,
            current: ReactiveCell::new(initial_index),
        }
    }

    pub fn points(&self) -> &[SnapPoint] {
        &self.points
    }

    pub fn current_index(&self) -> usize {
        self.current.get()
    }

    pub fn current_point(&self) -> Option<SnapPoint> {
        self.points.get(self.current_index()).copied()
    }

    /// Cell notified on every navigation, including to the current index.
    pub fn index(&self) -> &ReactiveCell<usize> {
        &self.current
    }

    /// Moves to `index` and re-applies it even if it did not change.
    ///
    /// Returns `false` and does nothing if the index is out of bounds.
    pub fn navigate(&self, index: usize) -> bool {
        if index >= self.points.len() {
            warn!(
                "ignoring navigation to snap point {index}, only {} exist",
                self.points.len()
            );
            return false;
        }

        debug!("navigating to snap point {index}");
        self.current.set_forced(index);
        true
    }

    /// Offset from the open edge at which the sheet rests at `index`.
    pub fn offset_of(&self, index: usize, extent: f64) -> Option<f64> {
        let point = self.points.get(index)?;
        Some(extent - point.to_pixels(extent))
    }

    pub fn current_offset(&self, extent: f64) -> Option<f64> {
        self.offset_of(self.current_index(), extent)
    }

    pub fn most_closed_index(&self, extent: f64) -> Option<usize> {
        sorted_pixels(&self.points, extent).first().map(|&(i, _)| i)
    }

    pub fn most_open_index(&self, extent: f64) -> Option<usize> {
        sorted_pixels(&self.points, extent).last().map(|&(i, _)| i)
    }

    pub fn is_at_most_closed(&self, extent: f64) -> bool {
        self.most_closed_index(extent) == Some(self.current_index())
    }

    pub fn is_at_most_open(&self, extent: f64) -> bool {
        self.most_open_index(extent) == Some(self.current_index())
    }

    pub fn resolve(
        &self,
        offset: f64,
        velocity: f64,
        extent: f64,
        threshold: f64,
    ) -> Option<SnapTarget> {
        resolve_snap_point(&self.points, offset, velocity, extent, threshold)
    }
}
