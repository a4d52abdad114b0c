//! Per-stroke drawing session: IDLE → DRAWING → IDLE, plus TEXT_PENDING for
//! the text tool.

use crate::model::{Point, Tool};

/// Minimum number of points for a stroke to be committed.
pub const MIN_STROKE_POINTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Drawing {
        points: Vec<Point>,
    },
    TextPending {
        anchor: Point,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    state: SessionState,
}

impl DrawingSession {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, SessionState::Drawing { .. })
    }

    /// Points of the in-progress stroke, if one is active.
    pub fn live_points(&self) -> Option<&[Point]> {
        match &self.state {
            SessionState::Drawing { points } => Some(points),
            _ => None,
        }
    }

    pub fn text_anchor(&self) -> Option<Point> {
        match self.state {
            SessionState::TextPending { anchor } => Some(anchor),
            _ => None,
        }
    }

    /// Starts a stroke or opens (or re-anchors) a pending text entry.
    pub fn pointer_down(&mut self, tool: Tool, at: Point) {
        self.state = if tool.is_stroke() {
            SessionState::Drawing { points: vec![at] }
        } else {
            SessionState::TextPending { anchor: at }
        };
    }

    /// Appends to the active stroke. Returns whether a point was added.
    pub fn pointer_move(&mut self, at: Point) -> bool {
        match &mut self.state {
            SessionState::Drawing { points } => {
                points.push(at);
                true
            }
            _ => false,
        }
    }

    /// Ends the active stroke (pointer-up or pointer-leave). Returns the points
    /// to commit, or `None` when nothing was drawing or the stroke was too short.
    pub fn finish_stroke(&mut self) -> Option<Vec<Point>> {
        if !self.is_drawing() {
            return None;
        }
        match std::mem::take(&mut self.state) {
            SessionState::Drawing { points } if points.len() >= MIN_STROKE_POINTS => Some(points),
            _ => None,
        }
    }

    /// Closes the pending text entry, returning its anchor.
    pub fn take_text_anchor(&mut self) -> Option<Point> {
        let anchor = self.text_anchor()?;
        self.state = SessionState::Idle;
        Some(anchor)
    }
}
