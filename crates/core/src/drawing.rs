//! Pointer-driven drawing state machine
//!
//! Turns pointer and text-entry events into committed strokes under the armed
//! tool. The machine never touches the store or a surface itself; each event
//! returns an [`Outcome`] that the session applies.

use crate::stroke::{CanvasPoint, Color, Stroke};
use crate::tool::{Ink, Tool};

/// Gesture in progress
#[derive(Debug, Clone, PartialEq)]
pub enum DrawState {
    /// No active gesture
    Idle,

    /// Pen path accumulating
    DrawingPen { ink: Ink, path: Vec<CanvasPoint> },

    /// Rectangle anchored, live preview to `current`
    DrawingRect { ink: Ink, anchor: CanvasPoint, current: CanvasPoint },

    /// Text entry open at `anchor`; nothing stored yet
    EditingText { anchor: CanvasPoint },
}

/// What the host has to do after an event
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Event did not apply in the current state
    Ignored,

    /// A pen gesture started; nothing to paint yet
    Started,

    /// Paint just this segment on top of the surface
    Segment { from: CanvasPoint, to: CanvasPoint, color: Color },

    /// Repaint committed strokes, then the preview rectangle
    Preview { anchor: CanvasPoint, current: CanvasPoint, color: Color },

    /// Show a text entry surface at this point
    OpenTextEntry { at: CanvasPoint },

    /// Gesture finished; append this stroke
    Commit(Stroke),

    /// Gesture or text entry ended without a stroke
    Discarded,
}

#[derive(Debug, Clone)]
pub struct DrawingMachine {
    tool: Tool,
    state: DrawState,
    text_color: Color,
}

impl DrawingMachine {
    pub fn new(text_color: Color) -> Self {
        Self { tool: Tool::None, state: DrawState::Idle, text_color }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DrawState::Idle
    }

    /// Arm a tool
    ///
    /// Abandons any gesture or text entry in progress without committing it.
    /// A painted preview stays on the surface until the next full repaint.
    pub fn set_tool(&mut self, tool: Tool) -> Outcome {
        self.tool = tool;
        self.abandon()
    }

    /// Disarm the current tool
    pub fn disarm(&mut self) -> Outcome {
        self.set_tool(Tool::None)
    }

    pub fn pointer_down(&mut self, point: CanvasPoint) -> Outcome {
        if self.state != DrawState::Idle {
            return Outcome::Ignored;
        }

        match self.tool {
            Tool::None => Outcome::Ignored,
            Tool::Pen(ink) => {
                self.state = DrawState::DrawingPen { ink, path: vec![point] };
                Outcome::Started
            }
            Tool::Rect(ink) => {
                self.state = DrawState::DrawingRect { ink, anchor: point, current: point };
                Outcome::Started
            }
            Tool::Text => {
                self.state = DrawState::EditingText { anchor: point };
                Outcome::OpenTextEntry { at: point }
            }
        }
    }

    pub fn pointer_move(&mut self, point: CanvasPoint) -> Outcome {
        match &mut self.state {
            DrawState::DrawingPen { ink, path } => {
                let Some(&from) = path.last() else {
                    return Outcome::Ignored;
                };
                path.push(point);
                Outcome::Segment { from, to: point, color: ink.color() }
            }
            DrawState::DrawingRect { ink, anchor, current } => {
                *current = point;
                Outcome::Preview { anchor: *anchor, current: point, color: ink.color() }
            }
            DrawState::Idle | DrawState::EditingText { .. } => Outcome::Ignored,
        }
    }

    /// Pointer released over the surface
    ///
    /// Pen strokes end at their last moved-to point; rectangles span from the
    /// anchor to the release point with signed, unnormalized extent.
    pub fn pointer_up(&mut self, point: CanvasPoint) -> Outcome {
        match &self.state {
            DrawState::DrawingPen { .. } => self.finish_pen(),
            DrawState::DrawingRect { ink, anchor, .. } => {
                let stroke = Stroke::Rect {
                    color: ink.color(),
                    x: anchor.x,
                    y: anchor.y,
                    w: point.x - anchor.x,
                    h: point.y - anchor.y,
                };
                self.state = DrawState::Idle;
                Outcome::Commit(stroke)
            }
            DrawState::Idle | DrawState::EditingText { .. } => Outcome::Ignored,
        }
    }

    /// Pointer left the surface
    ///
    /// Finishes a pen stroke. Rectangle drags keep going because the host
    /// still delivers the captured release.
    pub fn pointer_leave(&mut self) -> Outcome {
        match self.state {
            DrawState::DrawingPen { .. } => self.finish_pen(),
            _ => Outcome::Ignored,
        }
    }

    /// Text entry confirmed or blurred
    ///
    /// Whitespace-only text is discarded.
    pub fn commit_text(&mut self, text: &str) -> Outcome {
        let DrawState::EditingText { anchor } = self.state else {
            return Outcome::Ignored;
        };
        self.state = DrawState::Idle;

        let value = text.trim();
        if value.is_empty() {
            return Outcome::Discarded;
        }

        Outcome::Commit(Stroke::TextNote {
            color: self.text_color,
            x: anchor.x,
            y: anchor.y,
            value: value.to_string(),
        })
    }

    /// Text entry cancelled
    pub fn cancel_text(&mut self) -> Outcome {
        match self.state {
            DrawState::EditingText { .. } => {
                self.state = DrawState::Idle;
                Outcome::Discarded
            }
            _ => Outcome::Ignored,
        }
    }

    fn finish_pen(&mut self) -> Outcome {
        match std::mem::replace(&mut self.state, DrawState::Idle) {
            DrawState::DrawingPen { ink, path } if !path.is_empty() => {
                Outcome::Commit(Stroke::Pen { color: ink.color(), path })
            }
            _ => Outcome::Discarded,
        }
    }

    /// Drop any gesture or text entry in progress, keeping the armed tool
    pub fn abandon(&mut self) -> Outcome {
        match std::mem::replace(&mut self.state, DrawState::Idle) {
            DrawState::Idle => Outcome::Ignored,
            _ => Outcome::Discarded,
        }
    }
}
