//! Overlay rendering
//!
//! Replays a page's strokes onto a transparent drawing surface laid over the
//! rendered PDF page. The renderer holds no state: what ends up on the surface
//! is a pure function of the strokes it is given.

use crate::config::StyleConfig;
use crate::stroke::{CanvasPoint, Color, Stroke};

/// Stroke parameters for lines and outlines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
}

/// Parameters for filled text
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: f64,
    pub family: String,
}

/// Axis-aligned rectangle with non-negative extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// Normalize a rectangle with signed extent
    ///
    /// A rectangle dragged "backwards" covers the same pixels as one dragged
    /// between the same corners the other way.
    pub fn from_signed(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x: x.min(x + w), y: y.min(y + h), width: w.abs(), height: h.abs() }
    }

    pub fn from_corners(a: CanvasPoint, b: CanvasPoint) -> Self {
        Self::from_signed(a.x, a.y, b.x - a.x, b.y - a.y)
    }
}

/// Drawing surface seam
///
/// Implemented by whatever actually paints: a canvas binding, a GPU layer, a
/// recorder, or the SVG writer. Lines are drawn with round joins and caps.
pub trait Surface {
    /// Backing pixel size
    fn size(&self) -> (u32, u32);

    /// Resize the backing store; clears the surface
    fn resize(&mut self, width: u32, height: u32);

    /// Erase everything
    fn clear(&mut self);

    /// Connected line segments through `points`
    fn stroke_polyline(&mut self, points: &[CanvasPoint], style: &LineStyle);

    /// Unfilled rectangle outline
    fn stroke_rect(&mut self, rect: NormalizedRect, style: &LineStyle);

    /// Filled text with its baseline starting at `at`
    fn fill_text(&mut self, text: &str, at: CanvasPoint, style: &TextStyle);
}

/// Paints strokes with the fixed overlay style
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    line_width: f64,
    font_size: f64,
    font_family: String,
    text_color: Color,
}

impl OverlayRenderer {
    pub fn new(style: &StyleConfig) -> Self {
        Self {
            line_width: style.line_width,
            font_size: style.font_size,
            font_family: style.font_family.clone(),
            text_color: style.text_color,
        }
    }

    fn line(&self, color: Color) -> LineStyle {
        LineStyle { color, width: self.line_width }
    }

    /// Clear the surface and replay strokes in order
    pub fn repaint(&self, surface: &mut dyn Surface, strokes: &[Stroke]) {
        surface.clear();
        for stroke in strokes {
            self.paint_stroke(surface, stroke);
        }
    }

    /// Paint one stroke over whatever is already there
    ///
    /// Text notes use the configured text color, not the color they carry.
    pub fn paint_stroke(&self, surface: &mut dyn Surface, stroke: &Stroke) {
        match stroke {
            Stroke::Pen { color, path } => {
                if path.len() >= 2 {
                    surface.stroke_polyline(path, &self.line(*color));
                }
            }
            Stroke::Rect { color, x, y, w, h } => {
                let rect = NormalizedRect::from_signed(*x, *y, *w, *h);
                surface.stroke_rect(rect, &self.line(*color));
            }
            Stroke::TextNote { x, y, value, .. } => {
                let style = TextStyle {
                    color: self.text_color,
                    size: self.font_size,
                    family: self.font_family.clone(),
                };
                surface.fill_text(value, CanvasPoint::new(*x, *y), &style);
            }
        }
    }

    /// Incremental pen segment, painted without a repaint
    pub fn paint_segment(
        &self,
        surface: &mut dyn Surface,
        from: CanvasPoint,
        to: CanvasPoint,
        color: Color,
    ) {
        surface.stroke_polyline(&[from, to], &self.line(color));
    }

    /// Full repaint followed by a live rectangle preview
    pub fn paint_preview(
        &self,
        surface: &mut dyn Surface,
        strokes: &[Stroke],
        anchor: CanvasPoint,
        current: CanvasPoint,
        color: Color,
    ) {
        self.repaint(surface, strokes);
        surface.stroke_rect(NormalizedRect::from_corners(anchor, current), &self.line(color));
    }
}

/// One recorded paint operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Polyline { points: Vec<CanvasPoint>, style: LineStyle },
    Rect { rect: NormalizedRect, style: LineStyle },
    Text { text: String, at: CanvasPoint, style: TextStyle },
}

/// Surface that records what would be painted
///
/// `clear` and `resize` drop the recorded commands, so after a repaint the
/// list holds exactly the current page's paint order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, commands: Vec::new() }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.clear();
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn stroke_polyline(&mut self, points: &[CanvasPoint], style: &LineStyle) {
        self.commands.push(DrawCommand::Polyline { points: points.to_vec(), style: *style });
    }

    fn stroke_rect(&mut self, rect: NormalizedRect, style: &LineStyle) {
        self.commands.push(DrawCommand::Rect { rect, style: *style });
    }

    fn fill_text(&mut self, text: &str, at: CanvasPoint, style: &TextStyle) {
        self.commands.push(DrawCommand::Text { text: text.to_string(), at, style: style.clone() });
    }
}
