//! SVG export surface

use crate::overlay::{LineStyle, NormalizedRect, Surface, TextStyle};
use crate::stroke::CanvasPoint;
use quick_xml::escape::escape;
use std::fmt::Write as _;

/// Surface that writes the overlay as a standalone SVG document
///
/// The document has the surface's pixel size as both its size and its
/// viewBox, so it lines up 1:1 with a page rendered at the same scale.
#[derive(Debug, Clone, Default)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    body: String,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, body: String::new() }
    }

    /// The finished SVG document
    pub fn to_svg(&self) -> String {
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" "#,
                r#"viewBox="0 0 {w} {h}">"#,
                "\n{body}</svg>\n",
            ),
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

fn paint_attrs(style: &LineStyle) -> String {
    let mut attrs = format!(
        concat!(
            r#"fill="none" stroke="{}" stroke-width="{}" "#,
            r#"stroke-linecap="round" stroke-linejoin="round""#,
        ),
        hex_rgb(style.color),
        style.width
    );
    if style.color.a != 255 {
        let _ = write!(attrs, " stroke-opacity=\"{:.3}\"", f64::from(style.color.a) / 255.0);
    }
    attrs
}

fn hex_rgb(color: crate::stroke::Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

impl Surface for SvgSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.body.clear();
    }

    fn clear(&mut self) {
        self.body.clear();
    }

    fn stroke_polyline(&mut self, points: &[CanvasPoint], style: &LineStyle) {
        let points: Vec<String> = points.iter().map(|p| format!("{},{}", p.x, p.y)).collect();
        let _ = writeln!(
            self.body,
            "  <polyline points=\"{}\" {}/>",
            points.join(" "),
            paint_attrs(style)
        );
    }

    fn stroke_rect(&mut self, rect: NormalizedRect, style: &LineStyle) {
        let _ = writeln!(
            self.body,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" {}/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            paint_attrs(style)
        );
    }

    fn fill_text(&mut self, text: &str, at: CanvasPoint, style: &TextStyle) {
        let _ = writeln!(
            self.body,
            "  <text x=\"{}\" y=\"{}\" fill=\"{}\" font-size=\"{}\" font-family=\"{}\">{}</text>",
            at.x,
            at.y,
            hex_rgb(style.color),
            style.size,
            escape(&style.family),
            escape(text)
        );
    }
}
