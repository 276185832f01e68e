//! Screen-to-canvas coordinate mapping
//!
//! The drawing surface may be displayed at a different size than its backing
//! store (CSS scaling, HiDPI). Pointer events arrive in client coordinates and
//! must be normalized into backing pixels before they are stored.

use crate::stroke::CanvasPoint;

/// Pointer position in client (screen/display) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientPoint {
    pub x: f64,
    pub y: f64,
}

impl ClientPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen bounding rectangle of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

/// Map a client point into canvas pixel space
///
/// `canvas = (client - rect.origin) * (backing / rect.size)` per axis. A
/// collapsed display axis (zero or negative extent) maps 1:1 instead of
/// dividing by zero.
pub fn map_to_canvas(
    client: ClientPoint,
    rect: DisplayRect,
    backing_width: u32,
    backing_height: u32,
) -> CanvasPoint {
    let scale_x = axis_scale(backing_width, rect.width);
    let scale_y = axis_scale(backing_height, rect.height);

    CanvasPoint::new((client.x - rect.left) * scale_x, (client.y - rect.top) * scale_y)
}

fn axis_scale(backing: u32, displayed: f64) -> f64 {
    if displayed > 0.0 && displayed.is_finite() {
        f64::from(backing) / displayed
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_unscaled() {
        let rect = DisplayRect::new(100.0, 50.0, 800.0, 600.0);
        let point = map_to_canvas(ClientPoint::new(110.0, 60.0), rect, 800, 600);
        assert_eq!(point, CanvasPoint::new(10.0, 10.0));
    }

    #[test]
    fn test_css_downscale_is_corrected() {
        // Backing store twice the displayed size
        let rect = DisplayRect::new(0.0, 0.0, 400.0, 300.0);
        let point = map_to_canvas(ClientPoint::new(100.0, 150.0), rect, 800, 600);
        assert_eq!(point, CanvasPoint::new(200.0, 300.0));
    }

    #[test]
    fn test_scale_invariance() {
        // The same logical spot on a surface displayed at k x its natural size
        // maps to the same canvas point for every k.
        let (backing_w, backing_h) = (640, 480);
        let expected = CanvasPoint::new(160.0, 120.0);

        for k in [0.5, 1.0, 1.25, 2.0, 3.0] {
            let rect = DisplayRect::new(20.0, 30.0, 640.0 * k, 480.0 * k);
            let client = ClientPoint::new(20.0 + 160.0 * k, 30.0 + 120.0 * k);
            let point = map_to_canvas(client, rect, backing_w, backing_h);

            assert!((point.x - expected.x).abs() < 1e-9, "k={k} x={}", point.x);
            assert!((point.y - expected.y).abs() < 1e-9, "k={k} y={}", point.y);
        }
    }

    #[test]
    fn test_collapsed_rect_maps_one_to_one() {
        let rect = DisplayRect::new(10.0, 10.0, 0.0, 0.0);
        let point = map_to_canvas(ClientPoint::new(15.0, 20.0), rect, 800, 600);
        assert_eq!(point, CanvasPoint::new(5.0, 10.0));
    }
}
