//! PDF markup core
//!
//! Freehand, rectangle and text annotations layered over rendered PDF pages:
//! the stroke model and store, the pointer-driven drawing machine, overlay
//! painting, local persistence and share links.

pub mod config;
pub mod coords;
pub mod drawing;
pub mod error;
pub mod overlay;
pub mod persistence;
pub mod session;
pub mod share;
pub mod store;
pub mod stroke;
pub mod svg;
pub mod tool;

pub use config::{MarkupConfig, StyleConfig, ZoomConfig};
pub use coords::{map_to_canvas, ClientPoint, DisplayRect};
pub use drawing::{DrawState, DrawingMachine, Outcome};
pub use error::{MarkupError, MarkupResult};
pub use overlay::{
    DisplayList, DrawCommand, LineStyle, NormalizedRect, OverlayRenderer, Surface, TextStyle,
};
pub use persistence::PersistenceManager;
pub use session::{Session, SessionMode};
pub use share::ShareCodec;
pub use store::{AnnotationStore, PageId};
pub use stroke::{CanvasPoint, Color, Stroke};
pub use svg::SvgSurface;
pub use tool::{Ink, Tool, UnknownTool};
