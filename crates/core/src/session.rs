//! Annotation session
//!
//! One [`Session`] exists per open document. It owns the engine handle, the
//! page and zoom position, the store, the drawing machine and persistence,
//! and is the only place where their effects are sequenced:
//!
//! - a committed stroke is appended, the page is repainted, then a save is
//!   requested
//! - a page render resizes the overlay surface to the rendered raster before
//!   the overlay is painted on top
//! - a share link replaces the store and switches to [`SessionMode::Shared`],
//!   where nothing is written back to local storage
//!
//! All handlers are synchronous. Timers are driven by the host through
//! [`Session::tick`] with an explicit `now`.

use crate::config::{MarkupConfig, ZoomConfig};
use crate::coords::{map_to_canvas, ClientPoint, DisplayRect};
use crate::drawing::{DrawState, DrawingMachine, Outcome};
use crate::error::{MarkupError, MarkupResult};
use crate::overlay::{OverlayRenderer, Surface};
use crate::persistence::PersistenceManager;
use crate::share::ShareCodec;
use crate::store::{AnnotationStore, PageId};
use crate::stroke::{CanvasPoint, Stroke};
use crate::tool::Tool;
use pdf_markup_engine::{
    DocumentHandle, OpenSource, PdfEngine, PdfEngineError, RenderRequest, RgbaImage,
};
use pdf_markup_storage::LocalStorage;
use std::path::Path;
use std::time::Instant;
use url::Url;

/// Where the in-memory store came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// The user's own annotations; edits are saved locally
    #[default]
    Local,

    /// Annotations loaded from a share link; edits stay in memory
    Shared,
}

pub struct Session<E: PdfEngine, S: LocalStorage> {
    engine: E,
    document: DocumentHandle,
    page_count: u32,
    page: PageId,
    scale: f32,
    zoom: ZoomConfig,

    store: AnnotationStore,
    machine: DrawingMachine,
    mode: SessionMode,

    persistence: PersistenceManager<S>,
    codec: ShareCodec,
    renderer: OverlayRenderer,
}

impl<E: PdfEngine, S: LocalStorage> Session<E, S> {
    /// Open a document and load its annotations
    ///
    /// A share link in `fragment` wins over local storage. Failing to open
    /// the document is the only fatal error.
    pub fn boot(
        mut engine: E,
        source: OpenSource,
        storage: S,
        config: MarkupConfig,
        fragment: &str,
    ) -> MarkupResult<Self> {
        config.validate()?;

        let document = engine.open(source)?;
        let page_count = engine.page_count(document)?;
        if page_count == 0 {
            return Err(MarkupError::Engine(PdfEngineError::Backend(
                "document has no pages".to_string(),
            )));
        }

        let codec = ShareCodec::from_config(&config)?;
        let persistence = PersistenceManager::new(storage, &config);

        let mut store = AnnotationStore::new();
        let mode = match codec.decode(fragment) {
            Some(shared) => {
                store.replace_with(shared);
                SessionMode::Shared
            }
            None => {
                persistence.load(&mut store);
                SessionMode::Local
            }
        };

        tracing::info!(
            pages = page_count,
            strokes = store.stroke_count(),
            mode = ?mode,
            "annotation session started"
        );

        Ok(Self {
            engine,
            document,
            page_count,
            page: PageId::FIRST,
            scale: config.zoom.initial,
            zoom: config.zoom.clone(),
            store,
            machine: DrawingMachine::new(config.style.text_color),
            mode,
            persistence,
            codec,
            renderer: OverlayRenderer::new(&config.style),
        })
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn tool(&self) -> Tool {
        self.machine.tool()
    }

    pub fn drawing_state(&self) -> &DrawState {
        self.machine.state()
    }

    pub fn persistence(&self) -> &PersistenceManager<S> {
        &self.persistence
    }

    /// Strokes of the current page
    pub fn current_strokes(&self) -> &[Stroke] {
        self.store.page(self.page)
    }

    // ---- navigation ----

    /// Move to a page, clamped to the document
    ///
    /// Returns `true` if the page changed. The host re-renders afterwards.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        let target = page.clamp(1, self.page_count);
        if target == self.page.get() {
            return false;
        }
        // A gesture must never commit onto a different page than it started on
        self.machine.abandon();
        self.page = PageId::new(target).unwrap_or(PageId::FIRST);
        tracing::debug!(page = target, "page changed");
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page.get().saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.page.get().saturating_sub(1))
    }

    /// Set the zoom scale, clamped to the configured range
    ///
    /// Stored strokes are not rescaled.
    pub fn set_scale(&mut self, scale: f32) -> bool {
        let clamped =
            if scale.is_finite() { scale.clamp(self.zoom.min, self.zoom.max) } else { self.scale };
        // Keep repeated steps from drifting
        let rounded = (clamped * 10_000.0).round() / 10_000.0;
        if rounded == self.scale {
            return false;
        }
        self.machine.abandon();
        self.scale = rounded;
        tracing::debug!(scale = rounded, "zoom changed");
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_scale(self.scale + self.zoom.step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_scale(self.scale - self.zoom.step)
    }

    /// Render the current page and repaint the overlay over it
    ///
    /// The surface is resized to the raster's pixel size before anything is
    /// painted, so overlay and page always line up. The raster is returned
    /// for the host to display underneath.
    pub fn render_current_page(&mut self, surface: &mut dyn Surface) -> MarkupResult<RgbaImage> {
        let request = RenderRequest { page: self.page.get(), scale: self.scale };
        let raster = self.engine.render_page(self.document, request)?;

        surface.resize(raster.width(), raster.height());
        self.repaint(surface);
        Ok(raster)
    }

    /// Clear and replay the current page's strokes
    pub fn repaint(&self, surface: &mut dyn Surface) {
        self.renderer.repaint(surface, self.store.page(self.page));
    }

    // ---- tools and pointer input ----

    pub fn set_tool(&mut self, tool: Tool) -> Outcome {
        self.machine.set_tool(tool)
    }

    pub fn disarm(&mut self) -> Outcome {
        self.machine.disarm()
    }

    fn to_canvas(client: ClientPoint, rect: DisplayRect, surface: &dyn Surface) -> CanvasPoint {
        let (width, height) = surface.size();
        map_to_canvas(client, rect, width, height)
    }

    pub fn pointer_down(
        &mut self,
        client: ClientPoint,
        rect: DisplayRect,
        surface: &mut dyn Surface,
        now: Instant,
    ) -> Outcome {
        let point = Self::to_canvas(client, rect, surface);
        let outcome = self.machine.pointer_down(point);
        self.apply(outcome, surface, now)
    }

    pub fn pointer_move(
        &mut self,
        client: ClientPoint,
        rect: DisplayRect,
        surface: &mut dyn Surface,
        now: Instant,
    ) -> Outcome {
        let point = Self::to_canvas(client, rect, surface);
        let outcome = self.machine.pointer_move(point);
        self.apply(outcome, surface, now)
    }

    pub fn pointer_up(
        &mut self,
        client: ClientPoint,
        rect: DisplayRect,
        surface: &mut dyn Surface,
        now: Instant,
    ) -> Outcome {
        let point = Self::to_canvas(client, rect, surface);
        let outcome = self.machine.pointer_up(point);
        self.apply(outcome, surface, now)
    }

    pub fn pointer_leave(&mut self, surface: &mut dyn Surface, now: Instant) -> Outcome {
        let outcome = self.machine.pointer_leave();
        self.apply(outcome, surface, now)
    }

    /// Text entry confirmed or blurred
    pub fn commit_text(&mut self, text: &str, surface: &mut dyn Surface, now: Instant) -> Outcome {
        let outcome = self.machine.commit_text(text);
        self.apply(outcome, surface, now)
    }

    pub fn cancel_text(&mut self) -> Outcome {
        self.machine.cancel_text()
    }

    fn apply(&mut self, outcome: Outcome, surface: &mut dyn Surface, now: Instant) -> Outcome {
        match &outcome {
            Outcome::Segment { from, to, color } => {
                self.renderer.paint_segment(surface, *from, *to, *color);
            }
            Outcome::Preview { anchor, current, color } => {
                self.renderer.paint_preview(
                    surface,
                    self.store.page(self.page),
                    *anchor,
                    *current,
                    *color,
                );
            }
            Outcome::Commit(stroke) => {
                tracing::debug!(page = %self.page, kind = stroke.kind(), "stroke committed");
                self.store.append(self.page, stroke.clone());
                self.repaint(surface);
                self.persistence.request_save(now, self.mode);
            }
            Outcome::Ignored
            | Outcome::Started
            | Outcome::OpenTextEntry { .. }
            | Outcome::Discarded => {}
        }
        outcome
    }

    // ---- page edits ----

    /// Remove the current page's most recent stroke
    pub fn undo(&mut self, surface: &mut dyn Surface, now: Instant) -> Option<Stroke> {
        let removed = self.store.pop_last(self.page)?;
        self.repaint(surface);
        self.persistence.request_save(now, self.mode);
        Some(removed)
    }

    /// Remove every stroke on the current page
    pub fn clear_page(&mut self, surface: &mut dyn Surface, now: Instant) {
        self.store.clear(self.page);
        self.repaint(surface);
        self.persistence.request_save(now, self.mode);
    }

    // ---- import, export, sharing ----

    /// Pretty JSON of the whole store
    pub fn export_json(&self) -> MarkupResult<String> {
        self.store.to_json_pretty()
    }

    pub fn export_to_file(&self, path: &Path) -> MarkupResult<()> {
        std::fs::write(path, self.export_json()?)?;
        tracing::info!(path = %path.display(), "exported annotations");
        Ok(())
    }

    /// Replace the whole store with imported JSON
    ///
    /// Never merges. Invalid input is logged and returned as an error with the
    /// store left untouched. The session mode is kept, so an import while
    /// viewing a share link is not saved locally.
    pub fn import_json(
        &mut self,
        text: &str,
        surface: &mut dyn Surface,
        now: Instant,
    ) -> MarkupResult<()> {
        let imported = AnnotationStore::from_json(text).inspect_err(|err| {
            tracing::warn!(error = %err, "rejected annotation import");
        })?;

        self.machine.abandon();
        tracing::info!(strokes = imported.stroke_count(), "imported annotations");
        self.store.replace_with(imported);
        self.repaint(surface);
        self.persistence.request_save(now, self.mode);
        Ok(())
    }

    /// Link to `base` carrying the current store
    pub fn share_url(&self, base: &Url) -> MarkupResult<Url> {
        self.codec.share_url(base, &self.store)
    }

    /// Reconcile with a changed URL fragment
    ///
    /// A decodable share payload replaces the store and enters shared mode.
    /// Losing it while shared falls back to the local annotations.
    pub fn on_fragment_change(&mut self, fragment: &str, surface: &mut dyn Surface) -> SessionMode {
        match self.codec.decode(fragment) {
            Some(shared) => {
                if self.mode == SessionMode::Local {
                    // Local edits still waiting for their save go out before
                    // the store is swapped
                    self.persistence.flush(&self.store, self.mode);
                }
                self.persistence.cancel_pending();
                self.store.replace_with(shared);
                self.mode = SessionMode::Shared;
                let strokes = self.store.stroke_count();
                tracing::info!(strokes, "switched to shared annotations");
            }
            None if self.mode == SessionMode::Shared => {
                self.store = AnnotationStore::new();
                self.persistence.load(&mut self.store);
                self.mode = SessionMode::Local;
                let strokes = self.store.stroke_count();
                tracing::info!(strokes, "switched back to local annotations");
            }
            None => return self.mode,
        }

        self.machine.abandon();
        self.repaint(surface);
        self.mode
    }

    // ---- lifecycle ----

    /// When the host should call [`Self::tick`] next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.persistence.deadline()
    }

    /// Run due timers; returns `true` if a save was written
    pub fn tick(&mut self, now: Instant) -> bool {
        self.persistence.poll(now, &self.store, self.mode)
    }

    /// Flush pending saves and close the document
    pub fn shutdown(mut self) -> MarkupResult<S> {
        self.persistence.flush(&self.store, self.mode);
        self.engine.close(self.document)?;
        tracing::debug!("annotation session closed");
        Ok(self.persistence.into_storage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{DisplayList, DrawCommand};
    use crate::stroke::Color;
    use crate::tool::Ink;
    use pdf_markup_engine::PageSize;
    use pdf_markup_storage::MemoryStorage;
    use std::time::Duration;

    /// Engine with fixed page sizes and blank rasters
    struct FakeEngine {
        pages: Vec<PageSize>,
        fail_open: bool,
    }

    impl FakeEngine {
        fn with_pages(count: usize) -> Self {
            let page = PageSize { width_pt: 200.0, height_pt: 100.0 };
            Self { pages: vec![page; count], fail_open: false }
        }
    }

    impl PdfEngine for FakeEngine {
        fn open(&mut self, _source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
            if self.fail_open {
                return Err(PdfEngineError::Backend("engine unavailable".to_string()));
            }
            Ok(DocumentHandle::from_raw(7))
        }

        fn page_count(&self, _handle: DocumentHandle) -> Result<u32, PdfEngineError> {
            Ok(self.pages.len() as u32)
        }

        fn page_size(
            &self,
            _handle: DocumentHandle,
            page: u32,
        ) -> Result<PageSize, PdfEngineError> {
            let page_count = self.pages.len() as u32;
            page.checked_sub(1)
                .and_then(|index| self.pages.get(index as usize))
                .copied()
                .ok_or(PdfEngineError::PageOutOfRange { page, page_count })
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            request: RenderRequest,
        ) -> Result<RgbaImage, PdfEngineError> {
            let (width, height) = self.page_size(handle, request.page)?.pixel_size(request.scale);
            Ok(RgbaImage::new(width, height))
        }

        fn close(&mut self, _handle: DocumentHandle) -> Result<(), PdfEngineError> {
            Ok(())
        }
    }

    type TestSession = Session<FakeEngine, MemoryStorage>;

    fn boot_with(storage: MemoryStorage, fragment: &str) -> TestSession {
        Session::boot(
            FakeEngine::with_pages(3),
            OpenSource::Bytes(Vec::new()),
            storage,
            MarkupConfig::default(),
            fragment,
        )
        .unwrap()
    }

    fn boot() -> TestSession {
        boot_with(MemoryStorage::new(), "")
    }

    /// Display rect matching the surface 1:1
    fn rect_for(surface: &DisplayList) -> DisplayRect {
        let (width, height) = surface.size();
        DisplayRect::new(0.0, 0.0, f64::from(width), f64::from(height))
    }

    fn draw_pen(
        session: &mut TestSession,
        surface: &mut DisplayList,
        points: &[(f64, f64)],
        now: Instant,
    ) {
        let rect = rect_for(surface);
        let (first, rest) = points.split_first().unwrap();
        session.pointer_down(ClientPoint::new(first.0, first.1), rect, surface, now);
        for (x, y) in rest {
            session.pointer_move(ClientPoint::new(*x, *y), rect, surface, now);
        }
        let (x, y) = *points.last().unwrap();
        session.pointer_up(ClientPoint::new(x, y), rect, surface, now);
    }

    fn stored(storage: &MemoryStorage) -> Option<String> {
        storage.get_item("eplan_ann").unwrap()
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_boot_fails_without_engine() {
        let mut engine = FakeEngine::with_pages(1);
        engine.fail_open = true;

        let result = Session::boot(
            engine,
            OpenSource::Bytes(Vec::new()),
            MemoryStorage::new(),
            MarkupConfig::default(),
            "",
        );
        assert!(matches!(result, Err(MarkupError::Engine(_))));
    }

    #[test]
    fn test_boot_rejects_empty_document() {
        let result = Session::boot(
            FakeEngine::with_pages(0),
            OpenSource::Bytes(Vec::new()),
            MemoryStorage::new(),
            MarkupConfig::default(),
            "",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_render_sizes_surface_to_page() {
        let mut session = boot();
        let mut surface = DisplayList::new(1, 1);

        let raster = session.render_current_page(&mut surface).unwrap();
        assert_eq!((raster.width(), raster.height()), (240, 120));
        assert_eq!(surface.size(), (240, 120));
    }

    #[test]
    fn test_pen_stroke_commits_and_saves_after_quiet_period() {
        let mut session = boot();
        let mut surface = DisplayList::new(1, 1);
        session.render_current_page(&mut surface).unwrap();
        session.set_tool(Tool::Pen(Ink::Red));

        let start = Instant::now();
        draw_pen(&mut session, &mut surface, &[(10.0, 10.0), (20.0, 10.0)], start);

        assert_eq!(
            session.current_strokes(),
            &[Stroke::Pen {
                color: Color::RED,
                path: vec![CanvasPoint::new(10.0, 10.0), CanvasPoint::new(20.0, 10.0)],
            }]
        );
        assert_eq!(surface.commands().len(), 1);

        assert!(!session.tick(start + ms(199)));
        assert_eq!(session.next_deadline(), Some(start + ms(200)));
        assert!(session.tick(start + ms(200)));

        let storage = session.shutdown().unwrap();
        let saved = AnnotationStore::from_json(&stored(&storage).unwrap()).unwrap();
        assert_eq!(saved.page(PageId::FIRST).len(), 1);
    }

    #[test]
    fn test_pointer_input_is_mapped_through_display_scale() {
        let mut session = boot();
        let mut surface = DisplayList::new(1, 1);
        session.render_current_page(&mut surface).unwrap();
        session.set_tool(Tool::Rect(Ink::Yellow));

        // Surface is 240x120 backing pixels shown at half size, offset by (100, 50)
        let rect = DisplayRect::new(100.0, 50.0, 120.0, 60.0);
        let now = Instant::now();
        session.pointer_down(ClientPoint::new(125.0, 75.0), rect, &mut surface, now);
        let outcome = session.pointer_up(ClientPoint::new(110.0, 60.0), rect, &mut surface, now);

        assert_eq!(
            outcome,
            Outcome::Commit(Stroke::Rect {
                color: Color::YELLOW,
                x: 50.0,
                y: 50.0,
                w: -30.0,
                h: -30.0,
            })
        );
    }

    #[test]
    fn test_rect_preview_repaints_committed_strokes() {
        let mut session = boot();
        let mut surface = DisplayList::new(1, 1);
        session.render_current_page(&mut surface).unwrap();
        let now = Instant::now();

        session.set_tool(Tool::Pen(Ink::Yellow));
        draw_pen(&mut session, &mut surface, &[(1.0, 1.0), (5.0, 5.0)], now);

        session.set_tool(Tool::Rect(Ink::Red));
        let rect = rect_for(&surface);
        session.pointer_down(ClientPoint::new(10.0, 10.0), rect, &mut surface, now);
        session.pointer_move(ClientPoint::new(20.0, 20.0), rect, &mut surface, now);
        session.pointer_move(ClientPoint::new(30.0, 30.0), rect, &mut surface, now);

        let commands = surface.commands();
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], DrawCommand::Polyline { .. }));
        assert!(matches!(commands[1], DrawCommand::Rect { rect, .. } if rect.width == 20.0));
    }

    #[test]
    fn test_undo_and_clear() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let now = Instant::now();
        session.set_tool(Tool::Pen(Ink::Red));

        for offset in [0.0, 10.0, 20.0] {
            draw_pen(&mut session, &mut surface, &[(offset, 0.0), (offset, 5.0)], now);
        }
        let removed = session.undo(&mut surface, now).unwrap();

        assert!(matches!(removed, Stroke::Pen { ref path, .. } if path[0].x == 20.0));
        assert_eq!(session.current_strokes().len(), 2);

        session.clear_page(&mut surface, now);
        session.clear_page(&mut surface, now);
        assert!(session.current_strokes().is_empty());
        assert!(surface.commands().is_empty());
        assert_eq!(session.undo(&mut surface, now), None);
    }

    #[test]
    fn test_navigation_is_clamped_and_strokes_stay_per_page() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let now = Instant::now();

        assert!(!session.prev_page());
        assert!(session.go_to_page(99));
        assert_eq!(session.page().get(), 3);
        assert!(!session.next_page());

        session.set_tool(Tool::Pen(Ink::Red));
        draw_pen(&mut session, &mut surface, &[(1.0, 1.0), (2.0, 2.0)], now);
        assert!(session.prev_page());

        assert!(session.current_strokes().is_empty());
        assert_eq!(session.store().page(PageId::new(3).unwrap()).len(), 1);
    }

    #[test]
    fn test_page_change_abandons_gesture() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let rect = rect_for(&surface);
        let now = Instant::now();
        session.set_tool(Tool::Pen(Ink::Red));

        session.pointer_down(ClientPoint::new(1.0, 1.0), rect, &mut surface, now);
        session.next_page();
        let outcome = session.pointer_up(ClientPoint::new(2.0, 2.0), rect, &mut surface, now);

        assert_eq!(outcome, Outcome::Ignored);
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut session = boot();
        assert_eq!(session.scale(), 1.2);

        assert!(session.zoom_in());
        assert_eq!(session.scale(), 1.3);

        for _ in 0..50 {
            session.zoom_in();
        }
        assert_eq!(session.scale(), 3.0);
        assert!(!session.zoom_in());

        for _ in 0..50 {
            session.zoom_out();
        }
        assert_eq!(session.scale(), 0.4);
        assert!(!session.set_scale(f32::NAN));
    }

    #[test]
    fn test_text_note_commit() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let rect = rect_for(&surface);
        let now = Instant::now();
        session.set_tool(Tool::Text);

        let outcome = session.pointer_down(ClientPoint::new(4.0, 8.0), rect, &mut surface, now);
        assert_eq!(outcome, Outcome::OpenTextEntry { at: CanvasPoint::new(4.0, 8.0) });

        session.commit_text(" note ", &mut surface, now);
        assert_eq!(
            session.current_strokes(),
            &[Stroke::TextNote { color: Color::RED, x: 4.0, y: 8.0, value: "note".into() }]
        );
        assert!(matches!(&surface.commands()[0], DrawCommand::Text { text, .. } if text == "note"));
    }

    #[test]
    fn test_import_replaces_and_does_not_merge() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let now = Instant::now();
        session.set_tool(Tool::Pen(Ink::Red));
        draw_pen(&mut session, &mut surface, &[(1.0, 1.0), (2.0, 2.0)], now);
        draw_pen(&mut session, &mut surface, &[(3.0, 3.0), (4.0, 4.0)], now);

        let text = r##"{"2":[{"type":"rect","color":"#ffcc00","x":1,"y":1,"w":2,"h":2}]}"##;
        session.import_json(text, &mut surface, now).unwrap();

        assert!(session.store().page(PageId::FIRST).is_empty());
        assert_eq!(session.store().page(PageId::new(2).unwrap()).len(), 1);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn test_malformed_import_leaves_store_untouched() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let now = Instant::now();
        session.set_tool(Tool::Pen(Ink::Red));
        draw_pen(&mut session, &mut surface, &[(1.0, 1.0), (2.0, 2.0)], now);
        let before = session.store().clone();

        for text in ["not json", "[]", "42", r#"{"0": []}"#] {
            assert!(session.import_json(text, &mut surface, now).is_err(), "accepted {text}");
            assert_eq!(session.store(), &before);
        }
    }

    #[test]
    fn test_export_round_trips_through_import() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let now = Instant::now();
        session.set_tool(Tool::Rect(Ink::Yellow));
        let rect = rect_for(&surface);
        session.pointer_down(ClientPoint::new(50.0, 50.0), rect, &mut surface, now);
        session.pointer_up(ClientPoint::new(30.0, 20.0), rect, &mut surface, now);

        let exported = session.export_json().unwrap();
        let mut other = boot();
        other.import_json(&exported, &mut surface, now).unwrap();
        assert_eq!(other.store(), session.store());

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("annotations.json");
        session.export_to_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), exported);
    }

    #[test]
    fn test_shared_mode_does_not_overwrite_local() {
        let mut local = MemoryStorage::new();
        local.set_item("eplan_ann", r##"{"1": [{"path": [[0, 0], [1, 1]]}]}"##).unwrap();

        // Build a link carrying a different set
        let mut shared_store = AnnotationStore::new();
        let rect = Stroke::Rect { color: Color::RED, x: 0.0, y: 0.0, w: 5.0, h: 5.0 };
        shared_store.append(PageId::new(2).unwrap(), rect);
        let codec = ShareCodec::from_config(&MarkupConfig::default()).unwrap();
        let fragment = format!("#ann={}", codec.encode(&shared_store).unwrap());

        let mut session = boot_with(local, &fragment);
        assert_eq!(session.mode(), SessionMode::Shared);
        assert_eq!(session.store(), &shared_store);

        let mut surface = DisplayList::new(100, 100);
        let start = Instant::now();
        session.set_tool(Tool::Pen(Ink::Yellow));
        draw_pen(&mut session, &mut surface, &[(5.0, 5.0), (6.0, 6.0)], start);
        session.clear_page(&mut surface, start);
        assert!(!session.tick(start + ms(1000)));

        let storage = session.shutdown().unwrap();
        assert_eq!(stored(&storage).as_deref(), Some(r##"{"1": [{"path": [[0, 0], [1, 1]]}]}"##));
    }

    #[test]
    fn test_malformed_link_falls_back_to_local() {
        let mut local = MemoryStorage::new();
        local.set_item("eplan_ann", r##"{"1": [{"path": [[0, 0], [1, 1]]}]}"##).unwrap();

        let session = boot_with(local, "#page=1&ann=%%%garbage");
        assert_eq!(session.mode(), SessionMode::Local);
        assert_eq!(
            session.current_strokes(),
            &[Stroke::Pen {
                color: Color::YELLOW,
                path: vec![CanvasPoint::new(0.0, 0.0), CanvasPoint::new(1.0, 1.0)],
            }]
        );

        let empty = boot_with(MemoryStorage::new(), "#ann=%%%garbage");
        assert_eq!(empty.mode(), SessionMode::Local);
        assert!(empty.store().is_empty());
    }

    #[test]
    fn test_fragment_change_switches_modes() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        let start = Instant::now();
        session.set_tool(Tool::Pen(Ink::Red));
        draw_pen(&mut session, &mut surface, &[(1.0, 1.0), (2.0, 2.0)], start);
        let local_store = session.store().clone();

        // Entering shared mode writes the pending local edit first
        let base = Url::parse("https://example.com/v.html").unwrap();
        let shared_url = session.share_url(&base).unwrap();
        let mut other = boot();
        other.import_json(r#"{"3": []}"#, &mut surface, start).unwrap();
        let other_url = other.share_url(&shared_url).unwrap();

        let mode = session.on_fragment_change(other_url.fragment().unwrap(), &mut surface);
        assert_eq!(mode, SessionMode::Shared);
        assert_eq!(session.store(), other.store());
        assert!(session.persistence().storage().get_item("eplan_ann").unwrap().is_some());
        assert_eq!(session.next_deadline(), None);

        // Losing the key while shared reloads local; later unrelated edits are ignored
        let mode = session.on_fragment_change("page=2", &mut surface);
        assert_eq!(mode, SessionMode::Local);
        assert_eq!(session.store(), &local_store);
        assert_eq!(session.on_fragment_change("page=3", &mut surface), SessionMode::Local);
    }

    #[test]
    fn test_fallback_without_local_data_is_empty() {
        let mut shared_store = AnnotationStore::new();
        let rect = Stroke::Rect { color: Color::RED, x: 0.0, y: 0.0, w: 5.0, h: 5.0 };
        shared_store.append(PageId::FIRST, rect);
        let codec = ShareCodec::from_config(&MarkupConfig::default()).unwrap();
        let fragment = format!("ann={}", codec.encode(&shared_store).unwrap());

        let mut session = boot_with(MemoryStorage::new(), &fragment);
        let mut surface = DisplayList::new(100, 100);
        assert_eq!(session.mode(), SessionMode::Shared);

        assert_eq!(session.on_fragment_change("", &mut surface), SessionMode::Local);
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_shutdown_flushes_pending_save() {
        let mut session = boot();
        let mut surface = DisplayList::new(100, 100);
        session.set_tool(Tool::Pen(Ink::Red));
        draw_pen(&mut session, &mut surface, &[(1.0, 1.0), (2.0, 2.0)], Instant::now());

        let storage = session.shutdown().unwrap();
        assert!(stored(&storage).is_some());
    }
}
