use std::sync::Arc;

use crate::{
    assets::{decode::FrameImage, loader::FrameLoader},
    foundation::core::{Rect, Viewport},
    foundation::error::ReelResult,
    render::letterbox::letterbox,
    render::surface::Surface,
    sequence::cache::{CacheStats, FrameCache, FrameStatus, LoadFailure},
    sequence::config::PlayerOpts,
    sequence::descriptor::SequenceDescriptor,
    sequence::mapping::{ScrollMapping, ScrollMetrics, ScrollPhase, map_scroll},
    sequence::schedule::{Coalescer, PlayerSignal},
    sequence::year::{TopEntry, YearIndicator, YearTable},
};

/// Recoverable events the player absorbs instead of failing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameDiagnostic {
    /// A frame fetch failed; its slot stays empty.
    LoadFailed(LoadFailure),
    /// `requested` was unavailable and frame `used` was drawn instead.
    FellBack {
        /// Frame the draw asked for.
        requested: usize,
        /// Frame actually drawn.
        used: usize,
    },
    /// Neither the requested frame nor frame 0 was available; the surface was left untouched.
    Skipped {
        /// Frame the draw asked for.
        requested: usize,
    },
    /// Frame 0 never loaded, so frames are drawn to the full surface without letterboxing.
    GeometryUnavailable,
}

/// Observer for [`FrameDiagnostic`]s.
pub type DiagnosticHook = Box<dyn FnMut(&FrameDiagnostic) + Send>;

/// New year value for the indicator, with its ranking.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct YearUpdate {
    /// Year to display.
    pub year: i32,
    /// Ranking for `year` from the injected table; empty without a table or row.
    pub top: Vec<TopEntry>,
}

/// What one scroll signal changed.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ScrollUpdate {
    /// Mapping of the scroll position.
    pub mapping: ScrollMapping,
    /// Whether the surface was redrawn.
    pub redrawn: bool,
    /// Present only when the displayed year changed.
    pub year: Option<YearUpdate>,
}

impl ScrollUpdate {
    /// Whether overlay content should be visible.
    pub fn overlay_visible(&self) -> bool {
        self.mapping.overlay_visible
    }
}

/// Builder for [`SequencePlayer`].
pub struct SequencePlayerBuilder<S> {
    descriptor: SequenceDescriptor,
    loader: Arc<dyn FrameLoader>,
    surface: S,
    opts: PlayerOpts,
    year_table: Option<Arc<dyn YearTable>>,
    diagnostics: Option<DiagnosticHook>,
}

impl<S: Surface> SequencePlayerBuilder<S> {
    /// Replace the default [`PlayerOpts`].
    pub fn opts(mut self, opts: PlayerOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Provide rankings for [`YearUpdate::top`].
    pub fn year_table(mut self, table: Arc<dyn YearTable>) -> Self {
        self.year_table = Some(table);
        self
    }

    /// Observe fallbacks and load failures.
    pub fn diagnostics(mut self, hook: DiagnosticHook) -> Self {
        self.diagnostics = Some(hook);
        self
    }

    /// Load frame 0, compute geometry and draw the first frame.
    ///
    /// Fails only on invalid descriptor/options; a missing frame 0 degrades to full-surface
    /// drawing.
    #[tracing::instrument(skip_all, fields(sequence = %self.descriptor.sequence_name))]
    pub fn build(self) -> ReelResult<SequencePlayer<S>> {
        self.opts.validate()?;
        let cache = FrameCache::new(&self.descriptor, self.loader, self.opts.worker_threads)?;
        let year = self
            .descriptor
            .year_indicator_with_span(self.opts.year_span);

        let mut player = SequencePlayer {
            descriptor: self.descriptor,
            opts: self.opts,
            cache,
            surface: self.surface,
            geometry: None,
            current_frame: 0,
            year,
            displayed_year: None,
            year_table: self.year_table,
            diagnostics: self.diagnostics,
            signals: Coalescer::new(),
        };

        player.cache.ensure_frame(0)?;
        player.cache.wait_for(0);
        player.dispatch_failures();
        player.refresh_geometry();
        player.cache.prefetch(0, player.opts.buffer_radius);
        player.draw(0);
        tracing::debug!(
            total_frames = player.descriptor.total_frames(),
            geometry = ?player.geometry,
            "sequence player ready"
        );
        Ok(player)
    }
}

/// Scroll-linked image-sequence player.
///
/// Owns one sequence: maps section scroll progress to a frame, keeps a window of frames
/// prefetched around it, and paints the current frame letterboxed into a [`Surface`].
pub struct SequencePlayer<S> {
    descriptor: SequenceDescriptor,
    opts: PlayerOpts,
    cache: FrameCache,
    surface: S,
    geometry: Option<Rect>,
    current_frame: usize,
    year: Option<YearIndicator>,
    displayed_year: Option<i32>,
    year_table: Option<Arc<dyn YearTable>>,
    diagnostics: Option<DiagnosticHook>,
    signals: Coalescer<PlayerSignal>,
}

impl<S> std::fmt::Debug for SequencePlayer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencePlayer")
            .field("sequence_name", &self.descriptor.sequence_name)
            .field("current_frame", &self.current_frame)
            .field("displayed_year", &self.displayed_year)
            .field("geometry", &self.geometry)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<S: Surface> SequencePlayer<S> {
    /// Start building a player with default options.
    pub fn builder(
        descriptor: SequenceDescriptor,
        loader: Arc<dyn FrameLoader>,
        surface: S,
    ) -> SequencePlayerBuilder<S> {
        SequencePlayerBuilder {
            descriptor,
            loader,
            surface,
            opts: PlayerOpts::default(),
            year_table: None,
            diagnostics: None,
        }
    }

    /// Shorthand for `builder(..).opts(opts).build()`.
    pub fn new(
        descriptor: SequenceDescriptor,
        loader: Arc<dyn FrameLoader>,
        surface: S,
        opts: PlayerOpts,
    ) -> ReelResult<Self> {
        Self::builder(descriptor, loader, surface).opts(opts).build()
    }

    /// Sequence being played.
    pub fn descriptor(&self) -> &SequenceDescriptor {
        &self.descriptor
    }

    /// Index of the frame last selected by scrolling.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Year currently shown by the indicator, if enabled and set.
    pub fn current_year(&self) -> Option<i32> {
        self.displayed_year
    }

    /// Letterbox rectangle, or `None` when drawing to the full surface.
    pub fn geometry(&self) -> Option<Rect> {
        self.geometry
    }

    /// Surface the player draws into.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Give the surface back.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Frame cache activity counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Cached frame at `index`, if decoded.
    pub fn cached_frame(&self, index: usize) -> Option<Arc<FrameImage>> {
        self.cache.get(index)
    }

    /// Make sure frame `index` is cached or being fetched.
    pub fn ensure_frame(&mut self, index: usize) -> ReelResult<FrameStatus> {
        self.cache.ensure_frame(index)
    }

    /// Prefetch the configured window around `center`. Returns the indices issued.
    pub fn prefetch(&mut self, center: usize) -> Vec<usize> {
        self.cache.prefetch(center, self.opts.buffer_radius)
    }

    /// Apply finished fetches and report failures, without blocking.
    pub fn pump(&mut self) {
        self.cache.pump();
        self.dispatch_failures();
    }

    /// Block until every outstanding fetch has finished.
    pub fn wait_idle(&mut self) {
        self.cache.wait_idle();
        self.dispatch_failures();
    }

    /// React to a scroll position.
    pub fn on_scroll(&mut self, metrics: &ScrollMetrics) -> ScrollUpdate {
        self.pump();
        let mapping = map_scroll(
            metrics,
            self.descriptor.total_frames(),
            self.opts.overlay_band,
        );

        // Before the section: keep whatever is on screen.
        if mapping.phase == ScrollPhase::Before {
            return ScrollUpdate {
                mapping,
                redrawn: false,
                year: None,
            };
        }

        let mut redrawn = false;
        if mapping.frame != self.current_frame {
            self.current_frame = mapping.frame;
            self.cache.prefetch(mapping.frame, self.opts.buffer_radius);
            self.draw(mapping.frame);
            redrawn = true;
        }

        let year = self.year.and_then(|ind| {
            let y = ind.year_for_mapping(&mapping);
            if self.displayed_year == Some(y) {
                return None;
            }
            self.displayed_year = Some(y);
            let top = self
                .year_table
                .as_ref()
                .map(|t| t.top_for_year(y).to_vec())
                .unwrap_or_default();
            Some(YearUpdate { year: y, top })
        });

        ScrollUpdate {
            mapping,
            redrawn,
            year,
        }
    }

    /// Paint frame `index`, falling back to frame 0 when it cannot be loaded.
    ///
    /// Blocks until an absent frame has been fetched. Returns the index actually drawn, or `None`
    /// when nothing was drawable.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn draw(&mut self, index: usize) -> Option<usize> {
        let resolved = self.resolve(index).map(|img| (index, img));
        self.dispatch_failures();

        let Some((used, img)) = resolved.or_else(|| self.cache.get(0).map(|img| (0, img))) else {
            self.emit(FrameDiagnostic::Skipped { requested: index });
            return None;
        };
        if used != index {
            self.emit(FrameDiagnostic::FellBack {
                requested: index,
                used,
            });
        }

        let dest = self
            .geometry
            .unwrap_or_else(|| self.surface.viewport().rect());
        self.surface.clear(self.opts.background());
        self.surface.blit(&img, dest);
        Some(used)
    }

    /// Resize the surface, recompute geometry from frame 0 and redraw the current frame.
    #[tracing::instrument(skip(self))]
    pub fn resize(&mut self, viewport: Viewport) {
        self.resize_surface(viewport);
        self.draw(self.current_frame);
    }

    /// Queue a host signal. Returns `true` when the caller should schedule a [`Self::tick`] for
    /// the next frame interval.
    pub fn signal(&mut self, signal: PlayerSignal) -> bool {
        self.signals.signal(signal)
    }

    /// Run the handler once for every signal queued since the previous tick.
    pub fn tick(&mut self) -> Option<ScrollUpdate> {
        let signal = self.signals.flush()?;
        let PlayerSignal::Resize { viewport, metrics } = signal else {
            return Some(self.on_scroll(&signal.metrics()));
        };

        // The resized surface needs one draw, at whatever frame the new layout maps to.
        self.resize_surface(viewport);
        let mut update = self.on_scroll(&metrics);
        if !update.redrawn {
            self.draw(self.current_frame);
            update.redrawn = true;
        }
        Some(update)
    }

    /// Signals merged into an already pending tick so far.
    pub fn coalesced_signals(&self) -> u64 {
        self.signals.coalesced()
    }

    fn resolve(&mut self, index: usize) -> Option<Arc<FrameImage>> {
        if let Some(img) = self.cache.get(index) {
            return Some(img);
        }
        match self.cache.ensure_frame(index) {
            Ok(FrameStatus::Ready(img)) => Some(img),
            Ok(FrameStatus::InFlight | FrameStatus::Issued) => self.cache.wait_for(index),
            Err(_) => None,
        }
    }

    fn resize_surface(&mut self, viewport: Viewport) {
        self.surface.resize(viewport);
        self.refresh_geometry();
    }

    fn refresh_geometry(&mut self) {
        let Some(first) = self.cache.get(0) else {
            self.geometry = None;
            self.emit(FrameDiagnostic::GeometryUnavailable);
            return;
        };
        // A degenerate surface has no letterbox; drawing clips to nothing.
        self.geometry = letterbox(first.size(), self.surface.viewport().size());
    }

    fn dispatch_failures(&mut self) {
        for f in self.cache.take_failures() {
            self.emit(FrameDiagnostic::LoadFailed(f));
        }
    }

    fn emit(&mut self, diagnostic: FrameDiagnostic) {
        match &diagnostic {
            FrameDiagnostic::LoadFailed(_) => {}
            FrameDiagnostic::FellBack { requested, used } => {
                tracing::warn!(requested, used, "frame unavailable, drew fallback");
            }
            FrameDiagnostic::Skipped { requested } => {
                tracing::warn!(requested, "no drawable frame, skipped draw");
            }
            FrameDiagnostic::GeometryUnavailable => {
                tracing::warn!("first frame unavailable, drawing without letterbox");
            }
        }
        if let Some(hook) = self.diagnostics.as_mut() {
            hook(&diagnostic);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/player.rs"]
mod tests;
