//! scrollreel plays a scroll-linked image sequence: the "scrollytelling" hero where scrolling
//! through a page section scrubs through a pre-rendered animation.
//!
//! # Pipeline overview
//!
//! 1. **Map**: `ScrollMetrics -> ScrollMapping` (phase, progress, frame index, overlay visibility)
//! 2. **Fetch**: the [`FrameCache`] keeps a window of frames around the current one decoded, with
//!    at most one outstanding fetch per frame
//! 3. **Draw**: the current frame is letterboxed into a [`Surface`] on a solid background
//! 4. **Report**: year indicator changes, rankings from an injected [`YearTable`], and
//!    [`FrameDiagnostic`]s for everything that degraded instead of failing
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Single owner**: the player and its cache are driven from one thread; decoding happens on a
//!   worker pool and is only observed when completions are drained.
//! - **Degrade, don't fail**: after construction, missing or broken frames fall back to frame 0
//!   or are skipped. Errors are reserved for invalid descriptors and options.
//! - **Premultiplied RGBA8** end-to-end.
//!
//! # Getting started
//!
//! ```no_run
//! use std::sync::Arc;
//! use scrollreel::{
//!     FsFrameLoader, PixmapSurface, PlayerOpts, ScrollMetrics, SequenceDescriptor,
//!     SequencePlayer, Viewport,
//! };
//!
//! # fn main() -> scrollreel::ReelResult<()> {
//! let descriptor = SequenceDescriptor::from_path("hero.json")?;
//! let surface = PixmapSurface::new(Viewport::new(1280, 720)?);
//! let loader = Arc::new(FsFrameLoader::new("site/"));
//! let mut player = SequencePlayer::new(descriptor, loader, surface, PlayerOpts::default())?;
//!
//! let update = player.on_scroll(&ScrollMetrics {
//!     viewport_top: 2600.0,
//!     viewport_height: 720.0,
//!     section_top: 600.0,
//!     section_height: 4720.0,
//! });
//! println!("frame {} overlay {}", update.mapping.frame, update.overlay_visible());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;
mod render;
mod sequence;

pub use assets::decode::{FrameImage, decode_image};
pub use assets::loader::{FrameLoader, FsFrameLoader, MemoryFrameLoader, normalize_rel_path};
pub use foundation::core::{Point, Rect, Rgba8Premul, Size, Viewport};
pub use foundation::error::{ReelError, ReelResult};
pub use render::letterbox::letterbox;
pub use render::surface::{PixmapSurface, Surface};
pub use sequence::cache::{CacheStats, DEFAULT_BUFFER_RADIUS, FrameCache, FrameStatus, LoadFailure};
pub use sequence::config::{PlayerOpts, ReelConfig, SectionLayout};
pub use sequence::descriptor::{FRAME_PLACEHOLDER, SequenceDescriptor};
pub use sequence::mapping::{
    OverlayBand, ScrollMapping, ScrollMetrics, ScrollPhase, frame_for_progress, map_scroll,
};
pub use sequence::player::{
    DiagnosticHook, FrameDiagnostic, ScrollUpdate, SequencePlayer, SequencePlayerBuilder,
    YearUpdate,
};
pub use sequence::schedule::{Coalesce, Coalescer, PlayerSignal};
pub use sequence::year::{
    DEFAULT_YEAR_SPAN, FlowRow, StaticYearTable, TopEntry, YearIndicator, YearTable,
};
