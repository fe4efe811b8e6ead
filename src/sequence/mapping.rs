//! Pure scroll-position to frame-index mapping.

/// Layout signals read from the host page, all in document pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScrollMetrics {
    /// Document offset of the top edge of the viewport.
    pub viewport_top: f64,
    /// Viewport height.
    pub viewport_height: f64,
    /// Document offset of the top edge of the section owning the sequence.
    pub section_top: f64,
    /// Section height.
    pub section_height: f64,
}

impl ScrollMetrics {
    /// Distance scrolled past the section's top edge.
    pub fn scroll_start(&self) -> f64 {
        self.viewport_top - self.section_top
    }

    /// Scroll distance over which the section is active.
    pub fn scroll_range(&self) -> f64 {
        self.section_height - self.viewport_height
    }
}

/// Where the viewport sits relative to the section's active range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPhase {
    /// The section has not been reached yet.
    Before,
    /// Inside the active range.
    Within,
    /// The section has been scrolled past.
    After,
}

/// Band of progress values inside which auxiliary overlay content is shown (exclusive bounds).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayBand {
    /// Lower exclusive bound.
    pub enter: f64,
    /// Upper exclusive bound.
    pub exit: f64,
}

impl Default for OverlayBand {
    fn default() -> Self {
        Self {
            enter: 0.05,
            exit: 0.95,
        }
    }
}

impl OverlayBand {
    /// Whether `progress` lies strictly inside the band.
    pub fn contains(self, progress: f64) -> bool {
        self.enter < progress && progress < self.exit
    }
}

/// Result of mapping one scroll position.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ScrollMapping {
    /// Position relative to the active range.
    pub phase: ScrollPhase,
    /// Scroll-local progress in `[0, 1]`.
    pub progress: f64,
    /// Frame index in `[0, total_frames)`.
    pub frame: usize,
    /// Whether overlay content should be visible.
    pub overlay_visible: bool,
}

/// Map scroll metrics onto a sequence of `total_frames` frames.
///
/// A section no taller than the viewport has no active range: it maps to `Before` until its top
/// edge is reached, then straight to `After`.
pub fn map_scroll(metrics: &ScrollMetrics, total_frames: usize, band: OverlayBand) -> ScrollMapping {
    let last = total_frames.saturating_sub(1);
    let scroll_start = metrics.scroll_start();
    let scroll_range = metrics.scroll_range();

    // NaN inputs land in `Before`.
    if scroll_start.is_nan() || scroll_start < 0.0 {
        return ScrollMapping {
            phase: ScrollPhase::Before,
            progress: 0.0,
            frame: 0,
            overlay_visible: false,
        };
    }
    if scroll_start > scroll_range || scroll_range.is_nan() || scroll_range <= 0.0 {
        return ScrollMapping {
            phase: ScrollPhase::After,
            progress: 1.0,
            frame: last,
            overlay_visible: false,
        };
    }

    let progress = (scroll_start / scroll_range).clamp(0.0, 1.0);
    ScrollMapping {
        phase: ScrollPhase::Within,
        progress,
        frame: frame_for_progress(progress, total_frames),
        overlay_visible: band.contains(progress),
    }
}

/// `floor(progress * (total_frames - 1))`, clamped to the valid range.
pub fn frame_for_progress(progress: f64, total_frames: usize) -> usize {
    let last = total_frames.saturating_sub(1);
    let p = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    ((p * last as f64).floor() as usize).min(last)
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/mapping.rs"]
mod tests;
