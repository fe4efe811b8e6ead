use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::{
    foundation::core::{Rgba8Premul, Viewport},
    foundation::error::{ReelError, ReelResult},
    sequence::cache::DEFAULT_BUFFER_RADIUS,
    sequence::descriptor::SequenceDescriptor,
    sequence::mapping::{OverlayBand, ScrollMetrics},
    sequence::year::{DEFAULT_YEAR_SPAN, StaticYearTable},
};

/// Tuning knobs for [`crate::SequencePlayer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerOpts {
    /// Half-width of the prefetch window around the current frame.
    pub buffer_radius: usize,
    /// Straight-alpha color the surface is cleared to before each draw.
    pub background_rgba: [u8; 4],
    /// Loader pool size. `None` uses rayon defaults.
    pub worker_threads: Option<usize>,
    /// Progress band in which overlay content is visible.
    pub overlay_band: OverlayBand,
    /// Years the indicator may advance past `start_year`.
    pub year_span: u32,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            buffer_radius: DEFAULT_BUFFER_RADIUS,
            background_rgba: [0, 0, 0, 255],
            worker_threads: None,
            overlay_band: OverlayBand::default(),
            year_span: DEFAULT_YEAR_SPAN,
        }
    }
}

impl PlayerOpts {
    /// Check option ranges.
    pub fn validate(&self) -> ReelResult<()> {
        let OverlayBand { enter, exit } = self.overlay_band;
        if !(0.0..=1.0).contains(&enter) || !(0.0..=1.0).contains(&exit) || enter >= exit {
            return Err(ReelError::validation(format!(
                "overlay_band must satisfy 0 <= enter < exit <= 1, got [{enter}, {exit}]"
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(ReelError::validation("worker_threads must be >= 1 when set"));
        }
        Ok(())
    }

    /// Background as premultiplied color.
    pub fn background(&self) -> Rgba8Premul {
        Rgba8Premul::from_straight_array(self.background_rgba)
    }
}

/// Static page layout used when driving a player outside a browser (CLI, tests).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionLayout {
    /// Document offset of the section's top edge.
    pub section_top: f64,
    /// Section height.
    pub section_height: f64,
    /// Viewport (and surface) size.
    pub viewport: Viewport,
}

impl SectionLayout {
    /// Metrics for a viewport scrolled to document offset `viewport_top`.
    pub fn metrics_at(&self, viewport_top: f64) -> ScrollMetrics {
        ScrollMetrics {
            viewport_top,
            viewport_height: f64::from(self.viewport.height),
            section_top: self.section_top,
            section_height: self.section_height,
        }
    }

    /// Scroll distance over which the section is active, never negative.
    pub fn scroll_range(&self) -> f64 {
        (self.section_height - f64::from(self.viewport.height)).max(0.0)
    }
}

/// On-disk configuration: one sequence plus optional player tuning and year table.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReelConfig {
    /// Sequence to play.
    pub sequence: SequenceDescriptor,
    /// Player tuning.
    #[serde(default)]
    pub player: PlayerOpts,
    /// Year table JSON, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<PathBuf>,
    /// Layout for offline playback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionLayout>,
}

impl ReelConfig {
    /// Parse and validate a config from JSON. Relative paths stay unresolved.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let cfg: Self =
            serde_json::from_str(s).map_err(|e| ReelError::serde(format!("config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a config file, resolving `years` against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        let mut cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ReelError::serde(format!("config JSON '{}': {e}", path.display())))?;
        cfg.validate()?;

        if let (Some(years), Some(dir)) = (cfg.years.as_mut(), path.parent())
            && years.is_relative()
        {
            *years = dir.join(&*years);
        }
        Ok(cfg)
    }

    /// Validate the sequence and player options.
    pub fn validate(&self) -> ReelResult<()> {
        self.sequence.validate()?;
        self.player.validate()
    }

    /// Load the configured year table, if any.
    pub fn load_year_table(&self) -> ReelResult<Option<StaticYearTable>> {
        self.years
            .as_deref()
            .map(StaticYearTable::from_path)
            .transpose()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/config.rs"]
mod tests;
