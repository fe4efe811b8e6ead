use std::{fs::File, io::BufReader, path::Path};

use crate::foundation::error::{ReelError, ReelResult};
use crate::sequence::year::{DEFAULT_YEAR_SPAN, YearIndicator};

/// Placeholder substituted with the zero-padded frame number in
/// [`SequenceDescriptor::name_pattern`].
pub const FRAME_PLACEHOLDER: &str = "{frame}";

const MAX_PADDING: u32 = 20;

/// Immutable description of one scroll-linked image sequence.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceDescriptor {
    /// Base path for frame assets, relative to the loader root.
    pub sequence_name: String,
    /// First frame number on disk (inclusive).
    pub start_frame: u32,
    /// Last frame number on disk (inclusive).
    pub end_frame: u32,
    /// File name template containing exactly one [`FRAME_PLACEHOLDER`].
    pub name_pattern: String,
    /// Digit width of the zero-padded frame number.
    pub padding: u32,
    /// Frames per displayed year; enables the year indicator when > 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_per_year: Option<u32>,
    /// Year shown at frame 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
}

impl SequenceDescriptor {
    /// Parse a descriptor from JSON.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let d: Self = serde_json::from_str(s)
            .map_err(|e| ReelError::serde(format!("sequence descriptor JSON: {e}")))?;
        d.validate()?;
        Ok(d)
    }

    /// Read and validate a descriptor JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open sequence JSON '{}': {e}", path.display()))
        })?;
        let d: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ReelError::serde(format!("sequence JSON '{}': {e}", path.display())))?;
        d.validate()?;
        Ok(d)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> ReelResult<()> {
        if self.sequence_name.trim().is_empty() {
            return Err(ReelError::validation("sequence_name must be non-empty"));
        }
        if self.end_frame < self.start_frame {
            return Err(ReelError::validation(format!(
                "end_frame ({}) must be >= start_frame ({})",
                self.end_frame, self.start_frame
            )));
        }
        let placeholders = self.name_pattern.matches(FRAME_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(ReelError::validation(format!(
                "name_pattern must contain exactly one '{FRAME_PLACEHOLDER}', found {placeholders}"
            )));
        }
        if self.padding > MAX_PADDING {
            return Err(ReelError::validation(format!(
                "padding must be <= {MAX_PADDING}"
            )));
        }
        if decimal_digits(self.end_frame) > self.padding {
            return Err(ReelError::validation(format!(
                "end_frame {} does not fit in {} padded digits",
                self.end_frame, self.padding
            )));
        }
        Ok(())
    }

    /// Number of frames in the sequence (`end_frame - start_frame + 1`).
    pub fn total_frames(&self) -> usize {
        (self.end_frame - self.start_frame) as usize + 1
    }

    /// Asset path of frame `index` (0-based within the sequence).
    pub fn frame_source(&self, index: usize) -> String {
        let number = u64::from(self.start_frame) + index as u64;
        let padded = format!("{number:0width$}", width = self.padding as usize);
        let file = self.name_pattern.replacen(FRAME_PLACEHOLDER, &padded, 1);
        let base = self.sequence_name.trim_end_matches('/');
        format!("{base}/{file}")
    }

    /// Year indicator derived from `frames_per_year`/`start_year`, if enabled.
    pub fn year_indicator(&self) -> Option<YearIndicator> {
        self.year_indicator_with_span(DEFAULT_YEAR_SPAN)
    }

    pub(crate) fn year_indicator_with_span(&self, span: u32) -> Option<YearIndicator> {
        match (self.frames_per_year, self.start_year) {
            (Some(fpy), Some(start_year)) if fpy > 0 => Some(YearIndicator {
                start_year,
                frames_per_year: fpy,
                span,
            }),
            _ => None,
        }
    }
}

fn decimal_digits(mut n: u32) -> u32 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/descriptor.rs"]
mod tests;
