use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use crate::foundation::error::{ReelError, ReelResult};
use crate::sequence::mapping::{ScrollMapping, ScrollPhase};

/// Number of years after `start_year` the indicator may advance to.
pub const DEFAULT_YEAR_SPAN: u32 = 16;

/// Maps frame indices to a displayed year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearIndicator {
    /// Year shown at frame 0.
    pub start_year: i32,
    /// Frames per year step (> 0).
    pub frames_per_year: u32,
    /// Upper clamp, in years after `start_year`.
    pub span: u32,
}

impl YearIndicator {
    /// `clamp(start_year + floor(frame / frames_per_year), start_year, final_year)`.
    pub fn year_for_frame(self, frame: usize) -> i32 {
        let step = frame / self.frames_per_year.max(1) as usize;
        let step = i32::try_from(step).unwrap_or(i32::MAX);
        self.start_year
            .saturating_add(step)
            .clamp(self.start_year, self.final_year())
    }

    /// Year for a mapped scroll position. Reaching the end of the scroll range pins the final
    /// year, whether or not the section has been scrolled past.
    pub fn year_for_mapping(self, mapping: &ScrollMapping) -> i32 {
        if mapping.phase == ScrollPhase::After || mapping.progress >= 1.0 {
            self.final_year()
        } else {
            self.year_for_frame(mapping.frame)
        }
    }

    /// Last year the indicator can show.
    pub fn final_year(self) -> i32 {
        self.start_year
            .saturating_add(i32::try_from(self.span).unwrap_or(i32::MAX))
    }
}

/// One row of a per-year ranking.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TopEntry {
    /// Display name.
    pub name: String,
    /// Ranked value.
    pub value: f64,
}

/// Injected provider of the ranked list shown next to the year indicator.
pub trait YearTable: Send + Sync {
    /// Ordered entries for `year`; empty when the table has no row for it.
    fn top_for_year(&self, year: i32) -> &[TopEntry];
}

/// A flow observation used to derive rankings (`source` contributed `value` in `year`).
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct FlowRow {
    /// Contributing entity.
    pub source: String,
    /// Observation year.
    pub year: i32,
    /// Contributed amount.
    pub value: f64,
}

/// In-memory [`YearTable`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticYearTable {
    rows: BTreeMap<i32, Vec<TopEntry>>,
}

impl StaticYearTable {
    /// Build from pre-ranked rows; each year's entries are kept in the given order.
    pub fn new(rows: BTreeMap<i32, Vec<TopEntry>>) -> Self {
        Self { rows }
    }

    /// Parse `{"2000": [{"name": "...", "value": 1.0}, ...], ...}`.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let raw: BTreeMap<String, Vec<TopEntry>> = serde_json::from_str(s)
            .map_err(|e| ReelError::serde(format!("year table JSON: {e}")))?;
        Self::from_raw(raw)
    }

    /// Read a year table JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open year table JSON '{}': {e}", path.display()))
        })?;
        let raw: BTreeMap<String, Vec<TopEntry>> = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ReelError::serde(format!("year table JSON '{}': {e}", path.display())))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: BTreeMap<String, Vec<TopEntry>>) -> ReelResult<Self> {
        let mut rows = BTreeMap::new();
        for (k, v) in raw {
            let year: i32 = k
                .trim()
                .parse()
                .map_err(|_| ReelError::validation(format!("year table key '{k}' is not a year")))?;
            rows.insert(year, v);
        }
        Ok(Self { rows })
    }

    /// Rank sources per year by summed value (descending, ties by name) and keep the top `n`.
    pub fn from_flows<'a>(flows: impl IntoIterator<Item = &'a FlowRow>, n: usize) -> Self {
        let mut sums: BTreeMap<i32, BTreeMap<&'a str, f64>> = BTreeMap::new();
        for f in flows {
            if !f.value.is_finite() {
                continue;
            }
            *sums
                .entry(f.year)
                .or_default()
                .entry(f.source.as_str())
                .or_insert(0.0) += f.value;
        }

        let rows = sums
            .into_iter()
            .map(|(year, by_source)| {
                let mut entries: Vec<TopEntry> = by_source
                    .into_iter()
                    .map(|(name, value)| TopEntry {
                        name: name.to_string(),
                        value,
                    })
                    .collect();
                entries.sort_by(|a, b| b.value.total_cmp(&a.value).then(a.name.cmp(&b.name)));
                entries.truncate(n);
                (year, entries)
            })
            .collect();
        Self { rows }
    }

    /// Keep at most `n` entries per year.
    pub fn limit(mut self, n: usize) -> Self {
        for v in self.rows.values_mut() {
            v.truncate(n);
        }
        self
    }

    /// Years with at least one row.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.keys().copied()
    }
}

impl YearTable for StaticYearTable {
    fn top_for_year(&self, year: i32) -> &[TopEntry] {
        self.rows.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/year.rs"]
mod tests;
