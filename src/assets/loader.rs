use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context;

use crate::{
    assets::decode::{FrameImage, decode_image},
    foundation::error::{ReelError, ReelResult},
};

/// Fetch-and-decode seam for sequence frames.
///
/// `load` is called from worker threads and blocks until the frame is decoded or has failed.
/// Implementations must not cache: deduplication is the frame cache's job.
pub trait FrameLoader: Send + Sync {
    /// Fetch and decode the frame addressed by `source` (see
    /// [`crate::SequenceDescriptor::frame_source`]).
    fn load(&self, source: &str) -> ReelResult<FrameImage>;
}

/// Loads frames from files under a root directory.
#[derive(Debug)]
pub struct FsFrameLoader {
    root: PathBuf,
    reads: AtomicU64,
}

impl FsFrameLoader {
    /// Resolve frame sources relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reads: AtomicU64::new(0),
        }
    }

    /// Root directory used when resolving frame sources.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of file reads attempted so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl FrameLoader for FsFrameLoader {
    fn load(&self, source: &str) -> ReelResult<FrameImage> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let norm = normalize_rel_path(source)?;
        let path = self.root.join(Path::new(&norm));
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read frame bytes from '{}'", path.display()))
            .map_err(|e| ReelError::load(format!("{e:#}")))?;
        decode_image(&bytes)
    }
}

/// Serves encoded frames from memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryFrameLoader {
    frames: HashMap<String, Vec<u8>>,
    loads: AtomicU64,
}

impl MemoryFrameLoader {
    /// Empty loader; every request fails until frames are inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register encoded bytes under a frame source.
    pub fn insert(&mut self, source: impl Into<String>, bytes: Vec<u8>) {
        self.frames.insert(source.into(), bytes);
    }

    /// Number of `load` calls served so far, including failed ones.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

impl FrameLoader for MemoryFrameLoader {
    fn load(&self, source: &str) -> ReelResult<FrameImage> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let bytes = self
            .frames
            .get(source)
            .ok_or_else(|| ReelError::load(format!("no frame registered for '{source}'")))?;
        decode_image(bytes)
    }
}

/// Normalize and validate sequence-relative frame paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> ReelResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelError::validation("frame paths must be relative"));
    }
    if s.is_empty() {
        return Err(ReelError::validation("frame path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelError::validation("frame paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ReelError::validation("frame path must contain a file name"));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
