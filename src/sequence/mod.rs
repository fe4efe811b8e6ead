//! Scroll-linked image sequences: addressing, caching, mapping and playback.

/// Windowed, deduplicating frame cache.
pub mod cache;
/// Player options and on-disk configuration.
pub mod config;
/// Sequence description and frame addressing.
pub mod descriptor;
/// Scroll position to frame mapping.
pub mod mapping;
/// The scroll-linked player.
pub mod player;
/// Per-frame-interval signal coalescing.
pub mod schedule;
/// Year indicator and injected rankings.
pub mod year;
