//! Frame fetching and decoding.

/// Encoded bytes to premultiplied RGBA8 frames.
pub mod decode;
/// Frame loader seam and built-in loaders.
pub mod loader;
