//! Shared primitives: error taxonomy, viewport and color types.

/// Viewport, color and geometry primitives.
pub mod core;
/// Error taxonomy.
pub mod error;
