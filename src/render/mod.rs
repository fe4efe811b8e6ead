/// Aspect-preserving fit of a frame into the surface.
pub mod letterbox;
/// Drawing target abstraction and the CPU pixmap surface.
pub mod surface;
