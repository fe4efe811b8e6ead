use crate::foundation::core::{Rect, Size};

/// Largest rectangle with `content`'s aspect ratio that fits inside `target`, centered.
///
/// Padding ends up on exactly one axis (or none when the ratios match). Returns `None` when either
/// size is degenerate, in which case callers draw to the full surface.
pub fn letterbox(content: Size, target: Size) -> Option<Rect> {
    if !is_drawable(content) || !is_drawable(target) {
        return None;
    }

    let scale = (target.width / content.width).min(target.height / content.height);
    let w = content.width * scale;
    let h = content.height * scale;
    let x = (target.width - w) * 0.5;
    let y = (target.height - h) * 0.5;
    Some(Rect::new(x, y, x + w, y + h))
}

fn is_drawable(s: Size) -> bool {
    s.width.is_finite() && s.height.is_finite() && s.width > 0.0 && s.height > 0.0
}
