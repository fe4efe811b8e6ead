use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Mutex;

use super::*;
use crate::assets::loader::MemoryFrameLoader;
use crate::foundation::core::Viewport;
use crate::render::surface::PixmapSurface;
use crate::sequence::year::StaticYearTable;

fn descriptor() -> SequenceDescriptor {
    SequenceDescriptor {
        sequence_name: "hero".to_string(),
        start_frame: 1,
        end_frame: 480,
        name_pattern: "frame_{frame}.png".to_string(),
        padding: 4,
        frames_per_year: Some(30),
        start_year: Some(2000),
    }
}

fn shade(i: usize) -> u8 {
    (i % 251) as u8 + 1
}

/// 4x2 frames: letterboxed into an 8x8 surface they occupy rows 2..6.
fn png_bytes(v: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([v, v, v, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn loader(d: &SequenceDescriptor, missing: &[usize]) -> Arc<MemoryFrameLoader> {
    let mut l = MemoryFrameLoader::new();
    for i in 0..d.total_frames() {
        if !missing.contains(&i) {
            l.insert(d.frame_source(i), png_bytes(shade(i)));
        }
    }
    Arc::new(l)
}

fn surface() -> PixmapSurface {
    PixmapSurface::new(Viewport::new(8, 8).unwrap())
}

fn opts() -> PlayerOpts {
    PlayerOpts {
        worker_threads: Some(2),
        ..PlayerOpts::default()
    }
}

/// 4000px of active scroll (viewport 1000, section 5000 at offset 0).
fn at(scroll_start: f64) -> ScrollMetrics {
    ScrollMetrics {
        viewport_top: scroll_start,
        viewport_height: 1000.0,
        section_top: 0.0,
        section_height: 5000.0,
    }
}

fn recording() -> (Arc<Mutex<Vec<FrameDiagnostic>>>, DiagnosticHook) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let hook: DiagnosticHook = Box::new(move |d| sink.lock().unwrap().push(d.clone()));
    (seen, hook)
}

/// Pixmap that counts blits.
struct CountingSurface {
    inner: PixmapSurface,
    blits: usize,
}

impl Surface for CountingSurface {
    fn viewport(&self) -> Viewport {
        self.inner.viewport()
    }

    fn resize(&mut self, viewport: Viewport) {
        self.inner.resize(viewport);
    }

    fn clear(&mut self, color: crate::foundation::core::Rgba8Premul) {
        self.inner.clear(color);
    }

    fn blit(&mut self, frame: &FrameImage, dest: Rect) {
        self.blits += 1;
        self.inner.blit(frame, dest);
    }
}

fn counting() -> CountingSurface {
    CountingSurface {
        inner: surface(),
        blits: 0,
    }
}

fn center_shade(p: &SequencePlayer<PixmapSurface>) -> u8 {
    p.surface().pixel(4, 4).unwrap()[0]
}

#[test]
fn construction_letterboxes_from_first_frame_and_draws_it() {
    let d = descriptor();
    let p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();

    assert_eq!(p.geometry(), Some(Rect::new(0.0, 2.0, 8.0, 6.0)));
    assert_eq!(p.current_frame(), 0);
    assert_eq!(center_shade(&p), shade(0));
    assert_eq!(p.surface().pixel(4, 0), Some([0, 0, 0, 255]));
    assert_eq!(p.current_year(), None);
}

#[test]
fn midpoint_scroll_selects_frame_239_and_year_2007() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();

    let u = p.on_scroll(&at(2000.0));
    assert_eq!(u.mapping.progress, 0.5);
    assert_eq!(u.mapping.frame, 239);
    assert!(u.redrawn);
    assert!(u.overlay_visible());
    assert_eq!(u.year.as_ref().map(|y| y.year), Some(2007));
    assert_eq!(p.current_frame(), 239);
    assert_eq!(p.current_year(), Some(2007));
    assert_eq!(center_shade(&p), shade(239));
}

#[test]
fn repeated_position_neither_redraws_nor_repeats_year() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();

    p.on_scroll(&at(2000.0));
    let again = p.on_scroll(&at(2000.4));
    assert_eq!(again.mapping.frame, 239);
    assert!(!again.redrawn);
    assert!(again.year.is_none());

    // Previous frame, same year.
    let next = p.on_scroll(&at(1995.0));
    assert_eq!(next.mapping.frame, 238);
    assert!(next.redrawn);
    assert!(next.year.is_none());
}

#[test]
fn frame_change_slides_prefetch_window() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();
    p.on_scroll(&at(2000.0));
    p.wait_idle();
    for i in 224..=254 {
        assert!(p.cached_frame(i).is_some(), "frame {i}");
    }
    assert!(p.cached_frame(223).is_none());
    assert!(p.cached_frame(255).is_none());
}

#[test]
fn scrolling_above_section_keeps_current_picture() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();
    p.on_scroll(&at(2000.0));

    let u = p.on_scroll(&at(-300.0));
    assert_eq!(u.mapping.phase, ScrollPhase::Before);
    assert_eq!(u.mapping.frame, 0);
    assert_eq!(u.mapping.progress, 0.0);
    assert!(!u.redrawn);
    assert!(!u.overlay_visible());
    assert!(u.year.is_none());
    assert_eq!(p.current_frame(), 239);
    assert_eq!(center_shade(&p), shade(239));
}

#[test]
fn scrolling_past_section_pins_last_frame_and_final_year() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();

    let u = p.on_scroll(&at(9000.0));
    assert_eq!(u.mapping.phase, ScrollPhase::After);
    assert_eq!(u.mapping.frame, 479);
    assert!(!u.overlay_visible());
    assert_eq!(u.year.map(|y| y.year), Some(2016));
    assert_eq!(center_shade(&p), shade(479));

    // Just short of the end the year follows the frame again.
    let back = p.on_scroll(&at(3990.0));
    assert_eq!(back.mapping.frame, 477);
    assert_eq!(back.year.map(|y| y.year), Some(2015));
}

#[test]
fn end_of_scroll_range_pins_final_year() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();

    let u = p.on_scroll(&at(4000.0));
    assert_eq!(u.mapping.phase, ScrollPhase::Within);
    assert_eq!(u.mapping.frame, 479);
    assert_eq!(u.year.map(|y| y.year), Some(2016));

    // Scrolling past the section keeps the same year, so no update.
    let past = p.on_scroll(&at(4500.0));
    assert_eq!(past.mapping.phase, ScrollPhase::After);
    assert!(past.year.is_none());
    assert_eq!(p.current_year(), Some(2016));
}

#[test]
fn failed_frame_falls_back_to_first_frame() {
    let d = descriptor();
    let (seen, hook) = recording();
    let mut p = SequencePlayer::builder(d.clone(), loader(&d, &[50]), surface())
        .opts(opts())
        .diagnostics(hook)
        .build()
        .unwrap();

    assert_eq!(p.draw(50), Some(0));
    assert!(p.cached_frame(50).is_none());
    assert_eq!(center_shade(&p), shade(0));

    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(|diag| matches!(
        diag,
        FrameDiagnostic::LoadFailed(f) if f.index == 50 && f.source == "hero/frame_0051.png"
    )));
    assert!(seen.contains(&FrameDiagnostic::FellBack {
        requested: 50,
        used: 0
    }));
}

#[test]
fn missing_first_frame_draws_full_surface() {
    let d = descriptor();
    let (seen, hook) = recording();
    let mut p = SequencePlayer::builder(d.clone(), loader(&d, &[0]), surface())
        .opts(opts())
        .diagnostics(hook)
        .build()
        .unwrap();

    assert_eq!(p.geometry(), None);
    assert_eq!(p.draw(3), Some(3));
    assert_eq!(p.surface().pixel(4, 0), Some([shade(3), shade(3), shade(3), 255]));

    let seen = seen.lock().unwrap();
    assert!(seen.contains(&FrameDiagnostic::GeometryUnavailable));
    assert!(seen.contains(&FrameDiagnostic::Skipped { requested: 0 }));
}

#[test]
fn year_updates_carry_injected_rankings() {
    let d = descriptor();
    let mut rows = BTreeMap::new();
    rows.insert(
        2007,
        vec![
            TopEntry {
                name: "Afghanistan".to_string(),
                value: 3_000_000.0,
            },
            TopEntry {
                name: "Iraq".to_string(),
                value: 2_300_000.0,
            },
        ],
    );
    let mut p = SequencePlayer::builder(d.clone(), loader(&d, &[]), surface())
        .opts(opts())
        .year_table(Arc::new(StaticYearTable::new(rows)))
        .build()
        .unwrap();

    let u = p.on_scroll(&at(2000.0));
    let year = u.year.unwrap();
    assert_eq!(year.year, 2007);
    assert_eq!(year.top.len(), 2);
    assert_eq!(year.top[0].name, "Afghanistan");

    let u = p.on_scroll(&at(0.0));
    assert_eq!(u.year.map(|y| (y.year, y.top.len())), Some((2000, 0)));
}

#[test]
fn signals_coalesce_into_one_tick() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();

    assert!(p.signal(PlayerSignal::Scroll(at(100.0))));
    assert!(!p.signal(PlayerSignal::Scroll(at(900.0))));
    assert!(!p.signal(PlayerSignal::Scroll(at(2000.0))));
    assert_eq!(p.coalesced_signals(), 2);

    let u = p.tick().unwrap();
    assert_eq!(u.mapping.frame, 239);
    assert!(p.tick().is_none());
}

#[test]
fn resize_recomputes_geometry_and_redraws() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), opts()).unwrap();
    p.on_scroll(&at(2000.0));

    p.signal(PlayerSignal::Resize {
        viewport: Viewport::new(16, 4).unwrap(),
        metrics: at(2000.0),
    });
    let u = p.tick().unwrap();
    assert!(u.redrawn);
    assert_eq!(p.geometry(), Some(Rect::new(4.0, 0.0, 12.0, 4.0)));
    assert_eq!(p.surface().pixel(8, 2).unwrap()[0], shade(239));
    assert_eq!(p.surface().pixel(1, 2), Some([0, 0, 0, 255]));
}

#[test]
fn invalid_options_fail_construction() {
    let d = descriptor();
    let bad = PlayerOpts {
        worker_threads: Some(0),
        ..PlayerOpts::default()
    };
    assert!(SequencePlayer::new(d.clone(), loader(&d, &[]), surface(), bad).is_err());
}

#[test]
fn resize_tick_draws_once_at_new_frame() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), counting(), opts()).unwrap();
    p.on_scroll(&at(2000.0));
    let before = p.surface().blits;

    p.signal(PlayerSignal::Resize {
        viewport: Viewport::new(16, 4).unwrap(),
        metrics: at(3000.0),
    });
    let u = p.tick().unwrap();
    assert_eq!(u.mapping.frame, 359);
    assert!(u.redrawn);
    assert_eq!(p.surface().blits, before + 1);
    assert_eq!(p.surface().inner.pixel(8, 2).unwrap()[0], shade(359));
}

#[test]
fn resize_tick_at_same_frame_still_draws_once() {
    let d = descriptor();
    let mut p = SequencePlayer::new(d.clone(), loader(&d, &[]), counting(), opts()).unwrap();
    p.on_scroll(&at(2000.0));
    let before = p.surface().blits;

    p.signal(PlayerSignal::Resize {
        viewport: Viewport::new(16, 4).unwrap(),
        metrics: at(2000.0),
    });
    p.tick().unwrap();
    assert_eq!(p.surface().blits, before + 1);
}

#[test]
fn degenerate_surface_is_not_reported_as_missing_geometry() {
    let d = descriptor();
    let (seen, hook) = recording();
    let mut p = SequencePlayer::builder(d.clone(), loader(&d, &[]), surface())
        .opts(opts())
        .diagnostics(hook)
        .build()
        .unwrap();

    p.resize(Viewport {
        width: 0,
        height: 0,
    });
    assert_eq!(p.geometry(), None);
    assert!(!seen.lock().unwrap().contains(&FrameDiagnostic::GeometryUnavailable));

    p.resize(Viewport::new(8, 8).unwrap());
    assert_eq!(p.geometry(), Some(Rect::new(0.0, 2.0, 8.0, 6.0)));
    assert_eq!(center_shade(&p), shade(0));
}
