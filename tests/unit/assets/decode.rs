use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_dimensions_and_premul() {
    let prepared = decode_image(&png_bytes(1, 1, [100, 50, 200, 128])).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_reports_aspect_ratio() {
    let prepared = decode_image(&png_bytes(16, 9, [0, 0, 0, 255])).unwrap();
    let ar = prepared.aspect_ratio().unwrap();
    assert!((ar - 16.0 / 9.0).abs() < 1e-12);
}

#[test]
fn decode_rejects_garbage_and_empty() {
    assert!(matches!(decode_image(&[]), Err(ReelError::Decode(_))));
    assert!(decode_image(b"not an image").is_err());
}
