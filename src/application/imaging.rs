use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use base64::{prelude::BASE64_STANDARD, Engine};
use image::{imageops::FilterType, ImageFormat, ImageReader, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};

use crate::domain::detection::Detection;

const BOX_COLOR: image::Rgb<u8> = image::Rgb([102, 126, 234]);
const TEXT_COLOR: image::Rgb<u8> = image::Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 3;
const LABEL_SCALE: f32 = 16.0;
const LABEL_PADDING: u32 = 2;

static LABEL_FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

fn label_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(LABEL_FONT_BYTES) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!(error = %e, "label font unusable, boxes are drawn without captions");
            None
        }
    })
    .as_ref()
}

pub fn decode_file(path: &Path) -> Result<RgbImage, image::ImageError> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgb8())
}

/// Downsizes to fit inside `max_w`×`max_h`, keeping the aspect ratio. Never upscales.
pub fn fit_within(image: RgbImage, max_w: u32, max_h: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w <= max_w && h <= max_h {
        return image;
    }
    let ratio = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
    let nw = ((w as f64 * ratio) as u32).max(1);
    let nh = ((h as f64 * ratio) as u32).max(1);
    image::imageops::resize(&image, nw, nh, FilterType::Triangle)
}

/// Draws a thick outline around every detection, captioned with
/// `"{label} {confidence:.2}"` on a filled bar above the box.
pub fn draw_detections(image: &mut RgbImage, detections: &[Detection]) {
    let (w, h) = image.dimensions();
    for det in detections {
        let x1 = det.bbox.x1.clamp(0, w as i32);
        let y1 = det.bbox.y1.clamp(0, h as i32);
        let x2 = det.bbox.x2.clamp(0, w as i32);
        let y2 = det.bbox.y2.clamp(0, h as i32);

        for t in 0..BOX_THICKNESS {
            let rw = (x2 - x1) + 2 * t;
            let rh = (y2 - y1) + 2 * t;
            if rw <= 0 || rh <= 0 {
                continue;
            }
            let rect = Rect::at(x1 - t, y1 - t).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }

        if let Some(font) = label_font() {
            let caption = format!("{} {:.2}", det.class_name, det.confidence);
            draw_caption(image, font, x1, y1, &caption);
        }
    }
}

// Sits on top of the box, or just inside it when the box touches the top edge.
fn draw_caption(image: &mut RgbImage, font: &FontRef<'_>, x: i32, box_top: i32, caption: &str) {
    let scale = PxScale::from(LABEL_SCALE);
    let (text_w, text_h) = text_size(scale, font, caption);
    let bar_w = text_w + 2 * LABEL_PADDING;
    let bar_h = text_h + 2 * LABEL_PADDING;

    let above = box_top - bar_h as i32;
    let bar_y = if above >= 0 { above } else { box_top };

    draw_filled_rect_mut(image, Rect::at(x, bar_y).of_size(bar_w, bar_h), BOX_COLOR);
    draw_text_mut(
        image,
        TEXT_COLOR,
        x + LABEL_PADDING as i32,
        bar_y + LABEL_PADDING as i32,
        scale,
        font,
        caption,
    );
}

pub fn png_base64(image: &RgbImage) -> Result<String, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(BASE64_STANDARD.encode(buf.into_inner()))
}
