use super::binarize::BACKGROUND;
use super::curve::FittedCurve;
use crate::config::DewarpConfig;
use image::{imageops, DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

/// Stack rectified strips top to bottom, each followed by a padding band
///
/// With no strips the binary mask itself is returned unchanged.
pub fn assemble_page(mask: &GrayImage, strips: &[GrayImage], config: &DewarpConfig) -> GrayImage {
    if strips.is_empty() {
        return mask.clone();
    }

    let width = mask.width();
    let total_height: u32 = strips
        .iter()
        .map(|s| s.height() + config.line_padding)
        .sum();
    let mut page = GrayImage::from_pixel(width, total_height, Luma([BACKGROUND]));

    let mut y_offset = 0i64;
    for strip in strips {
        imageops::replace(&mut page, strip, 0, y_offset);
        y_offset += (strip.height() + config.line_padding) as i64;
    }

    page
}

/// Draw each fitted curve as a polyline over an RGB copy of the mask
///
/// Curves are evaluated across the full page width, so segments are clipped
/// to the image before rasterizing; extrapolated ends can sit far off-page.
pub fn draw_overlay(mask: &GrayImage, curves: &[&FittedCurve], config: &DewarpConfig) -> RgbImage {
    let (width, height) = mask.dimensions();
    let mut overlay = DynamicImage::ImageLuma8(mask.clone()).to_rgb8();
    let color = Rgb(config.overlay_color);

    for curve in curves {
        let vertices: Vec<(f64, f64)> = (0..width)
            .step_by(config.overlay_step as usize)
            .filter_map(|x| {
                let y = curve.eval(x as f64);
                // Vertices snap to whole pixels
                y.is_finite().then(|| (x as f64, y.trunc()))
            })
            .collect();

        for segment in vertices.windows(2) {
            let (start, end) = (segment[0], segment[1]);
            for dy in 0..config.overlay_thickness {
                let dy = dy as f64;
                let stroke = (start.0, start.1 + dy);
                let stroke_end = (end.0, end.1 + dy);
                if let Some((a, b)) = clip_segment(stroke, stroke_end, width, height) {
                    draw_line_segment_mut(&mut overlay, a, b, color);
                }
            }
        }
    }

    overlay
}

/// Liang-Barsky clip of a segment to `[0, width - 1] x [0, height - 1]`
///
/// Returns `None` when no part of the segment lies inside.
fn clip_segment(
    start: (f64, f64),
    end: (f64, f64),
    width: u32,
    height: u32,
) -> Option<((f32, f32), (f32, f32))> {
    let x_max = width as f64 - 1.0;
    let y_max = height as f64 - 1.0;
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);

    let mut enter = 0.0f64;
    let mut leave = 1.0f64;
    let edges = [
        (-dx, start.0),
        (dx, x_max - start.0),
        (-dy, start.1),
        (dy, y_max - start.1),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            // Parallel to this edge and outside it
            if q < 0.0 {
                return None;
            }
        } else if p < 0.0 {
            enter = enter.max(q / p);
        } else {
            leave = leave.min(q / p);
        }
    }
    if enter > leave {
        return None;
    }

    let at = |t: f64| ((start.0 + t * dx) as f32, (start.1 + t * dy) as f32);
    Some((at(enter), at(leave)))
}
