use crate::config::DewarpConfig;
use crate::error::DewarpError;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Ink value in the binary mask
pub const FOREGROUND: u8 = 0;
/// Paper value in the binary mask
pub const BACKGROUND: u8 = 255;

const HIST_SIZE: usize = 256;

/// Convert a grayscale page into a two-valued ink/paper mask
///
/// Uneven illumination is flattened with CLAHE first, then Otsu picks a
/// single global level; pixels above it become paper.
pub fn binarize(page: &GrayImage, config: &DewarpConfig) -> Result<GrayImage, DewarpError> {
    let (width, height) = page.dimensions();
    if width == 0 || height == 0 {
        return Err(DewarpError::InvalidInput(format!(
            "page is empty ({}x{})",
            width, height
        )));
    }

    let enhanced = clahe(page, config.clahe_clip_limit, config.clahe_tiles);
    let level = otsu_level(&enhanced);
    tracing::debug!(level, "Otsu level computed");

    Ok(GrayImage::from_fn(width, height, |x, y| {
        if enhanced.get_pixel(x, y).0[0] > level {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    }))
}

/// Contrast-limited adaptive histogram equalization
///
/// The image is virtually padded (reflect-101) on the right and bottom to a
/// multiple of the tile grid. Each tile gets its own clipped equalization
/// table and pixels blend the four nearest tables bilinearly.
fn clahe(img: &GrayImage, clip_limit: f64, tiles: (u32, u32)) -> GrayImage {
    let (width, height) = img.dimensions();
    let (tiles_x, tiles_y) = (tiles.0 as usize, tiles.1 as usize);

    let padded_w = round_up(width as usize, tiles_x);
    let padded_h = round_up(height as usize, tiles_y);
    let tile_w = padded_w / tiles_x;
    let tile_h = padded_h / tiles_y;
    let tile_area = tile_w * tile_h;

    let clip = ((clip_limit * tile_area as f64 / HIST_SIZE as f64) as usize).max(1);
    let lut_scale = 255.0 / tile_area as f64;

    let mut luts = vec![[0u8; HIST_SIZE]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0usize; HIST_SIZE];
            for py in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect101(py, height as usize) as u32;
                for px in tx * tile_w..(tx + 1) * tile_w {
                    let sx = reflect101(px, width as usize) as u32;
                    hist[img.get_pixel(sx, sy).0[0] as usize] += 1;
                }
            }

            clip_histogram(&mut hist, clip);

            let lut = &mut luts[ty * tiles_x + tx];
            let mut sum = 0usize;
            for (value, count) in hist.iter().enumerate() {
                sum += count;
                lut[value] = (sum as f64 * lut_scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let inv_tw = 1.0 / tile_w as f64;
    let inv_th = 1.0 / tile_h as f64;

    GrayImage::from_fn(width, height, |x, y| {
        let (tx1, tx2, xa) = tile_neighbours(x as f64 * inv_tw - 0.5, tiles_x);
        let (ty1, ty2, ya) = tile_neighbours(y as f64 * inv_th - 0.5, tiles_y);
        let v = img.get_pixel(x, y).0[0] as usize;

        let top = luts[ty1 * tiles_x + tx1][v] as f64 * (1.0 - xa)
            + luts[ty1 * tiles_x + tx2][v] as f64 * xa;
        let bottom = luts[ty2 * tiles_x + tx1][v] as f64 * (1.0 - xa)
            + luts[ty2 * tiles_x + tx2][v] as f64 * xa;
        let value = top * (1.0 - ya) + bottom * ya;

        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Cap every bin at `clip` and spread the excess back over the histogram
fn clip_histogram(hist: &mut [usize; HIST_SIZE], clip: usize) {
    let mut clipped = 0usize;
    for count in hist.iter_mut() {
        if *count > clip {
            clipped += *count - clip;
            *count = clip;
        }
    }

    let batch = clipped / HIST_SIZE;
    let mut residual = clipped - batch * HIST_SIZE;
    for count in hist.iter_mut() {
        *count += batch;
    }

    if residual > 0 {
        let stride = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += stride;
        }
    }
}

/// Two neighbouring tile indices and the blend weight of the second
fn tile_neighbours(pos: f64, tiles: usize) -> (usize, usize, f64) {
    let lower = pos.floor();
    let weight = pos - lower;
    let first = (lower as i64).max(0) as usize;
    let second = ((lower as i64 + 1).max(0) as usize).min(tiles - 1);
    (first.min(tiles - 1), second, weight)
}

/// Reflect-101 border index (c b | a b c d | c b)
fn reflect101(index: usize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * len - 2;
    let m = index % period;
    if m >= len {
        period - m
    } else {
        m
    }
}

fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}
