//! RGBA bitmaps and their palette-indexed counterpart, grounded on
//! `hdmv_bitmap.c`/`hdmv_paletized_bitmap.c`.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::palette::Palette;
use crate::rect::Rect;

pub const MIN_DIM: u32 = 8;
pub const MAX_DIM: u32 = 4096;

fn check_dims(width: u32, height: u32) -> Result<()> {
    if !(MIN_DIM..=MAX_DIM).contains(&width) || !(MIN_DIM..=MAX_DIM).contains(&height) {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(())
}

/// A row-major RGBA32 canvas that owns its buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    data: Vec<u32>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_dims(width, height)?;
        Ok(Bitmap { width, height, data: vec![0u32; (width * height) as usize] })
    }

    pub fn pixels(&self) -> &[u32] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, rgba: u32) {
        self.data[(y * self.width + x) as usize] = rgba;
    }

    /// Extract a sub-rectangle as a new owned bitmap, bounds-checked like
    /// `init`.
    pub fn crop_copy(&self, rect: Rect) -> Result<Bitmap> {
        check_dims(rect.w as u32, rect.h as u32)?;
        let mut out = Bitmap::new(rect.w as u32, rect.h as u32)?;
        for row in 0..rect.h as u32 {
            for col in 0..rect.w as u32 {
                let src = self.get(rect.x as u32 + col, rect.y as u32 + row);
                out.set(col, row, src);
            }
        }
        Ok(out)
    }

    pub fn dup(&self) -> Bitmap {
        self.clone()
    }
}

/// Row-major uint8 index buffer; indices reference a logically associated
/// [`Palette`] (the association is by convention, not an owning reference,
/// matching the source's separate `HdmvPalette`/`HdmvPalletizedBitmap`
/// structs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalletisedBitmap {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl PalletisedBitmap {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_dims(width, height)?;
        Ok(PalletisedBitmap { width, height, data: vec![0u8; (width * height) as usize] })
    }

    pub fn indices(&self) -> &[u8] {
        &self.data
    }

    pub fn indices_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, idx: u8) {
        self.data[(y * self.width + x) as usize] = idx;
    }
}

fn squared_rgba_distance(a: u32, b: u32) -> i64 {
    let da = [
        ((a >> 24) & 0xFF) as i64 - ((b >> 24) & 0xFF) as i64,
        ((a >> 16) & 0xFF) as i64 - ((b >> 16) & 0xFF) as i64,
        ((a >> 8) & 0xFF) as i64 - ((b >> 8) & 0xFF) as i64,
        (a & 0xFF) as i64 - (b & 0xFF) as i64,
    ];
    da.iter().map(|d| d * d).sum()
}

/// Pick the in-use palette entry nearest `rgba` in squared Euclidean
/// distance over all four channels — alpha is one of the four, so a fully
/// transparent pixel naturally prefers a transparent palette entry over an
/// opaque one at the same RGB distance, the same way
/// `_findNearestColorPalette` folds alpha into its squared error term
/// rather than special-casing alpha==0. Index `0xFF` is returned only when
/// the palette has no in-use entries at all.
fn nearest_entry(rgba: u32, palette: &Palette) -> u8 {
    let mut best_id: Option<u8> = None;
    let mut best_dist = i64::MAX;
    for (id, entry) in palette.in_use_entries() {
        let dist = squared_rgba_distance(rgba, entry.rgba);
        if dist < best_dist {
            best_dist = dist;
            best_id = Some(id);
        }
    }
    best_id.unwrap_or(0xFF)
}

fn channels(rgba: u32) -> [i32; 4] {
    [
        ((rgba >> 24) & 0xFF) as i32,
        ((rgba >> 16) & 0xFF) as i32,
        ((rgba >> 8) & 0xFF) as i32,
        (rgba & 0xFF) as i32,
    ]
}

fn pack_channels(c: [i32; 4]) -> u32 {
    let clamp = |v: i32| v.clamp(0, 255) as u32;
    (clamp(c[0]) << 24) | (clamp(c[1]) << 16) | (clamp(c[2]) << 8) | clamp(c[3])
}

/// Quantise `bitmap` against `palette`, optionally applying Floyd–Steinberg
/// dithering (`apply_palette`). With dithering, the signed quantisation
/// error is propagated in the (7,3,5,1)/16 fractions to the east,
/// south-west, south, and south-east neighbours of a working copy;
/// boundary pixels are quantised without propagation.
pub fn apply_palette(bitmap: &Bitmap, palette: &Palette, dither: bool) -> PalletisedBitmap {
    let w = bitmap.width;
    let h = bitmap.height;
    let mut out = PalletisedBitmap::new(w, h).expect("dimensions already validated by caller");

    if !dither {
        for y in 0..h {
            for x in 0..w {
                let id = nearest_entry(bitmap.get(x, y), palette);
                out.set(x, y, id);
            }
        }
        return out;
    }

    // Working copy in signed-channel space so error accumulation can go
    // negative/over 255 before the next pixel is quantised.
    let mut work: Vec<[i32; 4]> = bitmap.pixels().iter().map(|&p| channels(p)).collect();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let working_rgba = pack_channels(work[idx]);
            let id = nearest_entry(working_rgba, palette);
            out.set(x, y, id);

            let quantized = palette.entry(id).map(|e| e.rgba).unwrap_or(0);
            let qc = channels(quantized);
            let err = [
                work[idx][0] - qc[0],
                work[idx][1] - qc[1],
                work[idx][2] - qc[2],
                work[idx][3] - qc[3],
            ];

            let mut propagate = |dx: i32, dy: i32, num: i32| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 || nx as u32 >= w || ny as u32 >= h {
                    return;
                }
                let nidx = (ny as u32 * w + nx as u32) as usize;
                for c in 0..4 {
                    work[nidx][c] += err[c] * num / 16;
                }
            };
            propagate(1, 0, 7);
            propagate(-1, 1, 3);
            propagate(0, 1, 5);
            propagate(1, 1, 1);
        }
    }

    out
}
