//! Image engine (C15).
//!
//! Decodes embedded raster images (magic-byte format detection via the
//! `image` crate's own sniffing) and draws them through the crop/stretch/
//! tile geometry a picture fill or `p:pic` carries. Decoded bitmaps are
//! cached per relationship id in a small LRU, grounded on the package
//! layer's per-part caches (`Package::xml_cache`/`rels_cache`) but bounded
//! rather than unbounded, since a deck's media can run into hundreds of
//! megabytes uncompressed.

use crate::error::RenderError;
use crate::fill::{Fill, TileAlignment, TileFlip};
use crate::opc::Package;
use crate::raster::{Canvas, Rect};
use crate::units;
use log::warn;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::sync::Arc;

#[derive(Clone)]
pub struct DecodedImage {
    pub rgba: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

/// Decode bytes via magic-byte sniffing; the `image` crate does this
/// itself given `load_from_memory`, so this is mostly a named seam for the
/// error conversion the rest of the pipeline expects.
fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage, RenderError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| RenderError::ImageDecodeFailed(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    Ok(DecodedImage { rgba: Arc::new(rgba.into_raw()), width, height })
}

/// Least-recently-used cache of decoded bitmaps, capacity 50 per the
/// caching strategy: one per slide's image engine, never shared across
/// slides since the same relationship id can resolve to different media
/// on different slides.
struct LruCache {
    capacity: usize,
    entries: HashMap<String, DecodedImage>,
    recency: Vec<String>,
}

impl LruCache {
    fn new(capacity: usize) -> Self {
        Self { capacity, entries: HashMap::new(), recency: Vec::new() }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push(key.to_string());
    }

    fn get(&mut self, key: &str) -> Option<DecodedImage> {
        let found = self.entries.get(key).cloned();
        if found.is_some() {
            self.touch(key);
        }
        found
    }

    fn insert(&mut self, key: String, value: DecodedImage) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if let Some(oldest) = self.recency.first().cloned() {
                self.entries.remove(&oldest);
                self.recency.remove(0);
            }
        }
        self.touch(&key);
        self.entries.insert(key, value);
    }
}

/// Per-slide image engine. Owns its own cache — constructing a new one
/// per slide is the isolation boundary the caching strategy requires.
pub struct ImageEngine {
    cache: Mutex<LruCache>,
}

impl ImageEngine {
    pub fn new() -> Self {
        Self { cache: Mutex::new(LruCache::new(50)) }
    }

    fn decode_cached<R: Read + Seek>(
        &self,
        package: &Package<R>,
        part_path: &str,
        rel_id: &str,
    ) -> Result<DecodedImage, RenderError> {
        if let Some(hit) = self.cache.lock().get(rel_id) {
            return Ok(hit);
        }
        let media_path = package.resolve_rel(part_path, rel_id)?;
        let bytes = package.read_bytes(&media_path)?;
        let decoded = decode_bytes(&bytes)?;
        self.cache.lock().insert(rel_id.to_string(), decoded.clone());
        Ok(decoded)
    }

    /// Draw a picture fill's image into `dest`, honoring `srcRect` crop,
    /// `stretch`/`fillRect`, and `tile` as documented. `part_path` is the
    /// slide/layout/master part the relationship id is relative to.
    pub fn render<R: Read + Seek>(
        &self,
        canvas: &mut dyn Canvas,
        package: &Package<R>,
        part_path: &str,
        fill: &Fill,
        dest: Rect,
    ) -> Result<(), RenderError> {
        let Fill::Picture { rel_id, src_rect, tile, fill_rect, .. } = fill else {
            return Ok(());
        };
        let image = match self.decode_cached(package, part_path, rel_id) {
            Ok(img) => img,
            Err(e) => {
                warn!("image decode/relationship failed for {rel_id} in {part_path}: {e}");
                return Ok(());
            }
        };

        let (src_x, src_y, src_w, src_h) = crop_rect(&image, src_rect.as_ref());
        if src_w == 0 || src_h == 0 {
            return Ok(());
        }
        let cropped = crop_pixels(&image, src_x, src_y, src_w, src_h);

        if let Some(tile) = tile {
            draw_tiled(canvas, &cropped, src_w, src_h, tile, dest);
        } else {
            let target = fill_rect
                .as_ref()
                .map(|fr| expand_rect(dest, fr))
                .unwrap_or(dest);
            canvas.draw_image(&cropped, src_w, src_h, target);
        }
        Ok(())
    }
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn crop_rect(image: &DecodedImage, src_rect: Option<&crate::fill::EdgeInset>) -> (u32, u32, u32, u32) {
    let Some(r) = src_rect else {
        return (0, 0, image.width, image.height);
    };
    let w = image.width as f64;
    let h = image.height as f64;
    let src_x = (w * r.l).max(0.0) as u32;
    let src_y = (h * r.t).max(0.0) as u32;
    let src_w = (w * (1.0 - r.l - r.r)).max(0.0) as u32;
    let src_h = (h * (1.0 - r.t - r.b)).max(0.0) as u32;
    (
        src_x.min(image.width),
        src_y.min(image.height),
        src_w.min(image.width.saturating_sub(src_x)),
        src_h.min(image.height.saturating_sub(src_y)),
    )
}

fn crop_pixels(image: &DecodedImage, x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
    if x == 0 && y == 0 && w == image.width && h == image.height {
        return (*image.rgba).clone();
    }
    let mut out = Vec::with_capacity(w as usize * h as usize * 4);
    for row in y..y + h {
        let row_start = (row * image.width + x) as usize * 4;
        let row_end = row_start + w as usize * 4;
        out.extend_from_slice(&image.rgba[row_start..row_end]);
    }
    out
}

fn expand_rect(dest: Rect, fill_rect: &crate::fill::EdgeInset) -> Rect {
    Rect::new(
        dest.x - dest.w * fill_rect.l,
        dest.y - dest.h * fill_rect.t,
        dest.w * (1.0 + fill_rect.l + fill_rect.r),
        dest.h * (1.0 + fill_rect.t + fill_rect.b),
    )
}

fn draw_tiled(canvas: &mut dyn Canvas, rgba: &[u8], src_w: u32, src_h: u32, tile: &crate::fill::TileInfo, dest: Rect) {
    let tile_w = src_w as f64 * tile.scale_x;
    let tile_h = src_h as f64 * tile.scale_y;
    if tile_w <= 0.0 || tile_h <= 0.0 {
        warn!("tile fill has non-positive tile dimensions ({tile_w}x{tile_h}); skipping");
        return;
    }

    let offset_x = units::emu_to_px(tile.offset_x_emu, units::DEFAULT_DPI).rem_euclid(tile_w);
    let offset_y = units::emu_to_px(tile.offset_y_emu, units::DEFAULT_DPI).rem_euclid(tile_h);

    let start_x = match tile.alignment {
        TileAlignment::TopRight | TileAlignment::BottomRight => {
            dest.x + dest.w - (((dest.w - offset_x) / tile_w).ceil() * tile_w) - offset_x
        }
        TileAlignment::Center => dest.x + dest.w / 2.0 - tile_w / 2.0,
        _ => dest.x - offset_x,
    };
    let start_y = match tile.alignment {
        TileAlignment::BottomLeft | TileAlignment::BottomRight => {
            dest.y + dest.h - (((dest.h - offset_y) / tile_h).ceil() * tile_h) - offset_y
        }
        TileAlignment::Center => dest.y + dest.h / 2.0 - tile_h / 2.0,
        _ => dest.y - offset_y,
    };

    let mut row = 0i64;
    let mut y = start_y;
    while y < dest.y + dest.h {
        let mut col = 0i64;
        let mut x = start_x;
        while x < dest.x + dest.w {
            let flip_x = tile.flip.contains(TileFlip::X) && col % 2 != 0;
            let flip_y = tile.flip.contains(TileFlip::Y) && row % 2 != 0;
            let tile_rect = Rect::new(x, y, tile_w, tile_h);
            if let Some(clipped) = clip_to_dest(tile_rect, dest) {
                let pixels = if flip_x || flip_y {
                    flip_pixels(rgba, src_w, src_h, flip_x, flip_y)
                } else {
                    rgba.to_vec()
                };
                canvas.draw_image(&pixels, src_w, src_h, clipped);
            }
            x += tile_w;
            col += 1;
        }
        y += tile_h;
        row += 1;
    }
}

fn clip_to_dest(tile_rect: Rect, dest: Rect) -> Option<Rect> {
    let x0 = tile_rect.x.max(dest.x);
    let y0 = tile_rect.y.max(dest.y);
    let x1 = (tile_rect.x + tile_rect.w).min(dest.x + dest.w);
    let y1 = (tile_rect.y + tile_rect.h).min(dest.y + dest.h);
    if x1 > x0 && y1 > y0 {
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    } else {
        None
    }
}

fn flip_pixels(rgba: &[u8], w: u32, h: u32, flip_x: bool, flip_y: bool) -> Vec<u8> {
    let mut out = vec![0u8; rgba.len()];
    for row in 0..h {
        let src_row = if flip_y { h - 1 - row } else { row };
        for col in 0..w {
            let src_col = if flip_x { w - 1 - col } else { col };
            let dst_idx = ((row * w + col) * 4) as usize;
            let src_idx = ((src_row * w + src_col) * 4) as usize;
            out[dst_idx..dst_idx + 4].copy_from_slice(&rgba[src_idx..src_idx + 4]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::EdgeInset;

    fn test_image(w: u32, h: u32) -> DecodedImage {
        DecodedImage { rgba: Arc::new(vec![255u8; (w * h * 4) as usize]), width: w, height: h }
    }

    #[test]
    fn crop_rect_trims_by_percentage_from_each_edge() {
        let img = test_image(100, 100);
        let inset = EdgeInset { l: 0.1, t: 0.0, r: 0.1, b: 0.0 };
        let (x, y, w, h) = crop_rect(&img, Some(&inset));
        assert_eq!((x, y, w, h), (10, 0, 80, 100));
    }

    #[test]
    fn crop_rect_without_src_rect_is_full_image() {
        let img = test_image(50, 40);
        assert_eq!(crop_rect(&img, None), (0, 0, 50, 40));
    }

    #[test]
    fn lru_cache_evicts_least_recently_used_entry() {
        let mut cache = LruCache::new(2);
        cache.insert("a".to_string(), test_image(1, 1));
        cache.insert("b".to_string(), test_image(1, 1));
        cache.get("a");
        cache.insert("c".to_string(), test_image(1, 1));
        assert!(cache.entries.contains_key("a"));
        assert!(!cache.entries.contains_key("b"));
        assert!(cache.entries.contains_key("c"));
    }

    #[test]
    fn flip_pixels_reverses_rows_on_y_flip() {
        let mut rgba = vec![0u8; 2 * 2 * 4];
        rgba[0] = 1; // top-left pixel marker
        let flipped = flip_pixels(&rgba, 2, 2, false, true);
        assert_eq!(flipped[(2 * 4)], 1); // marker now on bottom-left
    }
}
