//! The render's output accumulation buffer and the work-queue ordering
//! `Scene::render` walks it in.
//!
//! Buckets are visited in a spiral outward from the image center, the way
//! this renderer keeps a progressively-filling preview readable rather
//! than filling top-to-bottom.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Tile the image into `bucket_size`-edged squares (the last row/column
/// may be smaller) and order them in a spiral outward from the center, so
/// a render's early progress covers the part of the frame most likely to
/// hold the subject.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let cols = (width + bucket_size - 1) / bucket_size;
    let rows = (height + bucket_size - 1) / bucket_size;

    let center_col = (cols - 1) as f64 / 2.0;
    let center_row = (rows - 1) as f64 / 2.0;

    let mut cells: Vec<(u32, u32)> = (0..rows).flat_map(|r| (0..cols).map(move |c| (c, r))).collect();
    cells.sort_by(|&(c0, r0), &(c1, r1)| {
        let d0 = (c0 as f64 - center_col).powi(2) + (r0 as f64 - center_row).powi(2);
        let d1 = (c1 as f64 - center_col).powi(2) + (r1 as f64 - center_row).powi(2);
        d0.partial_cmp(&d1).unwrap()
    });

    cells
        .into_iter()
        .map(|(c, r)| {
            let x = c * bucket_size;
            let y = r * bucket_size;
            Bucket {
                x,
                y,
                width: bucket_size.min(width - x),
                height: bucket_size.min(height - y),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct PixelAccum {
    sum: [f32; 3],
    count: u32,
}

/// The render's accumulation buffer. Workers accumulate a bucket's pixels
/// entirely locally, then take the lock once to fold the whole tile in —
/// not once per sample — so contention scales with bucket count, not ray
/// count.
pub struct Film {
    width: u32,
    height: u32,
    pixels: Mutex<Vec<PixelAccum>>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Mutex::new(vec![PixelAccum::default(); (width * height) as usize]),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fold one bucket's locally-accumulated samples into the shared
    /// buffer. `samples` must be `bucket.width * bucket.height` long, in
    /// row-major order starting at the bucket's top-left pixel, each
    /// entry a (color sum, sample count) pair.
    pub fn flush_bucket(&self, bucket: &Bucket, samples: &[([f32; 3], u32)]) {
        debug_assert_eq!(samples.len(), (bucket.width * bucket.height) as usize);
        let mut pixels = self.pixels.lock().unwrap();
        for (i, &(sum, count)) in samples.iter().enumerate() {
            let local_x = i as u32 % bucket.width;
            let local_y = i as u32 / bucket.width;
            let px = bucket.x + local_x;
            let py = bucket.y + local_y;
            let idx = (py * self.width + px) as usize;
            let accum = &mut pixels[idx];
            accum.sum[0] += sum[0];
            accum.sum[1] += sum[1];
            accum.sum[2] += sum[2];
            accum.count += count;
        }
    }

    /// Resolve the buffer to averaged RGB, row-major, black for any pixel
    /// that received no samples.
    pub fn resolve(&self) -> Vec<[f32; 3]> {
        let pixels = self.pixels.lock().unwrap();
        pixels
            .iter()
            .map(|p| {
                if p.count == 0 {
                    [0.0, 0.0, 0.0]
                } else {
                    let n = p.count as f32;
                    [p.sum[0] / n, p.sum[1] / n, p.sum[2] / n]
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_buckets_tile_the_whole_image_without_overlap() {
        let buckets = generate_buckets(100, 67, 32);
        let mut covered = HashSet::new();
        for b in &buckets {
            for y in b.y..b.y + b.height {
                for x in b.x..b.x + b.width {
                    assert!(covered.insert((x, y)), "pixel ({x},{y}) covered twice");
                }
            }
        }
        assert_eq!(covered.len(), 100 * 67);
    }

    #[test]
    fn test_bucket_order_starts_near_center() {
        let buckets = generate_buckets(320, 320, 32);
        let first = buckets.first().unwrap();
        // The center bucket's top-left corner should be close to the
        // image center, not at a corner.
        let cx = first.x as f32 + first.width as f32 / 2.0;
        let cy = first.y as f32 + first.height as f32 / 2.0;
        assert!((cx - 160.0).abs() < 32.0);
        assert!((cy - 160.0).abs() < 32.0);
    }

    #[test]
    fn test_flush_and_resolve_averages_samples() {
        let film = Film::new(2, 1);
        let bucket = Bucket {
            x: 0,
            y: 0,
            width: 2,
            height: 1,
        };
        film.flush_bucket(&bucket, &[([2.0, 2.0, 2.0], 2), ([0.0, 0.0, 0.0], 0)]);
        let resolved = film.resolve();
        assert_eq!(resolved[0], [1.0, 1.0, 1.0]);
        assert_eq!(resolved[1], [0.0, 0.0, 0.0]);
    }
}
