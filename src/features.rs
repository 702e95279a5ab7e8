//! Shi-Tomasi corner selection restricted to horizontal bands of the frame.

use nalgebra as na;
use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};

use crate::frame::Frame;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeatureParams {
    pub max_corners: usize,
    /// Fraction of the strongest corner response a corner must exceed.
    pub quality_level: f32,
    /// Minimum euclidean distance between returned corners, px.
    pub min_distance: f32,
    pub block_size: usize,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.3,
            min_distance: 3.0,
            block_size: 7,
        }
    }
}

/// Row bands `[start, end)` eligible for feature selection. Bands are clipped
/// to the frame height.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeatureMask {
    pub bands: Vec<(usize, usize)>,
}

impl Default for FeatureMask {
    fn default() -> Self {
        Self {
            bands: vec![(0, 20), (900, 1050)],
        }
    }
}

impl FeatureMask {
    pub fn new(bands: Vec<(usize, usize)>) -> Self {
        Self { bands }
    }

    #[inline]
    pub fn contains_row(&self, y: usize) -> bool {
        self.bands.iter().any(|&(start, end)| y >= start && y < end)
    }

    /// Ascending rows covered by the mask, each band grown by `margin`.
    pub fn rows(&self, height: usize, margin: usize) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .bands
            .iter()
            .flat_map(|&(start, end)| {
                start.saturating_sub(margin)..end.saturating_add(margin).min(height)
            })
            .collect();

        rows.sort_unstable();
        rows.dedup();
        rows
    }
}

#[inline(always)]
fn at(img: &Array2<f32>, y: isize, x: isize) -> f32 {
    let (h, w) = img.dim();
    let y = y.clamp(0, h as isize - 1) as usize;
    let x = x.clamp(0, w as isize - 1) as usize;

    img[[y, x]]
}

fn sobel(img: &Array2<f32>, y: usize, x: usize) -> (f32, f32) {
    let (y, x) = (y as isize, x as isize);

    let gx = (at(img, y - 1, x + 1) + 2.0 * at(img, y, x + 1) + at(img, y + 1, x + 1))
        - (at(img, y - 1, x - 1) + 2.0 * at(img, y, x - 1) + at(img, y + 1, x - 1));
    let gy = (at(img, y + 1, x - 1) + 2.0 * at(img, y + 1, x) + at(img, y + 1, x + 1))
        - (at(img, y - 1, x - 1) + 2.0 * at(img, y - 1, x) + at(img, y - 1, x + 1));

    (gx, gy)
}

/// Minimum eigenvalue of the gradient covariance over a `block_size` window,
/// zero outside the mask.
pub fn min_eigen_response(frame: &Frame, mask: &FeatureMask, block_size: usize) -> Array2<f32> {
    let img = frame.to_f32();
    let (h, w) = img.dim();
    let half = (block_size / 2) as isize;

    let mut dxx = Array2::<f32>::zeros((h, w));
    let mut dxy = Array2::<f32>::zeros((h, w));
    let mut dyy = Array2::<f32>::zeros((h, w));

    for y in mask.rows(h, half as usize) {
        for x in 0..w {
            let (gx, gy) = sobel(&img, y, x);
            dxx[[y, x]] = gx * gx;
            dxy[[y, x]] = gx * gy;
            dyy[[y, x]] = gy * gy;
        }
    }

    let norm = 1.0 / (block_size * block_size) as f32;
    let mut response = Array2::<f32>::zeros((h, w));

    for y in mask.rows(h, 0) {
        for x in 0..w {
            let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);

            for wy in -half..=half {
                for wx in -half..=half {
                    let (yy, xx) = (y as isize + wy, x as isize + wx);
                    a += at(&dxx, yy, xx);
                    b += at(&dxy, yy, xx);
                    c += at(&dyy, yy, xx);
                }
            }

            let (a, b, c) = (a * norm, b * norm, c * norm);
            let half_trace = (a + c) * 0.5;
            let half_diff = (a - c) * 0.5;

            response[[y, x]] = (half_trace - (half_diff * half_diff + b * b).sqrt()).max(0.0);
        }
    }

    response
}

fn is_local_max(response: &Array2<f32>, y: usize, x: usize) -> bool {
    let val = response[[y, x]];
    let (y, x) = (y as isize, x as isize);

    for dy in -1..=1 {
        for dx in -1..=1 {
            if (dy != 0 || dx != 0) && at(response, y + dy, x + dx) > val {
                return false;
            }
        }
    }

    true
}

/// Strongest corners within the mask, strongest first.
pub fn good_features_to_track(
    frame: &Frame,
    mask: &FeatureMask,
    params: &FeatureParams,
) -> Vec<na::Point2<f32>> {
    if frame.is_empty() || params.max_corners == 0 {
        return Vec::new();
    }

    let response = min_eigen_response(frame, mask, params.block_size.max(1));
    let max_response = response.iter().copied().fold(0.0f32, f32::max);

    if max_response <= 0.0 {
        return Vec::new();
    }

    let threshold = max_response * params.quality_level;
    let height = frame.height();

    let mut candidates = Vec::new();
    for y in mask.rows(height, 0) {
        for x in 0..frame.width() {
            let val = response[[y, x]];

            if val > threshold && is_local_max(&response, y, x) {
                candidates.push((val, na::Point2::new(x as f32, y as f32)));
            }
        }
    }

    // stable: equal responses keep row-major order
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

    let min_dist2 = params.min_distance * params.min_distance;
    let mut corners: Vec<na::Point2<f32>> = Vec::with_capacity(params.max_corners);

    for (_, p) in candidates {
        if corners
            .iter()
            .all(|c| na::distance_squared(c, &p) >= min_dist2)
        {
            corners.push(p);

            if corners.len() == params.max_corners {
                break;
            }
        }
    }

    corners
}
