//! Pyramidal Lucas-Kanade sparse optical flow.

use nalgebra as na;
use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};

use crate::frame::Frame;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FlowParams {
    /// Search window edge, px. Odd sizes are centered on the feature.
    pub window_size: usize,
    /// Number of pyramid levels above the full resolution image.
    pub max_level: usize,
    pub max_iterations: usize,
    /// Stop iterating once the update is shorter than this, px.
    pub epsilon: f32,
    /// Features whose normalized gradient matrix has a smaller eigenvalue are lost.
    pub min_eigen_threshold: f32,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            window_size: 15,
            max_level: 2,
            max_iterations: 10,
            epsilon: 0.03,
            min_eigen_threshold: 1e-4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pyramid {
    pub levels: Vec<Array2<f32>>,
}

impl Pyramid {
    pub fn build(frame: &Frame, max_level: usize) -> Self {
        let mut levels = Vec::with_capacity(max_level + 1);
        levels.push(frame.to_f32());

        for _ in 0..max_level {
            let Some(last) = levels.last() else { break };
            let (h, w) = last.dim();

            if h < 2 || w < 2 {
                break;
            }

            let next = pyr_down(last);
            levels.push(next);
        }

        Self { levels }
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// (height, width) of the full resolution level.
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.levels[0].dim()
    }
}

const KERNEL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

#[inline(always)]
fn clamped(img: &Array2<f32>, y: isize, x: isize) -> f32 {
    let (h, w) = img.dim();
    img[[y.clamp(0, h as isize - 1) as usize, x.clamp(0, w as isize - 1) as usize]]
}

/// Binomial blur followed by 2x decimation.
fn pyr_down(img: &Array2<f32>) -> Array2<f32> {
    let (h, w) = img.dim();
    let (nh, nw) = ((h + 1) / 2, (w + 1) / 2);

    let mut rows = Array2::<f32>::zeros((h, nw));
    for y in 0..h {
        for nx in 0..nw {
            let x = (nx * 2) as isize;
            rows[[y, nx]] = KERNEL
                .iter()
                .enumerate()
                .map(|(k, c)| c * clamped(img, y as isize, x + k as isize - 2))
                .sum();
        }
    }

    Array2::from_shape_fn((nh, nw), |(ny, nx)| {
        let y = (ny * 2) as isize;
        KERNEL
            .iter()
            .enumerate()
            .map(|(k, c)| c * clamped(&rows, y + k as isize - 2, nx as isize))
            .sum()
    })
}

/// Bilinear sample with border replication.
#[inline]
pub fn sample(img: &Array2<f32>, x: f32, y: f32) -> f32 {
    let (h, w) = img.dim();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let top = img[[y0, x0]] * (1.0 - fx) + img[[y0, x1]] * fx;
    let bottom = img[[y1, x0]] * (1.0 - fx) + img[[y1, x1]] * fx;

    top * (1.0 - fy) + bottom * fy
}

#[derive(Debug, Clone)]
pub struct LucasKanade {
    params: FlowParams,
}

impl LucasKanade {
    pub fn new(params: FlowParams) -> Self {
        Self { params }
    }

    /// Tracks `points` from `prev` into `next`. Features with too little
    /// texture, or tracked out of the frame, are `None`.
    pub fn track(
        &self,
        prev: &Pyramid,
        next: &Pyramid,
        points: &[na::Point2<f32>],
    ) -> Vec<Option<na::Point2<f32>>> {
        let levels = prev.num_levels().min(next.num_levels());

        points
            .iter()
            .map(|p| self.track_point(prev, next, *p, levels))
            .collect()
    }

    fn track_point(
        &self,
        prev: &Pyramid,
        next: &Pyramid,
        point: na::Point2<f32>,
        levels: usize,
    ) -> Option<na::Point2<f32>> {
        let mut guess = na::Vector2::<f32>::zeros();

        for level in (0..levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let at = point * scale;

            guess = self.refine(&prev.levels[level], &next.levels[level], at, guess)?;

            if level > 0 {
                guess *= 2.0;
            }
        }

        let tracked = point + guess;

        if self.in_frame(prev, &tracked) {
            Some(tracked)
        } else {
            None
        }
    }

    /// Windows reaching past the border sample replicated edge pixels, so only
    /// the tracked point itself has to stay in the frame.
    #[inline]
    fn in_frame(&self, pyramid: &Pyramid, p: &na::Point2<f32>) -> bool {
        let (h, w) = pyramid.dim();

        p.x >= 0.0 && p.y >= 0.0 && p.x <= (w - 1) as f32 && p.y <= (h - 1) as f32
    }

    /// Gauss-Newton iterations at one level. The gradient matrix comes from the
    /// template in `prev` and stays constant across iterations.
    fn refine(
        &self,
        prev: &Array2<f32>,
        next: &Array2<f32>,
        at: na::Point2<f32>,
        mut guess: na::Vector2<f32>,
    ) -> Option<na::Vector2<f32>> {
        let half = (self.params.window_size / 2) as isize;
        let side = (2 * half + 1) as usize;
        let area = (side * side) as f32;

        let mut template = Vec::with_capacity(side * side);
        let mut grads = Vec::with_capacity(side * side);
        let mut hessian = na::Matrix2::<f32>::zeros();

        for wy in -half..=half {
            for wx in -half..=half {
                let x = at.x + wx as f32;
                let y = at.y + wy as f32;

                let gx = 0.5 * (sample(prev, x + 1.0, y) - sample(prev, x - 1.0, y));
                let gy = 0.5 * (sample(prev, x, y + 1.0) - sample(prev, x, y - 1.0));
                let g = na::Vector2::new(gx, gy);

                hessian += g * g.transpose();
                template.push(sample(prev, x, y));
                grads.push(g);
            }
        }

        let (a, b, c) = (hessian[(0, 0)], hessian[(0, 1)], hessian[(1, 1)]);
        let min_eigen = ((a + c) - ((a - c) * (a - c) + 4.0 * b * b).sqrt()) / (2.0 * area);

        if min_eigen < self.params.min_eigen_threshold {
            return None;
        }

        let inverse = hessian.try_inverse()?;

        for _ in 0..self.params.max_iterations {
            let mut rhs = na::Vector2::<f32>::zeros();
            let mut idx = 0;

            for wy in -half..=half {
                for wx in -half..=half {
                    let x = at.x + guess.x + wx as f32;
                    let y = at.y + guess.y + wy as f32;

                    rhs += grads[idx] * (template[idx] - sample(next, x, y));
                    idx += 1;
                }
            }

            let delta = inverse * rhs;
            guess += delta;

            if delta.norm() < self.params.epsilon {
                break;
            }
        }

        Some(guess)
    }
}
