//! Pixel to pitch coordinates through a four point homography.

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::track::{PitchPosition, Tracks};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Pixel quadrilateral: bottom-left, top-left, top-right, bottom-right.
    pub pixel_vertices: [[f32; 2]; 4],
    /// Pitch width covered by the quadrilateral, meters.
    pub pitch_width: f32,
    /// Length of the visible pitch segment, meters.
    pub pitch_length: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            pixel_vertices: [[110.0, 1035.0], [265.0, 275.0], [910.0, 260.0], [1640.0, 915.0]],
            pitch_width: 68.0,
            pitch_length: 23.32,
        }
    }
}

impl CalibrationConfig {
    pub fn pixel_quad(&self) -> [na::Point2<f32>; 4] {
        self.pixel_vertices.map(|[x, y]| na::Point2::new(x, y))
    }

    /// Target rectangle in the same vertex order as [`Self::pixel_vertices`].
    pub fn pitch_quad(&self) -> [na::Point2<f32>; 4] {
        let (w, l) = (self.pitch_width, self.pitch_length);

        [
            na::Point2::new(0.0, w),
            na::Point2::new(0.0, 0.0),
            na::Point2::new(l, 0.0),
            na::Point2::new(l, w),
        ]
    }
}

/// Inside-or-on-boundary test for a simple polygon.
pub fn in_bounds(p: na::Point2<f32>, poly: &[na::Point2<f32>]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut p1 = poly[n - 1];

    for &p2 in poly {
        let edge = p2 - p1;
        let to_p = p - p1;
        let cross = edge.x * to_p.y - edge.y * to_p.x;

        if cross.abs() <= 1e-4 * edge.norm().max(1.0)
            && p.x >= p1.x.min(p2.x)
            && p.x <= p1.x.max(p2.x)
            && p.y >= p1.y.min(p2.y)
            && p.y <= p1.y.max(p2.y)
        {
            return true;
        }

        if (p1.y > p.y) != (p2.y > p.y) {
            let xints = p1.x + (p.y - p1.y) * edge.x / edge.y;

            if p.x < xints {
                inside = !inside;
            }
        }

        p1 = p2;
    }

    inside
}

/// Whether three consecutive vertices of the quadrilateral are collinear.
fn is_degenerate(quad: &[na::Point2<f32>; 4]) -> bool {
    (0..4).any(|i| {
        let (a, b, c) = (quad[i], quad[(i + 1) % 4], quad[(i + 2) % 4]);
        let (ab, ac) = (b - a, c - a);

        (ab.x * ac.y - ab.y * ac.x).abs() <= 1e-6 * ab.norm().max(1.0) * ac.norm().max(1.0)
    })
}

/// Solves the 3x3 perspective transform (with `h33 = 1`) taking `src[i]` onto `dst[i]`.
pub fn perspective_transform(
    src: &[na::Point2<f32>; 4],
    dst: &[na::Point2<f32>; 4],
) -> Option<na::Matrix3<f64>> {
    let mut a = na::SMatrix::<f64, 8, 8>::zeros();
    let mut b = na::SVector::<f64, 8>::zeros();

    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        let (x, y) = (s.x as f64, s.y as f64);
        let (u, v) = (d.x as f64, d.y as f64);
        let (r0, r1) = (2 * i, 2 * i + 1);

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -x * u;
        a[(r0, 7)] = -y * u;
        b[r0] = u;

        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -x * v;
        a[(r1, 7)] = -y * v;
        b[r1] = v;
    }

    let h = a.lu().solve(&b)?;

    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(na::Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    ))
}

#[inline]
fn apply(m: &na::Matrix3<f64>, p: &na::Point2<f32>) -> na::Point2<f32> {
    let v = m * na::Vector3::new(p.x as f64, p.y as f64, 1.0);
    let w = if v.z == 0.0 { 1e-7 } else { v.z };

    na::Point2::new((v.x / w) as f32, (v.y / w) as f32)
}

#[derive(Debug, Clone)]
pub struct PitchTransformer {
    pixel_quad: [na::Point2<f32>; 4],
    homography: na::Matrix3<f64>,
    inverse: na::Matrix3<f64>,
}

impl PitchTransformer {
    pub fn new(pixel_quad: [na::Point2<f32>; 4], pitch_quad: [na::Point2<f32>; 4]) -> Result<Self, Error> {
        if is_degenerate(&pixel_quad) || is_degenerate(&pitch_quad) {
            return Err(Error::DegenerateCalibration);
        }

        let homography =
            perspective_transform(&pixel_quad, &pitch_quad).ok_or(Error::DegenerateCalibration)?;
        let inverse = homography
            .try_inverse()
            .ok_or(Error::DegenerateCalibration)?;

        Ok(Self {
            pixel_quad,
            homography,
            inverse,
        })
    }

    pub fn from_config(config: &CalibrationConfig) -> Result<Self, Error> {
        Self::new(config.pixel_quad(), config.pitch_quad())
    }

    #[inline]
    pub fn homography(&self) -> &na::Matrix3<f64> {
        &self.homography
    }

    #[inline]
    pub fn contains(&self, p: na::Point2<f32>) -> bool {
        in_bounds(p, &self.pixel_quad)
    }

    /// Pitch coordinates of a pixel position, or `Outside` when the position is
    /// not covered by the calibration quadrilateral.
    pub fn transform(&self, p: na::Point2<f32>) -> PitchPosition {
        if !self.contains(p) {
            return PitchPosition::Outside;
        }

        PitchPosition::Inside(apply(&self.homography, &p))
    }

    /// Pixel position of a pitch coordinate.
    #[inline]
    pub fn to_pixel(&self, p: na::Point2<f32>) -> na::Point2<f32> {
        apply(&self.inverse, &p)
    }

    /// Maps every camera-adjusted position. Entries without one stay `NotComputed`.
    pub fn add_transformed_positions(&self, mut tracks: Tracks) -> Tracks {
        let (mut inside, mut outside) = (0usize, 0usize);

        tracks.for_each_entry_mut(|_, _, _, entry| {
            if let Some(p) = entry.position_adjusted {
                entry.position_transformed = self.transform(p);

                match entry.position_transformed {
                    PitchPosition::Inside(_) => inside += 1,
                    _ => outside += 1,
                }
            }
        });

        debug!(inside, outside, "positions transformed to pitch");
        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::track::TrackEntry;
    use approx::assert_abs_diff_eq;

    fn transformer() -> PitchTransformer {
        PitchTransformer::from_config(&CalibrationConfig::default()).unwrap()
    }

    #[test]
    fn test_vertices_map_to_pitch_corners() {
        let config = CalibrationConfig::default();
        let t = transformer();

        for (px, target) in config.pixel_quad().iter().zip(config.pitch_quad()) {
            let mapped = t.transform(*px).point().unwrap();

            assert_abs_diff_eq!(mapped.x, target.x, epsilon = 1e-3);
            assert_abs_diff_eq!(mapped.y, target.y, epsilon = 1e-3);

            let back = t.to_pixel(target);
            assert_abs_diff_eq!(back.x, px.x, epsilon = 1e-2);
            assert_abs_diff_eq!(back.y, px.y, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_outside_is_never_numeric() {
        let t = transformer();

        for p in [
            na::Point2::new(0.0, 0.0),
            na::Point2::new(1800.0, 1000.0),
            na::Point2::new(600.0, 200.0),
            na::Point2::new(100.0, 1035.0),
        ] {
            assert_eq!(t.transform(p), PitchPosition::Outside, "{:?}", p);
        }
    }

    #[test]
    fn test_inside_and_boundary() {
        let t = transformer();

        let center = t.transform(na::Point2::new(700.0, 600.0)).point().unwrap();
        assert!(center.x > 0.0 && center.x < 23.32);
        assert!(center.y > 0.0 && center.y < 68.0);

        // midpoint of the left edge
        let edge = t.transform(na::Point2::new(187.5, 655.0)).point().unwrap();
        assert_abs_diff_eq!(edge.x, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_in_bounds_square() {
        let square = [
            na::Point2::new(0.0, 0.0),
            na::Point2::new(10.0, 0.0),
            na::Point2::new(10.0, 10.0),
            na::Point2::new(0.0, 10.0),
        ];

        assert!(in_bounds(na::Point2::new(5.0, 5.0), &square));
        assert!(in_bounds(na::Point2::new(10.0, 5.0), &square));
        assert!(in_bounds(na::Point2::new(0.0, 0.0), &square));
        assert!(!in_bounds(na::Point2::new(10.01, 5.0), &square));
        assert!(!in_bounds(na::Point2::new(-1.0, -1.0), &square));
        assert!(!in_bounds(na::Point2::new(5.0, 5.0), &square[..2]));
    }

    #[test]
    fn test_degenerate_calibration() {
        let line = [
            na::Point2::new(0.0, 0.0),
            na::Point2::new(1.0, 1.0),
            na::Point2::new(2.0, 2.0),
            na::Point2::new(3.0, 3.0),
        ];

        assert!(matches!(
            PitchTransformer::new(line, CalibrationConfig::default().pitch_quad()),
            Err(Error::DegenerateCalibration)
        ));
    }

    #[test]
    fn test_add_transformed_positions() {
        let mut tracks = Tracks::with_frames(1);

        let mut inside = TrackEntry::new(BBox::ltrb(0.0, 0.0, 1.0, 1.0));
        inside.position_adjusted = Some(na::Point2::new(700.0, 600.0));
        let mut outside = inside.clone();
        outside.position_adjusted = Some(na::Point2::new(5.0, 5.0));
        let pending = TrackEntry::new(BBox::ltrb(0.0, 0.0, 1.0, 1.0));

        tracks.players[0].insert(1, inside);
        tracks.players[0].insert(2, outside);
        tracks.referees[0].insert(3, pending);

        let tracks = transformer().add_transformed_positions(tracks);

        assert!(tracks.players[0][&1].position_transformed.point().is_some());
        assert_eq!(tracks.players[0][&2].position_transformed, PitchPosition::Outside);
        assert_eq!(tracks.referees[0][&3].position_transformed, PitchPosition::NotComputed);
    }
}
