//! Global camera pan estimation from sparse features in static frame bands.

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{self, Cache, Cached};
use crate::error::Error;
use crate::features::{good_features_to_track, FeatureMask, FeatureParams};
use crate::flow::{FlowParams, LucasKanade, Pyramid};
use crate::frame::Frame;
use crate::geometry::{distance, xy_displacement};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Motion below this magnitude, px, is treated as a stationary camera.
    pub minimum_distance: f32,
    pub mask: FeatureMask,
    pub features: FeatureParams,
    pub flow: FlowParams,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            minimum_distance: 5.0,
            mask: FeatureMask::default(),
            features: FeatureParams::default(),
            flow: FlowParams::default(),
        }
    }
}

/// Camera pan detected at one frame transition, px.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraMovement {
    pub dx: f32,
    pub dy: f32,
}

impl CameraMovement {
    #[inline]
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    #[inline]
    pub fn as_vector(&self) -> na::Vector2<f32> {
        na::Vector2::new(self.dx, self.dy)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

impl From<na::Vector2<f32>> for CameraMovement {
    fn from(v: na::Vector2<f32>) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Largest displacement among tracked feature pairs, with its magnitude.
/// Lost features are skipped; the first of equal maxima wins.
pub fn strongest_displacement(
    old: &[na::Point2<f32>],
    new: &[Option<na::Point2<f32>>],
) -> Option<(f32, na::Vector2<f32>)> {
    let mut best: Option<(f32, na::Vector2<f32>)> = None;

    for (o, n) in old.iter().zip(new) {
        let Some(n) = n else { continue };
        let dist = distance(o, n);

        if best.map_or(true, |(max, _)| dist > max) {
            best = Some((dist, xy_displacement(o, n)));
        }
    }

    best
}

/// Frame to frame state: the previous frame pyramid and the live feature set.
pub struct CameraMotionTracker<'a> {
    config: &'a CameraConfig,
    flow: LucasKanade,
    prev: Pyramid,
    features: Vec<na::Point2<f32>>,
}

impl<'a> CameraMotionTracker<'a> {
    pub fn new(config: &'a CameraConfig, first: &Frame) -> Self {
        let features = good_features_to_track(first, &config.mask, &config.features);
        debug!(count = features.len(), "features seeded");

        Self {
            config,
            flow: LucasKanade::new(config.flow.clone()),
            prev: Pyramid::build(first, config.flow.max_level),
            features,
        }
    }

    #[inline]
    pub fn features(&self) -> &[na::Point2<f32>] {
        &self.features
    }

    pub fn step(&mut self, frame: &Frame) -> Result<CameraMovement, Error> {
        let (h, w) = self.prev.dim();
        let (fw, fh) = frame.dims();
        if (fw, fh) != (w, h) {
            return Err(Error::InvalidFrame(format!(
                "expected {}x{}, got {}x{}",
                w, h, fw, fh
            )));
        }

        let next = Pyramid::build(frame, self.config.flow.max_level);
        let tracked = self.flow.track(&self.prev, &next, &self.features);

        let movement = match strongest_displacement(&self.features, &tracked) {
            Some((max, offset)) if max > self.config.minimum_distance => {
                self.features = good_features_to_track(frame, &self.config.mask, &self.config.features);
                debug!(
                    max,
                    dx = offset.x,
                    dy = offset.y,
                    count = self.features.len(),
                    "camera moved, features re-seeded"
                );

                offset.into()
            }
            Some(_) => CameraMovement::default(),
            None => {
                warn!(features = self.features.len(), "no feature survived tracking");
                CameraMovement::default()
            }
        };

        self.prev = next;
        Ok(movement)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CameraMovementEstimator {
    config: CameraConfig,
}

impl CameraMovementEstimator {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// One movement per frame; frame 0 is always zero.
    pub fn estimate(&self, frames: &[Frame]) -> Result<Vec<CameraMovement>, Error> {
        let Some((first, rest)) = frames.split_first() else {
            return Ok(Vec::new());
        };

        let mut tracker = CameraMotionTracker::new(&self.config, first);
        let mut movement = Vec::with_capacity(frames.len());
        movement.push(CameraMovement::default());

        for frame in rest {
            movement.push(tracker.step(frame)?);
        }

        info!(
            frames = movement.len(),
            moving = movement.iter().filter(|m| !m.is_zero()).count(),
            "camera movement estimated"
        );

        Ok(movement)
    }

    pub fn estimate_cached(
        &self,
        frames: &[Frame],
        cache: Option<&Cache>,
    ) -> Result<Cached<Vec<CameraMovement>>, Error> {
        cache::cached(cache, || self.estimate(frames))
    }
}
