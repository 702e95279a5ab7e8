use std::convert::TryFrom;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// Left-top-right-bottom box in pixel space.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox([f32; 4]);

impl From<BBox> for [f32; 4] {
    fn from(bbox: BBox) -> Self {
        bbox.0
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        BBox(v)
    }
}

impl<'a> TryFrom<&'a [f32]> for BBox {
    type Error = Error;

    fn try_from(v: &'a [f32]) -> Result<Self, Self::Error> {
        match *v {
            [l, t, r, b] => Ok(BBox::ltrb(l, t, r, b)),
            _ => Err(Error::MalformedBBox(v.len())),
        }
    }
}

impl BBox {
    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        BBox([left, top, right, bottom])
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn bottom_left(&self) -> na::Point2<f32> {
        na::Point2::new(self.left(), self.bottom())
    }

    #[inline]
    pub fn bottom_right(&self) -> na::Point2<f32> {
        na::Point2::new(self.right(), self.bottom())
    }

    /// Builds a box from per-coordinate values, e.g. after interpolation.
    #[inline]
    pub fn map<F: FnMut(usize, f32) -> f32>(&self, mut f: F) -> Self {
        BBox([f(0, self.0[0]), f(1, self.0[1]), f(2, self.0[2]), f(3, self.0[3])])
    }
}
