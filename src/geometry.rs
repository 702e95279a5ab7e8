use nalgebra as na;
use num_traits::Float;

use crate::bbox::BBox;

#[inline]
pub fn box_center(bbox: &BBox) -> na::Point2<f32> {
    na::Point2::new(
        (bbox.left() + bbox.right()) / 2.0,
        (bbox.top() + bbox.bottom()) / 2.0,
    )
}

#[inline]
pub fn box_width(bbox: &BBox) -> f32 {
    bbox.right() - bbox.left()
}

/// Ground contact point: horizontal middle of the bottom edge.
#[inline]
pub fn foot_position(bbox: &BBox) -> na::Point2<f32> {
    na::Point2::new((bbox.left() + bbox.right()) / 2.0, bbox.bottom())
}

#[inline]
pub fn distance(p: &na::Point2<f32>, q: &na::Point2<f32>) -> f32 {
    na::distance(p, q)
}

/// Signed axis-wise difference `q - p`.
#[inline]
pub fn xy_displacement(p: &na::Point2<f32>, q: &na::Point2<f32>) -> na::Vector2<f32> {
    q - p
}

#[inline(always)]
pub fn lerp<F: Float>(from: F, to: F, factor: F) -> F {
    from * (F::one() - factor) + to * factor
}
