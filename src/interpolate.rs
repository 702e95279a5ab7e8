use tracing::{debug, warn};

use crate::bbox::BBox;
use crate::geometry::lerp;
use crate::track::{FrameTracks, TrackEntry, BALL_ID};

/// Fills frames without a ball detection.
///
/// Gaps between two detections are interpolated linearly per coordinate.
/// Frames before the first detection take the first detected box, frames after
/// the last one keep the last box. Detected entries are left untouched; filled
/// ones are marked `interpolated`. Without any detection the track is returned
/// unchanged.
pub fn interpolate_ball_positions(mut ball: Vec<FrameTracks>) -> Vec<FrameTracks> {
    let detected: Vec<(usize, BBox)> = ball
        .iter()
        .enumerate()
        .filter_map(|(i, frame)| frame.get(&BALL_ID).map(|e| (i, e.bbox)))
        .collect();

    let (Some(&(first_idx, first)), Some(&(last_idx, last))) = (detected.first(), detected.last())
    else {
        warn!(frames = ball.len(), "no ball detections to interpolate from");
        return ball;
    };

    let mut filled = 0usize;
    let mut next = 0usize;

    for (i, frame) in ball.iter_mut().enumerate() {
        if frame.contains_key(&BALL_ID) {
            next += 1;
            continue;
        }

        let bbox = if i < first_idx {
            first
        } else if i > last_idx {
            last
        } else {
            let (p_idx, p) = detected[next - 1];
            let (n_idx, n) = detected[next];
            let factor = (i - p_idx) as f32 / (n_idx - p_idx) as f32;
            let to = n.as_slice();

            p.map(|k, from| lerp(from, to[k], factor))
        };

        let mut entry = TrackEntry::new(bbox);
        entry.interpolated = true;
        frame.insert(BALL_ID, entry);
        filled += 1;
    }

    debug!(filled, detected = detected.len(), "ball track interpolated");
    ball
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ball_track(len: usize, detections: &[(usize, [f32; 4])]) -> Vec<FrameTracks> {
        let mut ball = vec![FrameTracks::new(); len];
        for &(i, b) in detections {
            ball[i].insert(BALL_ID, TrackEntry::new(b.into()));
        }
        ball
    }

    fn bbox_at(ball: &[FrameTracks], i: usize) -> [f32; 4] {
        ball[i][&BALL_ID].bbox.into()
    }

    #[test]
    fn test_linear_gap() {
        let ball = interpolate_ball_positions(ball_track(
            6,
            &[(0, [0.0, 0.0, 10.0, 10.0]), (5, [50.0, 0.0, 60.0, 10.0])],
        ));

        let expected = [10.0, 20.0, 30.0, 40.0];
        for (i, left) in (1..5).zip(expected) {
            let b = bbox_at(&ball, i);

            assert_abs_diff_eq!(b[0], left, epsilon = 1e-4);
            assert_abs_diff_eq!(b[1], 0.0, epsilon = 1e-4);
            assert_abs_diff_eq!(b[2], left + 10.0, epsilon = 1e-4);
            assert_abs_diff_eq!(b[3], 10.0, epsilon = 1e-4);
            assert!(ball[i][&BALL_ID].interpolated);
        }

        assert!(!ball[0][&BALL_ID].interpolated);
        assert!(!ball[5][&BALL_ID].interpolated);
    }

    #[test]
    fn test_leading_gap_backfills() {
        let ball = interpolate_ball_positions(ball_track(
            6,
            &[(3, [5.0, 6.0, 7.0, 8.0]), (5, [9.0, 6.0, 11.0, 8.0])],
        ));

        for i in 0..3 {
            assert_eq!(bbox_at(&ball, i), [5.0, 6.0, 7.0, 8.0]);
        }
        assert_abs_diff_eq!(bbox_at(&ball, 4)[0], 7.0, epsilon = 1e-4);
    }

    #[test]
    fn test_trailing_gap_keeps_last() {
        let ball = interpolate_ball_positions(ball_track(4, &[(1, [1.0, 1.0, 2.0, 2.0])]));

        for i in 0..4 {
            assert_eq!(bbox_at(&ball, i), [1.0, 1.0, 2.0, 2.0]);
        }
    }

    #[test]
    fn test_multiple_gaps() {
        let ball = interpolate_ball_positions(ball_track(
            7,
            &[
                (0, [0.0, 0.0, 0.0, 0.0]),
                (2, [4.0, 4.0, 4.0, 4.0]),
                (6, [0.0, 8.0, 0.0, 8.0]),
            ],
        ));

        assert_eq!(bbox_at(&ball, 1), [2.0, 2.0, 2.0, 2.0]);
        assert_eq!(bbox_at(&ball, 4), [2.0, 6.0, 2.0, 6.0]);
    }

    #[test]
    fn test_without_detections() {
        let ball = interpolate_ball_positions(ball_track(3, &[]));

        assert_eq!(ball.len(), 3);
        assert!(ball.iter().all(|f| f.is_empty()));
        assert!(interpolate_ball_positions(Vec::new()).is_empty());
    }
}
