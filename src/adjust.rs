use tracing::debug;

use crate::camera::CameraMovement;
use crate::error::Error;
use crate::track::Tracks;

/// Removes camera pan from raw positions: `adjusted = position - movement[frame]`.
///
/// Entries without a raw position are left untouched.
pub fn adjust_positions(mut tracks: Tracks, movement: &[CameraMovement]) -> Result<Tracks, Error> {
    tracks.validate()?;

    if movement.len() < tracks.len() {
        return Err(Error::LengthMismatch {
            what: "camera movement",
            expected: tracks.len(),
            got: movement.len(),
        });
    }

    let mut adjusted = 0usize;
    tracks.for_each_entry_mut(|_, frame_num, _, entry| {
        if let Some(position) = entry.position {
            entry.position_adjusted = Some(position - movement[frame_num].as_vector());
            adjusted += 1;
        }
    });

    debug!(adjusted, "positions adjusted for camera movement");
    Ok(tracks)
}
