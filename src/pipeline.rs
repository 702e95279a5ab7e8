use serde_derive::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adjust::adjust_positions;
use crate::cache::Provenance;
use crate::camera::{CameraMovement, CameraMovementEstimator};
use crate::config::PipelineConfig;
use crate::error::Error;
use crate::frame::Frame;
use crate::interpolate::interpolate_ball_positions;
use crate::pitch::PitchTransformer;
use crate::possession::{
    possession_shares, team_possession, Possession, PossessionAssigner, PossessionShare,
    TeamPossession,
};
use crate::team::TeamRoster;
use crate::track::{add_positions, Tracks};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub tracks: Tracks,
    pub camera_movement: Vec<CameraMovement>,
    pub camera_provenance: Provenance,
    pub possession: Vec<Possession>,
    pub team_possession: Vec<TeamPossession>,
    pub shares: Vec<Option<PossessionShare>>,
}

pub struct Pipeline {
    config: PipelineConfig,
    estimator: CameraMovementEstimator,
    transformer: PitchTransformer,
    assigner: PossessionAssigner,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        let transformer = PitchTransformer::from_config(&config.calibration)?;
        let estimator = CameraMovementEstimator::new(config.camera.clone());
        let assigner = PossessionAssigner::new(config.possession.clone());

        Ok(Self {
            config,
            estimator,
            transformer,
            assigner,
        })
    }

    pub fn run(&self, frames: &[Frame], tracks: Tracks) -> Result<PipelineOutput, Error> {
        tracks.validate()?;

        if frames.len() != tracks.len() {
            return Err(Error::LengthMismatch {
                what: "video frames",
                expected: tracks.len(),
                got: frames.len(),
            });
        }

        info!(frames = frames.len(), "pipeline started");

        let Tracks {
            players,
            referees,
            ball,
        } = tracks;
        let tracks = add_positions(Tracks {
            players,
            referees,
            ball: interpolate_ball_positions(ball),
        });

        let camera = self
            .estimator
            .estimate_cached(frames, self.config.cache.camera_movement.as_ref())?;

        // a cached blob may come from another video
        if camera.value.len() != frames.len() {
            return Err(Error::LengthMismatch {
                what: "camera movement",
                expected: frames.len(),
                got: camera.value.len(),
            });
        }

        info!(provenance = ?camera.provenance, "camera movement ready");

        let tracks = adjust_positions(tracks, &camera.value)?;
        let tracks = self.transformer.add_transformed_positions(tracks);
        info!("positions mapped to pitch");

        let roster = TeamRoster::from_tracks(&tracks);
        if roster.is_empty() {
            warn!("no player carries a team, team possession stays undetermined");
        }
        let tracks = roster.apply(tracks);

        let (tracks, possession) = self.assigner.assign_tracks(tracks);
        let team_possession = team_possession(&possession, &roster);
        let shares = possession_shares(&team_possession);
        info!(players = roster.len(), "possession assigned");

        Ok(PipelineOutput {
            tracks,
            camera_movement: camera.value,
            camera_provenance: camera.provenance,
            possession,
            team_possession,
            shares,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::track::{TrackEntry, BALL_ID};
    use ndarray::Array2;

    #[test]
    fn test_frame_count_must_match() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let frames = vec![Frame::from_gray(Array2::zeros((4, 4))); 2];

        let err = pipeline.run(&frames, Tracks::with_frames(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 3,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_inconsistent_tracks() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut tracks = Tracks::with_frames(2);
        tracks.referees.pop();

        assert!(matches!(
            pipeline.run(&[], tracks),
            Err(Error::InconsistentTracks { .. })
        ));
    }

    #[test]
    fn test_degenerate_calibration_rejected() {
        let mut config = PipelineConfig::default();
        config.calibration.pixel_vertices = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];

        assert!(matches!(
            Pipeline::new(config),
            Err(Error::DegenerateCalibration)
        ));
    }

    #[test]
    fn test_static_flat_video() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let frames = vec![Frame::from_gray(Array2::from_elem((64, 64), 100)); 3];

        let mut tracks = Tracks::with_frames(3);
        let mut player = TrackEntry::new(BBox::ltrb(10.0, 10.0, 30.0, 50.0));
        player.team = Some(1);
        tracks.players[0].insert(2, player.clone());
        tracks.players[2].insert(2, player);
        tracks.ball[2].insert(BALL_ID, BBox::ltrb(28.0, 46.0, 32.0, 50.0).into());

        let output = pipeline.run(&frames, tracks).unwrap();

        assert_eq!(output.camera_movement, vec![CameraMovement::default(); 3]);
        assert_eq!(output.camera_provenance, Provenance::Computed);
        assert!(output.tracks.ball[0][&BALL_ID].interpolated);
        assert_eq!(
            output.possession,
            vec![Possession::Player(2), Possession::Undetermined, Possession::Player(2)]
        );
        assert_eq!(output.team_possession[1], TeamPossession::Undetermined);
        assert_eq!(output.shares[2].as_ref().map(|s| s.team(1)), Some(100.0));
    }
}
