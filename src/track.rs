use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::error::Error;
use crate::geometry::{box_center, foot_position};

pub type TrackId = u32;
pub type TeamId = u8;

/// Identity under which the single ball track is stored.
pub const BALL_ID: TrackId = 1;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Player,
    Referee,
    Ball,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Player, ObjectKind::Referee, ObjectKind::Ball];

    /// Ground position of an object: the ball has no feet, so its center is used.
    #[inline]
    pub fn anchor(&self, bbox: &BBox) -> na::Point2<f32> {
        match self {
            ObjectKind::Ball => box_center(bbox),
            ObjectKind::Player | ObjectKind::Referee => foot_position(bbox),
        }
    }
}

/// Result of mapping a position onto the pitch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PitchPosition {
    #[default]
    NotComputed,
    Outside,
    Inside(na::Point2<f32>),
}

impl PitchPosition {
    #[inline]
    pub fn point(&self) -> Option<na::Point2<f32>> {
        match self {
            PitchPosition::Inside(p) => Some(*p),
            _ => None,
        }
    }
}

/// One object in one frame. Each derived field is written by exactly one
/// pipeline stage and is `None`/default until that stage runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrackEntry {
    pub bbox: BBox,

    /// Raw pixel position, written by [`add_positions`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<na::Point2<f32>>,

    /// Written by the position adjuster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_adjusted: Option<na::Point2<f32>>,

    /// Written by the pitch transformer.
    #[serde(default)]
    pub position_transformed: PitchPosition,

    /// Attached externally by the team classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,

    /// Written by the possession assigner.
    #[serde(default)]
    pub has_ball: bool,

    /// Set on ball entries filled in by interpolation.
    #[serde(default)]
    pub interpolated: bool,
}

impl TrackEntry {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            position: None,
            position_adjusted: None,
            position_transformed: PitchPosition::NotComputed,
            team: None,
            has_ball: false,
            interpolated: false,
        }
    }
}

impl From<BBox> for TrackEntry {
    fn from(bbox: BBox) -> Self {
        Self::new(bbox)
    }
}

/// All objects of one category in one frame, in ascending identity order.
pub type FrameTracks = BTreeMap<TrackId, TrackEntry>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Tracks {
    pub players: Vec<FrameTracks>,
    pub referees: Vec<FrameTracks>,
    pub ball: Vec<FrameTracks>,
}

impl Tracks {
    pub fn with_frames(len: usize) -> Self {
        Self {
            players: vec![FrameTracks::new(); len],
            referees: vec![FrameTracks::new(); len],
            ball: vec![FrameTracks::new(); len],
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = BufReader::new(fs::File::open(path)?);
        let tracks: Tracks = serde_json::from_reader(reader)?;
        tracks.validate()?;

        Ok(tracks)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;

        Ok(())
    }

    /// Frame count; categories must agree on it, see [`Tracks::validate`].
    #[inline]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), Error> {
        let (players, referees, ball) = (self.players.len(), self.referees.len(), self.ball.len());

        if players != referees || players != ball {
            return Err(Error::InconsistentTracks {
                players,
                referees,
                ball,
            });
        }

        Ok(())
    }

    #[inline]
    pub fn category(&self, kind: ObjectKind) -> &[FrameTracks] {
        match kind {
            ObjectKind::Player => &self.players,
            ObjectKind::Referee => &self.referees,
            ObjectKind::Ball => &self.ball,
        }
    }

    #[inline]
    pub fn category_mut(&mut self, kind: ObjectKind) -> &mut Vec<FrameTracks> {
        match kind {
            ObjectKind::Player => &mut self.players,
            ObjectKind::Referee => &mut self.referees,
            ObjectKind::Ball => &mut self.ball,
        }
    }

    /// Visits every entry of every category with its frame index.
    pub fn for_each_entry_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(ObjectKind, usize, TrackId, &mut TrackEntry),
    {
        for kind in ObjectKind::ALL {
            for (frame_num, frame) in self.category_mut(kind).iter_mut().enumerate() {
                for (id, entry) in frame.iter_mut() {
                    f(kind, frame_num, *id, entry);
                }
            }
        }
    }

    /// Ball box of a frame, if the ball is present.
    #[inline]
    pub fn ball_bbox(&self, frame_num: usize) -> Option<&BBox> {
        self.ball
            .get(frame_num)
            .and_then(|f| f.get(&BALL_ID))
            .map(|e| &e.bbox)
    }
}

/// Raw positions: foot point for people, center for the ball.
pub fn add_positions(mut tracks: Tracks) -> Tracks {
    tracks.for_each_entry_mut(|kind, _, _, entry| {
        entry.position = Some(kind.anchor(&entry.bbox));
    });

    tracks
}
