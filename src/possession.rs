use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::bbox::BBox;
use crate::geometry::{box_center, distance};
use crate::team::TeamRoster;
use crate::track::{FrameTracks, TeamId, TrackId, Tracks};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PossessionConfig {
    /// A player further than this from the ball never has it, px.
    pub max_distance: f32,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self { max_distance: 60.0 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Possession {
    Player(TrackId),
    Undetermined,
}

impl Possession {
    #[inline]
    pub fn player(&self) -> Option<TrackId> {
        match self {
            Possession::Player(id) => Some(*id),
            Possession::Undetermined => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamPossession {
    Team(TeamId),
    Undetermined,
}

#[derive(Debug, Clone)]
pub struct PossessionAssigner {
    config: PossessionConfig,
}

impl PossessionAssigner {
    pub fn new(config: PossessionConfig) -> Self {
        Self { config }
    }

    /// Closest player to the ball center, measured to the nearer bottom corner
    /// of its box. Equal distances keep the first player seen.
    pub fn assign(&self, players: &FrameTracks, ball: &BBox) -> Possession {
        let ball = box_center(ball);
        let mut best = f32::INFINITY;
        let mut assigned = Possession::Undetermined;

        for (&id, entry) in players {
            let d = distance(&entry.bbox.bottom_left(), &ball)
                .min(distance(&entry.bbox.bottom_right(), &ball));

            if d < self.config.max_distance && d < best {
                best = d;
                assigned = Possession::Player(id);
            }
        }

        assigned
    }

    /// Decides possession for every frame and flags the possessing entries.
    /// Frames without a ball are undetermined.
    pub fn assign_tracks(&self, mut tracks: Tracks) -> (Tracks, Vec<Possession>) {
        let mut possession = Vec::with_capacity(tracks.len());

        for frame_num in 0..tracks.len() {
            let decision = match tracks.ball_bbox(frame_num) {
                Some(ball) => self.assign(&tracks.players[frame_num], ball),
                None => Possession::Undetermined,
            };

            for (id, entry) in tracks.players[frame_num].iter_mut() {
                entry.has_ball = decision == Possession::Player(*id);
            }

            possession.push(decision);
        }

        let undetermined = possession
            .iter()
            .filter(|p| **p == Possession::Undetermined)
            .count();

        debug!(frames = possession.len(), undetermined, "ball possession assigned");
        (tracks, possession)
    }
}

/// Team of the possessing player per frame, through the roster.
pub fn team_possession(possession: &[Possession], roster: &TeamRoster) -> Vec<TeamPossession> {
    possession
        .iter()
        .map(|p| {
            p.player()
                .and_then(|id| roster.team_of(id))
                .map_or(TeamPossession::Undetermined, TeamPossession::Team)
        })
        .collect()
}

/// Percentage of attributed frames held by each team so far.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PossessionShare(pub BTreeMap<TeamId, f32>);

impl PossessionShare {
    #[inline]
    pub fn team(&self, team: TeamId) -> f32 {
        self.0.get(&team).copied().unwrap_or(0.0)
    }
}

/// Cumulative share up to and including each frame. `None` until a team has
/// held the ball at least once.
pub fn possession_shares(team_possession: &[TeamPossession]) -> Vec<Option<PossessionShare>> {
    let mut counts = BTreeMap::<TeamId, usize>::new();
    let mut total = 0usize;

    team_possession
        .iter()
        .map(|p| {
            if let TeamPossession::Team(team) = p {
                *counts.entry(*team).or_default() += 1;
                total += 1;
            }

            if total == 0 {
                return None;
            }

            let share = counts
                .iter()
                .map(|(team, n)| (*team, *n as f32 * 100.0 / total as f32))
                .collect();

            Some(PossessionShare(share))
        })
        .collect()
}
