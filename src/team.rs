use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::warn;

use crate::track::{TeamId, TrackId, Tracks};

/// Player identity to team mapping. A player's team is fixed by its first
/// assignment; later conflicting assignments are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamRoster {
    teams: BTreeMap<TrackId, TeamId>,
}

impl TeamRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the teams attached to player entries, frame by frame in
    /// ascending identity order.
    pub fn from_tracks(tracks: &Tracks) -> Self {
        let mut roster = Self::new();

        for (frame_num, frame) in tracks.players.iter().enumerate() {
            for (&id, entry) in frame {
                if let Some(team) = entry.team {
                    if !roster.assign(id, team) {
                        warn!(frame_num, id, team, "conflicting team assignment ignored");
                    }
                }
            }
        }

        roster
    }

    /// Returns `false` if `id` already belongs to another team.
    pub fn assign(&mut self, id: TrackId, team: TeamId) -> bool {
        match self.teams.entry(id) {
            Entry::Vacant(e) => {
                e.insert(team);
                true
            }
            Entry::Occupied(e) => *e.get() == team,
        }
    }

    #[inline]
    pub fn team_of(&self, id: TrackId) -> Option<TeamId> {
        self.teams.get(&id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Rewrites every player entry's team with the roster's one.
    pub fn apply(&self, mut tracks: Tracks) -> Tracks {
        for frame in tracks.players.iter_mut() {
            for (id, entry) in frame.iter_mut() {
                entry.team = self.team_of(*id);
            }
        }

        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::track::TrackEntry;

    fn player(team: Option<TeamId>) -> TrackEntry {
        let mut entry = TrackEntry::new(BBox::ltrb(0.0, 0.0, 1.0, 1.0));
        entry.team = team;
        entry
    }

    #[test]
    fn test_first_assignment_wins() {
        let mut roster = TeamRoster::new();

        assert!(roster.assign(4, 1));
        assert!(roster.assign(4, 1));
        assert!(!roster.assign(4, 0));
        assert_eq!(roster.team_of(4), Some(1));
        assert_eq!(roster.team_of(5), None);
    }

    #[test]
    fn test_from_tracks_and_apply() {
        let mut tracks = Tracks::with_frames(3);
        tracks.players[0].insert(2, player(Some(0)));
        tracks.players[0].insert(3, player(None));
        tracks.players[1].insert(2, player(Some(1)));
        tracks.players[1].insert(3, player(Some(1)));
        tracks.players[2].insert(3, player(None));

        let roster = TeamRoster::from_tracks(&tracks);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.team_of(2), Some(0));
        assert_eq!(roster.team_of(3), Some(1));

        let tracks = roster.apply(tracks);
        assert_eq!(tracks.players[1][&2].team, Some(0));
        assert_eq!(tracks.players[0][&3].team, Some(1));
        assert_eq!(tracks.players[2][&3].team, Some(1));
    }
}
