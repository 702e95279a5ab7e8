pub mod adjust;
pub mod bbox;
pub mod cache;
pub mod camera;
pub mod config;
pub mod error;
pub mod features;
pub mod flow;
pub mod frame;
pub mod geometry;
pub mod interpolate;
pub mod pipeline;
pub mod pitch;
pub mod possession;
pub mod team;
pub mod track;

#[cfg(feature = "opencv")]
pub mod video;

pub use bbox::BBox;
pub use cache::{Cache, CachePolicy, Cached, Provenance};
pub use camera::{CameraMovement, CameraMovementEstimator};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use frame::Frame;
pub use pipeline::{Pipeline, PipelineOutput};
pub use pitch::PitchTransformer;
pub use possession::{Possession, PossessionShare, TeamPossession};
pub use team::TeamRoster;
pub use track::{ObjectKind, PitchPosition, TrackEntry, TrackId, Tracks, BALL_ID};
