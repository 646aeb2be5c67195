//! Shared data models for TeamLock.
//!
//! This crate provides Serde-serializable types for:
//! - Bounding boxes and pixel crops
//! - Color samples
//! - Team identifiers and tracker role categories
//! - Per-frame detection records written back for the renderer

pub mod bbox;
pub mod color;
pub mod detection;
pub mod role;
pub mod team;

// Re-export common types
pub use bbox::{BoundingBox, PixelRect};
pub use color::Rgb;
pub use detection::{Detection, FrameTracks, PlayerId, Tracks};
pub use role::{RoleCategory, RoleCategoryError};
pub use team::{InvalidTeamId, TeamId};
