//! Detection records exchanged with the tracker and the renderer.
//!
//! The tracker owns these records. Team assignment only reads `player_id`
//! and `bbox` and fills in `team_id` / `team_color`.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::role::RoleCategory;
use crate::team::TeamId;

/// Tracker-assigned player identifier, stable across frames.
pub type PlayerId = u32;

/// A tracked player in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Tracker identity
    pub player_id: PlayerId,
    /// Player bounding box in frame pixels
    pub bbox: BoundingBox,
    /// Index of the frame this detection belongs to
    pub frame_index: usize,
    /// Resolved team (0 until assigned)
    #[serde(default)]
    #[schemars(with = "u8")]
    pub team_id: TeamId,
    /// Display color for the resolved team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_color: Option<[u8; 3]>,
}

impl Detection {
    /// Create an unassigned detection.
    pub fn new(player_id: PlayerId, bbox: BoundingBox, frame_index: usize) -> Self {
        Self {
            player_id,
            bbox,
            frame_index,
            team_id: TeamId::Unassigned,
            team_color: None,
        }
    }

    /// Write the team decision back onto the record.
    pub fn set_team(&mut self, team_id: TeamId, color: [u8; 3]) {
        self.team_id = team_id;
        self.team_color = Some(color);
    }
}

/// All detections of one frame, grouped by role category and keyed by player id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FrameTracks {
    pub by_role: BTreeMap<RoleCategory, BTreeMap<PlayerId, Detection>>,
}

impl FrameTracks {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a detection under a role category.
    pub fn insert(&mut self, role: RoleCategory, detection: Detection) {
        self.by_role
            .entry(role)
            .or_default()
            .insert(detection.player_id, detection);
    }

    /// Detections of one role category.
    pub fn role(&self, role: RoleCategory) -> Option<&BTreeMap<PlayerId, Detection>> {
        self.by_role.get(&role)
    }

    /// Every detection across all role categories, in role then player order.
    pub fn iter(&self) -> impl Iterator<Item = (RoleCategory, &Detection)> {
        self.by_role
            .iter()
            .flat_map(|(role, players)| players.values().map(move |d| (*role, d)))
    }

    /// Mutable access to every detection, in role then player order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RoleCategory, &mut Detection)> {
        self.by_role
            .iter_mut()
            .flat_map(|(role, players)| players.values_mut().map(move |d| (*role, d)))
    }

    /// Total number of detections.
    pub fn len(&self) -> usize {
        self.by_role.values().map(|p| p.len()).sum()
    }

    /// True if the frame has no detections.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-frame tracks for a whole video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Tracks {
    pub frames: Vec<FrameTracks>,
}

impl Tracks {
    /// Wrap a list of frames.
    pub fn new(frames: Vec<FrameTracks>) -> Self {
        Self { frames }
    }

    /// Number of frames covered.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(id: PlayerId) -> Detection {
        Detection::new(id, BoundingBox::new(0.0, 0.0, 10.0, 20.0), 0)
    }

    #[test]
    fn test_iter_follows_role_order() {
        let mut frame = FrameTracks::new();
        frame.insert(RoleCategory::Qb, det(9));
        frame.insert(RoleCategory::Skill, det(4));
        frame.insert(RoleCategory::Skill, det(2));

        let order: Vec<(RoleCategory, PlayerId)> =
            frame.iter().map(|(r, d)| (r, d.player_id)).collect();
        assert_eq!(
            order,
            vec![
                (RoleCategory::Skill, 2),
                (RoleCategory::Skill, 4),
                (RoleCategory::Qb, 9)
            ]
        );
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn test_missing_team_fields_default() {
        let json = r#"{"player_id": 7, "bbox": {"x1": 1.0, "y1": 2.0, "x2": 3.0, "y2": 4.0}, "frame_index": 0}"#;
        let detection: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(detection.team_id, TeamId::Unassigned);
        assert!(detection.team_color.is_none());
    }

    #[test]
    fn test_frame_json_shape() {
        let mut frame = FrameTracks::new();
        let mut d = det(3);
        d.set_team(TeamId::One, [200, 10, 10]);
        frame.insert(RoleCategory::Db, d);

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["db"]["3"]["team_id"], 1);
        assert_eq!(value["db"]["3"]["team_color"][0], 200);

        let back: FrameTracks = serde_json::from_value(value).unwrap();
        assert_eq!(back, frame);
    }
}
