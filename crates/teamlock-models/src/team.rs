//! Team identifiers.
//!
//! Exactly two teams exist. `0` is reserved as the "unassigned" sentinel and is
//! what every detection carries until a classification succeeds.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Team identifier, serialized as the integer `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TeamId {
    /// No classification has succeeded yet.
    #[default]
    Unassigned,
    /// Team whose prototype color has the lower hue.
    One,
    /// Team whose prototype color has the higher hue.
    Two,
}

impl TeamId {
    /// The two real teams, in numeric order.
    pub const TEAMS: [TeamId; 2] = [TeamId::One, TeamId::Two];

    /// Numeric wire value.
    pub fn as_u8(&self) -> u8 {
        match self {
            TeamId::Unassigned => 0,
            TeamId::One => 1,
            TeamId::Two => 2,
        }
    }

    /// True for team 1 or team 2.
    pub fn is_assigned(&self) -> bool {
        !matches!(self, TeamId::Unassigned)
    }
}

/// Raised when a number outside `{0, 1, 2}` is used as a team id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid team id {0}: expected 0, 1 or 2")]
pub struct InvalidTeamId(pub u8);

impl TryFrom<u8> for TeamId {
    type Error = InvalidTeamId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TeamId::Unassigned),
            1 => Ok(TeamId::One),
            2 => Ok(TeamId::Two),
            other => Err(InvalidTeamId(other)),
        }
    }
}

impl From<TeamId> for u8 {
    fn from(team: TeamId) -> Self {
        team.as_u8()
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
