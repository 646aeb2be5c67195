//! Temporal identity stabilization with permanent locking.
//!
//! Per-frame votes are noisy (occlusion, shadows, referees crossing the
//! box). Each player keeps a bounded window of recent votes; once the
//! majority team appears often enough in that window the player is locked
//! to it for the rest of the run.
//!
//! # State machine
//! ```text
//!              vote, majority count < threshold
//!             ┌───────────────┐
//!             ▼               │
//!        ┌──────────┐─────────┘      ┌────────────────┐
//!  ───▶  │ Unlocked │ ─────────────▶ │ Locked(team)   │ ◀── any input
//!        └──────────┘  majority      └────────────────┘
//!             ▲  │     count >= threshold
//!             └──┘
//!           no vote
//! ```
//!
//! The transition is a pure function ([`transition`]); [`IdentityStabilizer`]
//! only owns the per-player records.

use std::collections::{BTreeMap, VecDeque};

use metrics::counter;
use serde::Serialize;
use teamlock_models::{PlayerId, TeamId};
use tracing::info;

use crate::config::StabilizerConfig;
use crate::metrics::names;

/// Bounded FIFO of a player's most recent raw votes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteWindow {
    capacity: usize,
    votes: VecDeque<TeamId>,
}

impl VoteWindow {
    /// Create an empty window holding at most `capacity` votes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            votes: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a vote, evicting the oldest when full.
    pub fn push(&mut self, team: TeamId) {
        if self.votes.len() == self.capacity {
            self.votes.pop_front();
        }
        self.votes.push_back(team);
    }

    /// Occurrences of `team` in the window.
    pub fn count(&self, team: TeamId) -> usize {
        self.votes.iter().filter(|v| **v == team).count()
    }

    /// Most frequent team and its count. Ties go to the numerically lower team.
    pub fn majority(&self) -> Option<(TeamId, usize)> {
        let mut best: Option<(TeamId, usize)> = None;
        for team in TeamId::TEAMS {
            let n = self.count(team);
            if n > 0 && best.map_or(true, |(_, m)| n > m) {
                best = Some((team, n));
            }
        }
        best
    }

    /// Votes currently held, oldest first.
    pub fn votes(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.votes.iter().copied()
    }

    /// Number of votes held.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// True if no votes have been recorded.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

/// Lock state of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Still collecting evidence; `best_guess` is the current window majority
    Unlocked { best_guess: TeamId },
    /// Team frozen for the rest of the run
    Locked { team: TeamId, locked_at_frame: usize },
}

impl PlayerState {
    /// Team emitted for this state.
    pub fn team(&self) -> TeamId {
        match self {
            PlayerState::Unlocked { best_guess } => *best_guess,
            PlayerState::Locked { team, .. } => *team,
        }
    }

    /// True once the player is locked.
    pub fn is_locked(&self) -> bool {
        matches!(self, PlayerState::Locked { .. })
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState::Unlocked {
            best_guess: TeamId::Unassigned,
        }
    }
}

/// Everything tracked for a single player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub state: PlayerState,
    pub window: VoteWindow,
}

impl PlayerRecord {
    /// Fresh, unlocked record.
    pub fn new(window_size: usize) -> Self {
        Self {
            state: PlayerState::default(),
            window: VoteWindow::new(window_size),
        }
    }
}

/// Advance a player record by one frame.
///
/// Locked records are returned unchanged. An abstention (or an unassigned
/// vote) leaves an unlocked record untouched.
pub fn transition(
    record: &PlayerRecord,
    vote: Option<TeamId>,
    frame_index: usize,
    lock_threshold: usize,
) -> PlayerRecord {
    if record.state.is_locked() {
        return record.clone();
    }
    let Some(team) = vote.filter(TeamId::is_assigned) else {
        return record.clone();
    };

    let mut window = record.window.clone();
    window.push(team);

    let state = match window.majority() {
        Some((majority, n)) if n >= lock_threshold => PlayerState::Locked {
            team: majority,
            locked_at_frame: frame_index,
        },
        Some((majority, _)) => PlayerState::Unlocked {
            best_guess: majority,
        },
        None => PlayerState::default(),
    };

    PlayerRecord { state, window }
}

/// Lock table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerLock {
    pub player_id: PlayerId,
    pub team: TeamId,
    pub locked_at_frame: usize,
}

/// Per-player vote windows and lock states for a whole run.
#[derive(Debug, Clone)]
pub struct IdentityStabilizer {
    config: StabilizerConfig,
    players: BTreeMap<PlayerId, PlayerRecord>,
}

impl IdentityStabilizer {
    /// Create an empty stabilizer.
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            players: BTreeMap::new(),
        }
    }

    /// Feed one frame's outcome for a player and return the team to emit.
    pub fn observe(&mut self, player_id: PlayerId, vote: Option<TeamId>, frame_index: usize) -> TeamId {
        let window_size = self.config.vote_window;
        let record = self
            .players
            .entry(player_id)
            .or_insert_with(|| PlayerRecord::new(window_size));

        let was_locked = record.state.is_locked();
        *record = transition(record, vote, frame_index, self.config.lock_threshold);

        if let PlayerState::Locked { team, locked_at_frame } = record.state {
            if !was_locked {
                info!(player_id, team_id = %team, frame_index = locked_at_frame, "Player locked to team");
                counter!(names::PLAYERS_LOCKED_TOTAL).increment(1);
            }
        }
        record.state.team()
    }

    /// True if the player has been locked.
    pub fn is_locked(&self, player_id: PlayerId) -> bool {
        self.players
            .get(&player_id)
            .is_some_and(|r| r.state.is_locked())
    }

    /// Current state of a player, if seen.
    pub fn state(&self, player_id: PlayerId) -> Option<PlayerState> {
        self.players.get(&player_id).map(|r| r.state)
    }

    /// Current record of a player, if seen.
    pub fn record(&self, player_id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&player_id)
    }

    /// Team currently emitted for a player (0 if never seen).
    pub fn team(&self, player_id: PlayerId) -> TeamId {
        self.state(player_id).map(|s| s.team()).unwrap_or_default()
    }

    /// All locked players, ordered by player id.
    pub fn locks(&self) -> Vec<PlayerLock> {
        self.players
            .iter()
            .filter_map(|(id, r)| match r.state {
                PlayerState::Locked { team, locked_at_frame } => Some(PlayerLock {
                    player_id: *id,
                    team,
                    locked_at_frame,
                }),
                PlayerState::Unlocked { .. } => None,
            })
            .collect()
    }

    /// Number of players seen so far.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
