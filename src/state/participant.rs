use crate::dao::models::ParticipantEntity;

/// Where a participant sits in the pending / active / eliminated cycle.
///
/// Derived from the persisted row, never stored: a participant is pending
/// until a target is assigned, active while alive with a target, and
/// eliminated once dead. Revival moves them back to active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    /// Joined, no target yet (before start or after a full reassignment).
    Pending,
    /// Alive with a target.
    Active,
    /// Out of the game.
    Eliminated,
}

/// Derive the life state of a participant row.
pub fn life_state(participant: &ParticipantEntity) -> LifeState {
    if !participant.is_alive {
        LifeState::Eliminated
    } else if participant.target_id.is_some() {
        LifeState::Active
    } else {
        LifeState::Pending
    }
}
