use std::time::SystemTime;

use thiserror::Error;

use crate::{dao::storage::StorageError, ring::RingError};

/// Errors returned by the lifecycle and audit services.
///
/// Validation variants are caller-correctable and guarantee that no mutation
/// was attempted. `MissingTargetOrHunter` and the wrapped [`RingError`]s mean
/// the ring was already inconsistent before the operation ran; they must be
/// surfaced to an operator, never healed silently. Storage failures mean the
/// whole operation did not happen and may be retried.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller lacks the administrator role required for this operation.
    #[error("caller is not allowed to perform this operation")]
    Unauthorized,
    /// No game with this id.
    #[error("game `{0}` not found")]
    GameNotFound(uuid::Uuid),
    /// No participant with this id.
    #[error("participant `{0}` not found")]
    ParticipantNotFound(uuid::Uuid),
    /// The calling user has no participant in this game.
    #[error("caller has no participant in this game")]
    NotAParticipant,
    /// Fewer than two participants.
    #[error("a game needs at least 2 participants")]
    NotEnoughParticipants,
    /// At least one participant has no target yet.
    #[error("all participants must have a target before the game can start")]
    MissingAssignments,
    /// The game is already active.
    #[error("game has already been started")]
    AlreadyStarted,
    /// The operation requires an active game.
    #[error("game has not been started yet")]
    GameNotActive,
    /// The claimed target does not match the stored assignment.
    #[error("claimed target does not match the current assignment")]
    InvalidTarget,
    /// The eliminator must wait before eliminating again.
    #[error("eliminator is on cooldown")]
    CooldownActive {
        /// Instant at which eliminations are allowed again.
        until: SystemTime,
    },
    /// The elimination splice could not resolve one of its two edges.
    #[error("participant is missing a target or a hunter")]
    MissingTargetOrHunter,
    /// The revival anchor is not alive.
    #[error("preceding participant is not alive")]
    TargetNotAlive,
    /// The participant to revive is not eliminated.
    #[error("participant is not eliminated")]
    SubjectNotEliminated,
    /// Ring algorithm failure.
    #[error(transparent)]
    Ring(#[from] RingError),
    /// Persistence failure; the operation did not happen.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Stable machine-readable discriminant for front-ends.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::GameNotFound(_) => "game_not_found",
            ServiceError::ParticipantNotFound(_) => "participant_not_found",
            ServiceError::NotAParticipant => "not_a_participant",
            ServiceError::NotEnoughParticipants => "not_enough_participants",
            ServiceError::MissingAssignments => "missing_assignments",
            ServiceError::AlreadyStarted => "already_started",
            ServiceError::GameNotActive => "game_not_active",
            ServiceError::InvalidTarget => "invalid_target",
            ServiceError::CooldownActive { .. } => "cooldown_active",
            ServiceError::MissingTargetOrHunter => "missing_target_or_hunter",
            ServiceError::TargetNotAlive => "target_not_alive",
            ServiceError::SubjectNotEliminated => "subject_not_eliminated",
            ServiceError::Ring(RingError::InsufficientParticipants { .. }) => {
                "insufficient_participants"
            }
            ServiceError::Ring(RingError::BrokenRing(_)) => "broken_ring",
            ServiceError::Ring(RingError::InvalidInsertionPoint(_)) => "invalid_insertion_point",
            ServiceError::Storage(_) => "storage",
        }
    }
}
