//! Pure assignment-ring algorithms.
//!
//! The ring is the single directed cycle formed by the `target_id` edges of
//! alive participants. Every function here operates on a snapshot slice and
//! returns the edge changes to persist; callers own persistence and must
//! apply multi-edge changes atomically.

use rand::seq::SliceRandom;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::ParticipantEntity;

/// Errors surfaced by the ring algorithms.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RingError {
    /// A ring needs at least two participants.
    #[error("a ring needs at least 2 participants, found {found}")]
    InsufficientParticipants {
        /// How many participants were supplied.
        found: usize,
    },
    /// The cycle around a participant could not be resolved; the ring was
    /// already inconsistent before this operation ran.
    #[error("ring is broken around participant `{0}`")]
    BrokenRing(Uuid),
    /// The requested insertion anchor is not part of the current ring.
    #[error("participant `{0}` is not a valid insertion point")]
    InvalidInsertionPoint(Uuid),
}

/// One directed `hunter -> target` edge of a freshly built ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// Participant whose target is being set.
    pub participant_id: Uuid,
    /// Their new target.
    pub target_id: Uuid,
}

/// Edge changes removing one participant from the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceOut {
    /// The victim's hunter, whose edge is rewired.
    pub hunter_id: Uuid,
    /// The hunter's new target; `None` when the hunter is the sole survivor.
    pub inherited_target: Option<Uuid>,
}

/// Edge changes inserting one participant back into the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceIn {
    /// The anchor's former target, inherited by the inserted participant.
    pub inherited_target: Uuid,
}

/// Two-pass reassignment of the whole ring.
///
/// The clear pass must be persisted before the assign pass: writing new
/// edges while old ones still exist can transiently give one participant
/// two hunters and trip the storage uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingRebuild {
    /// Participants whose target must be cleared first.
    pub clear: Vec<Uuid>,
    /// Fresh edges to write once the clear pass is committed.
    pub assign: Vec<Assignment>,
}

/// Assign each participant a target along a uniformly random cycle.
pub fn build_random_ring(participants: &[ParticipantEntity]) -> Result<Vec<Assignment>, RingError> {
    if participants.len() < 2 {
        return Err(RingError::InsufficientParticipants {
            found: participants.len(),
        });
    }

    let mut ids: Vec<Uuid> = participants.iter().map(|p| p.id).collect();
    ids.shuffle(&mut rand::rng());

    Ok(ids
        .iter()
        .enumerate()
        .map(|(index, id)| Assignment {
            participant_id: *id,
            target_id: ids[(index + 1) % ids.len()],
        })
        .collect())
}

/// Find the alive participant currently hunting `target_id`.
///
/// The hunter edge is derived, never stored; this lookup is the single
/// source of truth for it.
pub fn hunter_of(participants: &[ParticipantEntity], target_id: Uuid) -> Option<&ParticipantEntity> {
    participants
        .iter()
        .find(|p| p.is_alive && p.target_id == Some(target_id))
}

/// Remove `victim_id` from the cycle, rewiring its hunter to its target.
pub fn splice_out(
    participants: &[ParticipantEntity],
    victim_id: Uuid,
) -> Result<SpliceOut, RingError> {
    let victim = participants
        .iter()
        .find(|p| p.id == victim_id)
        .ok_or(RingError::BrokenRing(victim_id))?;
    let target_id = victim.target_id.ok_or(RingError::BrokenRing(victim_id))?;
    if target_id == victim_id {
        return Err(RingError::BrokenRing(victim_id));
    }
    let hunter = hunter_of(participants, victim_id).ok_or(RingError::BrokenRing(victim_id))?;

    // A two-node ring collapses to a single winner rather than a self-loop.
    let inherited_target = (target_id != hunter.id).then_some(target_id);

    Ok(SpliceOut {
        hunter_id: hunter.id,
        inherited_target,
    })
}

/// Insert `subject_id` directly after `preceding_id` in the cycle.
pub fn splice_in(
    participants: &[ParticipantEntity],
    subject_id: Uuid,
    preceding_id: Uuid,
) -> Result<SpliceIn, RingError> {
    let preceding = participants
        .iter()
        .find(|p| p.id == preceding_id && p.is_alive)
        .ok_or(RingError::InvalidInsertionPoint(preceding_id))?;
    let inherited_target = preceding
        .target_id
        .ok_or(RingError::InvalidInsertionPoint(preceding_id))?;
    if inherited_target == subject_id || preceding_id == subject_id {
        return Err(RingError::InvalidInsertionPoint(preceding_id));
    }

    Ok(SpliceIn { inherited_target })
}

/// Plan a full reassignment: clear every edge, then build a fresh ring.
pub fn rebuild_full(participants: &[ParticipantEntity]) -> Result<RingRebuild, RingError> {
    let assign = build_random_ring(participants)?;
    Ok(RingRebuild {
        clear: participants.iter().map(|p| p.id).collect(),
        assign,
    })
}

/// Verify the Ring Invariant over the alive subset of a snapshot.
///
/// Checks that every alive participant has an alive, non-self target and
/// that following the edges from any alive participant visits all of them
/// exactly once before closing the loop.
pub fn validate_ring(participants: &[ParticipantEntity]) -> Result<(), RingError> {
    let alive: Vec<&ParticipantEntity> = participants.iter().filter(|p| p.is_alive).collect();
    let Some(start) = alive.first() else {
        return Ok(());
    };
    if alive.len() == 1 {
        // A lone survivor holds no target.
        return match start.target_id {
            None => Ok(()),
            Some(_) => Err(RingError::BrokenRing(start.id)),
        };
    }

    for p in &alive {
        let target_id = p.target_id.ok_or(RingError::BrokenRing(p.id))?;
        if target_id == p.id {
            return Err(RingError::BrokenRing(p.id));
        }
        let target_alive = alive.iter().any(|other| other.id == target_id);
        if !target_alive {
            return Err(RingError::BrokenRing(p.id));
        }
    }

    let mut visited = std::collections::HashSet::with_capacity(alive.len());
    let mut cursor = start.id;
    loop {
        if !visited.insert(cursor) {
            return Err(RingError::BrokenRing(cursor));
        }
        let current = alive
            .iter()
            .find(|p| p.id == cursor)
            .ok_or(RingError::BrokenRing(cursor))?;
        cursor = current.target_id.ok_or(RingError::BrokenRing(cursor))?;
        if cursor == start.id {
            break;
        }
    }

    if visited.len() != alive.len() {
        return Err(RingError::BrokenRing(start.id));
    }
    Ok(())
}
