use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// One person's membership in one game, as persisted by the storage layer.
///
/// The hunter relation (who currently targets this participant) is never
/// stored; it is derived by reverse lookup over `target_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Stable identifier for the participant.
    pub id: Uuid,
    /// Game this participant belongs to.
    pub game_id: Uuid,
    /// Underlying person behind this participant.
    pub user_id: Uuid,
    /// Display name shown in notifications and reports.
    pub display_name: String,
    /// Whether the participant is still in play.
    pub is_alive: bool,
    /// The participant this one must eliminate, if assigned.
    pub target_id: Option<Uuid>,
    /// Participant credited with this one's elimination; cleared on revival.
    pub eliminated_by: Option<Uuid>,
    /// When the elimination happened; cleared on revival.
    pub eliminated_at: Option<SystemTime>,
    /// Number of participants this one has eliminated.
    pub elimination_count: u32,
    /// Self-serve eliminations are rejected until this instant passes.
    pub cooldown_until: Option<SystemTime>,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the game.
    pub name: String,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
    /// Whether the game has been started.
    pub is_active: bool,
    /// Whether new participants may still join.
    pub is_joinable: bool,
}

/// Kind of lifecycle event recorded in the audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditKind {
    /// Game was started.
    Start,
    /// A participant was eliminated.
    Eliminate,
    /// An eliminated participant was brought back.
    Revive,
    /// All alive targets were reassigned.
    Shuffle,
    /// Target notifications were re-sent without mutating assignments.
    Notify,
}

/// Immutable record of one lifecycle event. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntryEntity {
    /// Stable identifier for the entry.
    pub id: Uuid,
    /// Game the event belongs to.
    pub game_id: Uuid,
    /// What happened.
    pub kind: AuditKind,
    /// User who triggered the event.
    pub actor_user_id: Uuid,
    /// Participant the event was about (e.g. the victim), when applicable.
    pub subject_id: Option<Uuid>,
    /// Secondary participant involved (e.g. the hunter), when applicable.
    pub target_id: Option<Uuid>,
    /// Free-form text for events that carry one.
    pub message: Option<String>,
    /// When the event happened.
    pub created_at: SystemTime,
}

impl AuditEntryEntity {
    /// Build a new entry stamped with a fresh id and the current time.
    pub fn new(game_id: Uuid, kind: AuditKind, actor_user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            kind,
            actor_user_id,
            subject_id: None,
            target_id: None,
            message: None,
            created_at: SystemTime::now(),
        }
    }
}

/// Field-level change set applied to one participant inside an atomic batch.
///
/// `None` leaves a column untouched; `Some(None)` clears a nullable column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantUpdate {
    /// Participant the changes apply to.
    pub id: Uuid,
    /// New alive flag, if it changes.
    pub is_alive: Option<bool>,
    /// New target edge, if it changes.
    pub target_id: Option<Option<Uuid>>,
    /// New eliminator reference, if it changes.
    pub eliminated_by: Option<Option<Uuid>>,
    /// New elimination timestamp, if it changes.
    pub eliminated_at: Option<Option<SystemTime>>,
    /// New elimination tally, if it changes.
    pub elimination_count: Option<u32>,
    /// New cooldown deadline, if it changes.
    pub cooldown_until: Option<Option<SystemTime>>,
}

impl ParticipantUpdate {
    /// Change set that touches nothing yet.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            is_alive: None,
            target_id: None,
            eliminated_by: None,
            eliminated_at: None,
            elimination_count: None,
            cooldown_until: None,
        }
    }

    /// Apply the change set to a participant row.
    pub fn apply(&self, row: &mut ParticipantEntity) {
        if let Some(is_alive) = self.is_alive {
            row.is_alive = is_alive;
        }
        if let Some(target_id) = self.target_id {
            row.target_id = target_id;
        }
        if let Some(eliminated_by) = self.eliminated_by {
            row.eliminated_by = eliminated_by;
        }
        if let Some(eliminated_at) = self.eliminated_at {
            row.eliminated_at = eliminated_at;
        }
        if let Some(elimination_count) = self.elimination_count {
            row.elimination_count = elimination_count;
        }
        if let Some(cooldown_until) = self.cooldown_until {
            row.cooldown_until = cooldown_until;
        }
    }
}

/// Field-level change set applied to a game entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameUpdate {
    /// Game the changes apply to.
    pub id: Uuid,
    /// New active flag, if it changes.
    pub is_active: Option<bool>,
    /// New joinable flag, if it changes.
    pub is_joinable: Option<bool>,
}

impl GameUpdate {
    /// Change set that touches nothing yet.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            is_active: None,
            is_joinable: None,
        }
    }

    /// Apply the change set to a game row, bumping its update timestamp.
    pub fn apply(&self, row: &mut GameEntity) {
        if let Some(is_active) = self.is_active {
            row.is_active = is_active;
        }
        if let Some(is_joinable) = self.is_joinable {
            row.is_joinable = is_joinable;
        }
        row.updated_at = SystemTime::now();
    }
}
