pub mod memory;

use crate::dao::models::{
    AuditEntryEntity, GameEntity, GameUpdate, ParticipantEntity, ParticipantUpdate,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for games, participants and the
/// audit log.
///
/// `update_participants` is the one contract the ring maintenance leans on:
/// the whole batch is applied atomically or not at all, and a batch that
/// would leave two alive participants hunting the same target must be
/// rejected by the backend.
pub trait GameStore: Send + Sync {
    /// Fetch a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Apply a partial update to a game, returning the updated row.
    fn update_game(&self, update: GameUpdate) -> BoxFuture<'static, StorageResult<GameEntity>>;
    /// Load every participant of a game.
    fn load_participants(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Fetch a single participant by id.
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Fetch the participant representing a user inside a game.
    fn find_participant_for_user(
        &self,
        game_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Apply a batch of partial participant updates, all-or-nothing.
    fn update_participants(
        &self,
        updates: Vec<ParticipantUpdate>,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Append one immutable entry to the audit log.
    fn append_audit_entry(&self, entry: AuditEntryEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Read the audit log of a game, in no particular order.
    fn list_audit_entries(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AuditEntryEntity>>>;
}
