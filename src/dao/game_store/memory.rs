use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{AuditEntryEntity, GameEntity, GameUpdate, ParticipantEntity, ParticipantUpdate},
    storage::{StorageError, StorageResult},
};

/// In-memory storage backend.
///
/// Batch participant updates are staged against a copy of the table and
/// committed only when every row resolved and the target-uniqueness
/// constraint still holds, mirroring the transactional semantics the
/// lifecycle services expect from a real database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    games: Arc<DashMap<Uuid, GameEntity>>,
    participants: Arc<Mutex<HashMap<Uuid, ParticipantEntity>>>,
    audit: Arc<DashMap<Uuid, Vec<AuditEntryEntity>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a game row.
    pub fn insert_game(&self, game: GameEntity) {
        self.games.insert(game.id, game);
    }

    /// Insert or replace a participant row.
    pub async fn insert_participant(&self, participant: ParticipantEntity) {
        let mut table = self.participants.lock().await;
        table.insert(participant.id, participant);
    }
}

/// Reject a staged table in which two participants of one game hunt the same
/// target.
fn check_target_uniqueness(table: &HashMap<Uuid, ParticipantEntity>) -> StorageResult<()> {
    let mut seen: HashSet<(Uuid, Uuid)> = HashSet::new();
    for row in table.values() {
        if let Some(target_id) = row.target_id
            && !seen.insert((row.game_id, target_id))
        {
            return Err(StorageError::Conflict(format!(
                "participant `{target_id}` would be targeted twice"
            )));
        }
    }
    Ok(())
}

impl GameStore for MemoryStore {
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let games = self.games.clone();
        Box::pin(async move { Ok(games.get(&id).map(|entry| entry.clone())) })
    }

    fn update_game(&self, update: GameUpdate) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let games = self.games.clone();
        Box::pin(async move {
            let Some(mut entry) = games.get_mut(&update.id) else {
                return Err(StorageError::UnknownRecord(update.id));
            };
            update.apply(entry.value_mut());
            Ok(entry.clone())
        })
    }

    fn load_participants(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let participants = self.participants.clone();
        Box::pin(async move {
            let table = participants.lock().await;
            Ok(table
                .values()
                .filter(|row| row.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let participants = self.participants.clone();
        Box::pin(async move {
            let table = participants.lock().await;
            Ok(table.get(&id).cloned())
        })
    }

    fn find_participant_for_user(
        &self,
        game_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let participants = self.participants.clone();
        Box::pin(async move {
            let table = participants.lock().await;
            Ok(table
                .values()
                .find(|row| row.game_id == game_id && row.user_id == user_id)
                .cloned())
        })
    }

    fn update_participants(
        &self,
        updates: Vec<ParticipantUpdate>,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let participants = self.participants.clone();
        Box::pin(async move {
            let mut table = participants.lock().await;

            // Stage on a copy; the live table is replaced only on success.
            let mut staged = table.clone();
            let mut touched = Vec::with_capacity(updates.len());
            for update in &updates {
                let Some(row) = staged.get_mut(&update.id) else {
                    return Err(StorageError::UnknownRecord(update.id));
                };
                update.apply(row);
                touched.push(update.id);
            }

            check_target_uniqueness(&staged)?;

            let rows = touched
                .into_iter()
                .filter_map(|id| staged.get(&id).cloned())
                .collect();
            *table = staged;
            Ok(rows)
        })
    }

    fn append_audit_entry(&self, entry: AuditEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let audit = self.audit.clone();
        Box::pin(async move {
            audit.entry(entry.game_id).or_default().push(entry);
            Ok(())
        })
    }

    fn list_audit_entries(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AuditEntryEntity>>> {
        let audit = self.audit.clone();
        Box::pin(async move {
            Ok(audit
                .get(&game_id)
                .map(|entries| entries.clone())
                .unwrap_or_default())
        })
    }
}
