//! Participant lifecycle operations: start, eliminate, revive, shuffle and
//! target re-notification.
//!
//! Every operation validates before mutating, persists multi-participant
//! edge changes as one atomic batch, appends its audit entry only after the
//! mutation committed, and pushes notifications last. A failure at any point
//! leaves the game exactly as it was.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{
        AuditEntryEntity, AuditKind, GameEntity, GameUpdate, ParticipantEntity, ParticipantUpdate,
    },
    error::ServiceError,
    notify::{Notification, TargetReason},
    ring,
    services::ensure_admin,
    state::{
        SharedState,
        participant::{LifeState, life_state},
    },
};

/// Already-authenticated caller identity, handed in by the outer layer.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    /// User performing the operation.
    pub user_id: Uuid,
    /// Whether that user holds the administrator role.
    pub is_admin: bool,
}

/// Build the initial random ring over the alive participants of a game that
/// has not started yet.
///
/// Persisted in two passes, clear-then-set, so the storage target-uniqueness
/// constraint never sees a transiently doubled edge. Silent: no audit entry
/// and no notifications before the game starts.
pub async fn assign_targets(
    state: &SharedState,
    actor: &Actor,
    game_id: Uuid,
) -> Result<Vec<ParticipantEntity>, ServiceError> {
    ensure_admin(actor)?;
    let store = state.store();
    let game = load_game(state, game_id).await?;
    if game.is_active {
        return Err(ServiceError::AlreadyStarted);
    }

    let participants = store.load_participants(game_id).await?;
    if participants.len() < 2 {
        return Err(ServiceError::NotEnoughParticipants);
    }
    let alive: Vec<ParticipantEntity> =
        participants.into_iter().filter(|p| p.is_alive).collect();

    let rebuild = ring::rebuild_full(&alive)?;
    let rows = persist_rebuild(state, &rebuild).await?;

    info!(%game_id, participants = rows.len(), "initial targets assigned");
    Ok(rows)
}

/// Mark a game started: no more joins, everyone is told who they hunt.
pub async fn start(state: &SharedState, actor: &Actor, game_id: Uuid) -> Result<(), ServiceError> {
    ensure_admin(actor)?;
    let store = state.store();
    let game = load_game(state, game_id).await?;
    if game.is_active {
        return Err(ServiceError::AlreadyStarted);
    }

    let participants = store.load_participants(game_id).await?;
    if participants.len() < 2 {
        return Err(ServiceError::NotEnoughParticipants);
    }
    if participants.iter().any(|p| p.target_id.is_none()) {
        return Err(ServiceError::MissingAssignments);
    }

    let mut update = GameUpdate::new(game_id);
    update.is_active = Some(true);
    update.is_joinable = Some(false);
    store.update_game(update).await?;

    store
        .append_audit_entry(AuditEntryEntity::new(game_id, AuditKind::Start, actor.user_id))
        .await?;

    push_current_targets(state, &participants, TargetReason::Initial);

    info!(%game_id, participants = participants.len(), "game started");
    Ok(())
}

/// Self-serve elimination: the caller's participant takes out their own
/// target, confirmed against the claimed id.
pub async fn eliminate_target(
    state: &SharedState,
    actor: &Actor,
    game_id: Uuid,
    claimed_target_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.store();
    let game = load_game(state, game_id).await?;
    if !game.is_active {
        return Err(ServiceError::GameNotActive);
    }

    let Some(eliminator) = store
        .find_participant_for_user(game_id, actor.user_id)
        .await?
    else {
        return Err(ServiceError::NotAParticipant);
    };
    if life_state(&eliminator) != LifeState::Active {
        return Err(ServiceError::MissingTargetOrHunter);
    }
    if eliminator.target_id != Some(claimed_target_id) {
        return Err(ServiceError::InvalidTarget);
    }
    let now = SystemTime::now();
    if let Some(until) = eliminator.cooldown_until
        && until > now
    {
        return Err(ServiceError::CooldownActive { until });
    }

    let participants = store.load_participants(game_id).await?;
    let splice = ring::splice_out(&participants, claimed_target_id)
        .map_err(|_| ServiceError::MissingTargetOrHunter)?;
    if splice.hunter_id != eliminator.id {
        // The snapshot no longer agrees with the caller's row; bail out.
        return Err(ServiceError::MissingTargetOrHunter);
    }

    let mut victim_update = ParticipantUpdate::new(claimed_target_id);
    victim_update.is_alive = Some(false);
    victim_update.target_id = Some(None);
    victim_update.eliminated_by = Some(Some(eliminator.id));
    victim_update.eliminated_at = Some(Some(now));

    let mut eliminator_update = ParticipantUpdate::new(eliminator.id);
    eliminator_update.target_id = Some(splice.inherited_target);
    eliminator_update.elimination_count = Some(eliminator.elimination_count + 1);
    eliminator_update.cooldown_until = Some(Some(now + state.config().elimination_cooldown()));

    store
        .update_participants(vec![victim_update, eliminator_update])
        .await?;

    let mut entry = AuditEntryEntity::new(game_id, AuditKind::Eliminate, actor.user_id);
    entry.subject_id = Some(claimed_target_id);
    entry.target_id = Some(eliminator.id);
    store.append_audit_entry(entry).await?;

    if let Some(next_target) = splice.inherited_target
        && let Some(next_user) = user_of(&participants, next_target)
    {
        state.notifications().push(Notification::TargetAssigned {
            game_id,
            recipient: eliminator.user_id,
            target: next_user,
            reason: TargetReason::NewTarget,
        });
    }
    if let Some(victim_user) = user_of(&participants, claimed_target_id) {
        state.notifications().push(Notification::Eliminated {
            game_id,
            recipient: victim_user,
            eliminated_by: Some(eliminator.user_id),
        });
    }

    info!(
        %game_id,
        eliminator = %eliminator.id,
        victim = %claimed_target_id,
        "participant eliminated their target"
    );
    Ok(())
}

/// Administrator elimination: the victim is addressed directly and the
/// splice runs through the derived hunter.
///
/// The kill is credited to the hunter (`eliminated_by` and their
/// elimination tally both move), the admin is only the acting user. The
/// self-serve cooldown does not apply here.
pub async fn eliminate_participant(
    state: &SharedState,
    actor: &Actor,
    victim_id: Uuid,
    notify_participants: bool,
    reason: Option<String>,
) -> Result<(), ServiceError> {
    ensure_admin(actor)?;
    let store = state.store();
    let Some(victim) = store.find_participant(victim_id).await? else {
        return Err(ServiceError::ParticipantNotFound(victim_id));
    };

    let participants = store.load_participants(victim.game_id).await?;
    let splice = ring::splice_out(&participants, victim_id)
        .map_err(|_| ServiceError::MissingTargetOrHunter)?;
    let hunter = participants
        .iter()
        .find(|p| p.id == splice.hunter_id)
        .ok_or(ServiceError::MissingTargetOrHunter)?;

    let mut victim_update = ParticipantUpdate::new(victim_id);
    victim_update.is_alive = Some(false);
    victim_update.target_id = Some(None);
    victim_update.eliminated_by = Some(Some(splice.hunter_id));
    victim_update.eliminated_at = Some(Some(SystemTime::now()));

    let mut hunter_update = ParticipantUpdate::new(splice.hunter_id);
    hunter_update.target_id = Some(splice.inherited_target);
    hunter_update.elimination_count = Some(hunter.elimination_count + 1);

    store
        .update_participants(vec![victim_update, hunter_update])
        .await?;

    let mut entry = AuditEntryEntity::new(victim.game_id, AuditKind::Eliminate, actor.user_id);
    entry.subject_id = Some(victim_id);
    entry.target_id = Some(splice.hunter_id);
    entry.message = reason;
    store.append_audit_entry(entry).await?;

    if notify_participants {
        if let Some(hunter_user) = user_of(&participants, splice.hunter_id)
            && let Some(next_target) = splice.inherited_target
            && let Some(next_user) = user_of(&participants, next_target)
        {
            state.notifications().push(Notification::TargetAssigned {
                game_id: victim.game_id,
                recipient: hunter_user,
                target: next_user,
                reason: TargetReason::NewTarget,
            });
        }
        // An admin removal does not disclose who inherits the victim.
        state.notifications().push(Notification::Eliminated {
            game_id: victim.game_id,
            recipient: victim.user_id,
            eliminated_by: None,
        });
    }

    info!(
        game_id = %victim.game_id,
        victim = %victim_id,
        hunter = %splice.hunter_id,
        "participant eliminated by administrator"
    );
    Ok(())
}

/// Bring an eliminated participant back, spliced in directly after the
/// chosen preceding participant.
///
/// The anchor is an explicit administrator choice; no default is inferred.
pub async fn revive(
    state: &SharedState,
    actor: &Actor,
    game_id: Uuid,
    subject_id: Uuid,
    preceding_id: Uuid,
    notify_participants: bool,
    reason: Option<String>,
) -> Result<(), ServiceError> {
    ensure_admin(actor)?;
    let store = state.store();
    load_game(state, game_id).await?;

    let participants = store.load_participants(game_id).await?;
    let subject = participants
        .iter()
        .find(|p| p.id == subject_id)
        .ok_or(ServiceError::ParticipantNotFound(subject_id))?;
    let preceding = participants
        .iter()
        .find(|p| p.id == preceding_id)
        .ok_or(ServiceError::ParticipantNotFound(preceding_id))?;

    if life_state(subject) != LifeState::Eliminated {
        return Err(ServiceError::SubjectNotEliminated);
    }
    if !preceding.is_alive {
        return Err(ServiceError::TargetNotAlive);
    }

    let splice = ring::splice_in(&participants, subject_id, preceding_id)?;

    let mut subject_update = ParticipantUpdate::new(subject_id);
    subject_update.is_alive = Some(true);
    subject_update.target_id = Some(Some(splice.inherited_target));
    subject_update.eliminated_by = Some(None);
    subject_update.eliminated_at = Some(None);

    let mut preceding_update = ParticipantUpdate::new(preceding_id);
    preceding_update.target_id = Some(Some(subject_id));

    store
        .update_participants(vec![subject_update, preceding_update])
        .await?;

    let mut entry = AuditEntryEntity::new(game_id, AuditKind::Revive, actor.user_id);
    entry.subject_id = Some(subject_id);
    entry.target_id = Some(preceding_id);
    entry.message = reason;
    store.append_audit_entry(entry).await?;

    if notify_participants {
        state.notifications().push(Notification::TargetAssigned {
            game_id,
            recipient: preceding.user_id,
            target: subject.user_id,
            reason: TargetReason::NewTarget,
        });
        if let Some(inherited_user) = user_of(&participants, splice.inherited_target) {
            state.notifications().push(Notification::TargetAssigned {
                game_id,
                recipient: subject.user_id,
                target: inherited_user,
                reason: TargetReason::Revival,
            });
        }
    }

    info!(%game_id, subject = %subject_id, preceding = %preceding_id, "participant revived");
    Ok(())
}

/// Throw away every alive edge and deal a fresh random ring.
///
/// Deliberately silent: assignments change without notifications. Use
/// [`email_targets`] to announce the new ring when desired.
pub async fn shuffle_all(
    state: &SharedState,
    actor: &Actor,
    game_id: Uuid,
) -> Result<(), ServiceError> {
    ensure_admin(actor)?;
    let store = state.store();
    load_game(state, game_id).await?;

    let participants = store.load_participants(game_id).await?;
    let alive: Vec<ParticipantEntity> =
        participants.into_iter().filter(|p| p.is_alive).collect();
    if alive.len() < 2 {
        return Err(ServiceError::NotEnoughParticipants);
    }

    let rebuild = ring::rebuild_full(&alive)?;
    persist_rebuild(state, &rebuild).await?;

    store
        .append_audit_entry(AuditEntryEntity::new(
            game_id,
            AuditKind::Shuffle,
            actor.user_id,
        ))
        .await?;

    info!(%game_id, alive = alive.len(), "targets shuffled");
    Ok(())
}

/// Re-send the current assignment to every alive participant without
/// mutating anything. Requires an active game.
pub async fn email_targets(
    state: &SharedState,
    actor: &Actor,
    game_id: Uuid,
) -> Result<(), ServiceError> {
    ensure_admin(actor)?;
    let store = state.store();
    let game = load_game(state, game_id).await?;
    if !game.is_active {
        return Err(ServiceError::GameNotActive);
    }

    let participants = store.load_participants(game_id).await?;

    store
        .append_audit_entry(AuditEntryEntity::new(
            game_id,
            AuditKind::Notify,
            actor.user_id,
        ))
        .await?;

    push_current_targets(state, &participants, TargetReason::Initial);

    info!(%game_id, "current targets re-sent");
    Ok(())
}

async fn load_game(state: &SharedState, game_id: Uuid) -> Result<GameEntity, ServiceError> {
    state
        .store()
        .find_game(game_id)
        .await?
        .ok_or(ServiceError::GameNotFound(game_id))
}

/// Persist a two-pass rebuild: all edges cleared first, fresh ring second.
async fn persist_rebuild(
    state: &SharedState,
    rebuild: &ring::RingRebuild,
) -> Result<Vec<ParticipantEntity>, ServiceError> {
    let store = state.store();

    let clear: Vec<ParticipantUpdate> = rebuild
        .clear
        .iter()
        .map(|id| {
            let mut update = ParticipantUpdate::new(*id);
            update.target_id = Some(None);
            update
        })
        .collect();
    store.update_participants(clear).await?;

    let assign: Vec<ParticipantUpdate> = rebuild
        .assign
        .iter()
        .map(|assignment| {
            let mut update = ParticipantUpdate::new(assignment.participant_id);
            update.target_id = Some(Some(assignment.target_id));
            update
        })
        .collect();
    Ok(store.update_participants(assign).await?)
}

/// Queue one target notification per alive, assigned participant.
fn push_current_targets(
    state: &SharedState,
    participants: &[ParticipantEntity],
    reason: TargetReason,
) {
    for participant in participants.iter().filter(|p| p.is_alive) {
        let Some(target_id) = participant.target_id else {
            continue;
        };
        let Some(target_user) = user_of(participants, target_id) else {
            continue;
        };
        state.notifications().push(Notification::TargetAssigned {
            game_id: participant.game_id,
            recipient: participant.user_id,
            target: target_user,
            reason,
        });
    }
}

fn user_of(participants: &[ParticipantEntity], participant_id: Uuid) -> Option<Uuid> {
    participants
        .iter()
        .find(|p| p.id == participant_id)
        .map(|p| p.user_id)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use futures::future::BoxFuture;
    use tokio::time::sleep;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryStore},
        notify::{DeliveryError, NotificationQueue, NotificationTransport},
        state::AppState,
    };

    #[derive(Default)]
    struct RecordingTransport {
        delivered: Mutex<Vec<Notification>>,
    }

    impl RecordingTransport {
        fn delivered(&self) -> Vec<Notification> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl NotificationTransport for RecordingTransport {
        fn deliver(&self, notification: Notification) -> BoxFuture<'_, Result<(), DeliveryError>> {
            Box::pin(async move {
                self.delivered.lock().unwrap().push(notification);
                Ok(())
            })
        }
    }

    struct Harness {
        state: SharedState,
        store: MemoryStore,
        transport: Arc<RecordingTransport>,
    }

    impl Harness {
        fn new() -> Self {
            let store = MemoryStore::new();
            let transport = Arc::new(RecordingTransport::default());
            let config = AppConfig::default();
            let queue = NotificationQueue::from_config(&config, transport.clone());
            let state = AppState::new(Arc::new(store.clone()), queue, config);
            Self {
                state,
                store,
                transport,
            }
        }

        /// Let the paused clock run far enough to drain everything queued.
        async fn flush_notifications(&self) {
            sleep(Duration::from_secs(120)).await;
        }

        async fn participant(&self, id: Uuid) -> ParticipantEntity {
            self.store.find_participant(id).await.unwrap().unwrap()
        }

        async fn snapshot(&self, game_id: Uuid) -> Vec<ParticipantEntity> {
            self.store.load_participants(game_id).await.unwrap()
        }
    }

    fn admin() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            is_admin: true,
        }
    }

    fn player(user_id: Uuid) -> Actor {
        Actor {
            user_id,
            is_admin: false,
        }
    }

    /// Seed a game whose participants form the ring P1 -> P2 -> ... -> P1.
    async fn seed_game(
        store: &MemoryStore,
        count: usize,
        active: bool,
    ) -> (GameEntity, Vec<ParticipantEntity>) {
        let now = SystemTime::now();
        let game = GameEntity {
            id: Uuid::new_v4(),
            name: "hunt".into(),
            created_at: now,
            updated_at: now,
            is_active: active,
            is_joinable: !active,
        };
        store.insert_game(game.clone());

        let mut participants: Vec<ParticipantEntity> = (0..count)
            .map(|index| ParticipantEntity {
                id: Uuid::new_v4(),
                game_id: game.id,
                user_id: Uuid::new_v4(),
                display_name: format!("P{}", index + 1),
                is_alive: true,
                target_id: None,
                eliminated_by: None,
                eliminated_at: None,
                elimination_count: 0,
                cooldown_until: None,
            })
            .collect();
        for index in 0..count {
            participants[index].target_id = Some(participants[(index + 1) % count].id);
        }
        for participant in &participants {
            store.insert_participant(participant.clone()).await;
        }
        (game, participants)
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_too_few_participants() {
        let harness = Harness::new();
        let (game, _) = seed_game(&harness.store, 1, false).await;

        let err = start(&harness.state, &admin(), game.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotEnoughParticipants));
    }

    #[tokio::test(start_paused = true)]
    async fn start_with_missing_assignment_changes_nothing() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, false).await;

        let mut unassigned = participants[1].clone();
        unassigned.target_id = None;
        harness.store.insert_participant(unassigned).await;

        let err = start(&harness.state, &admin(), game.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingAssignments));

        let game_row = harness.store.find_game(game.id).await.unwrap().unwrap();
        assert!(!game_row.is_active);
        assert!(harness
            .store
            .list_audit_entries(game.id)
            .await
            .unwrap()
            .is_empty());

        harness.flush_notifications().await;
        assert!(harness.transport.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_marks_active_and_notifies_everyone() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, false).await;

        start(&harness.state, &admin(), game.id).await.unwrap();

        let game_row = harness.store.find_game(game.id).await.unwrap().unwrap();
        assert!(game_row.is_active);
        assert!(!game_row.is_joinable);

        let entries = harness.store.list_audit_entries(game.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, AuditKind::Start);

        harness.flush_notifications().await;
        let delivered = harness.transport.delivered();
        assert_eq!(delivered.len(), participants.len());
        for participant in &participants {
            assert!(delivered.iter().any(|notification| matches!(
                notification,
                Notification::TargetAssigned { recipient, reason: TargetReason::Initial, .. }
                    if *recipient == participant.user_id
            )));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let harness = Harness::new();
        let (game, _) = seed_game(&harness.store, 3, false).await;

        start(&harness.state, &admin(), game.id).await.unwrap();
        let err = start(&harness.state, &admin(), game.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyStarted));
    }

    #[tokio::test(start_paused = true)]
    async fn admin_gate_applies_to_admin_only_operations() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, true).await;
        let outsider = player(Uuid::new_v4());

        for err in [
            start(&harness.state, &outsider, game.id).await.unwrap_err(),
            shuffle_all(&harness.state, &outsider, game.id)
                .await
                .unwrap_err(),
            email_targets(&harness.state, &outsider, game.id)
                .await
                .unwrap_err(),
            eliminate_participant(&harness.state, &outsider, participants[0].id, false, None)
                .await
                .unwrap_err(),
            revive(
                &harness.state,
                &outsider,
                game.id,
                participants[0].id,
                participants[1].id,
                false,
                None,
            )
            .await
            .unwrap_err(),
        ] {
            assert!(matches!(err, ServiceError::Unauthorized));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn self_serve_elimination_splices_the_ring() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, true).await;
        let (p1, p2, p3) = (&participants[0], &participants[1], &participants[2]);

        eliminate_target(&harness.state, &player(p1.user_id), game.id, p2.id)
            .await
            .unwrap();

        let victim = harness.participant(p2.id).await;
        assert!(!victim.is_alive);
        assert_eq!(victim.target_id, None);
        assert_eq!(victim.eliminated_by, Some(p1.id));
        assert!(victim.eliminated_at.is_some());

        let eliminator = harness.participant(p1.id).await;
        assert_eq!(eliminator.target_id, Some(p3.id));
        assert_eq!(eliminator.elimination_count, 1);
        assert!(eliminator.cooldown_until.is_some());

        ring::validate_ring(&harness.snapshot(game.id).await).unwrap();

        let entries = harness.store.list_audit_entries(game.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, AuditKind::Eliminate);
        assert_eq!(entries[0].subject_id, Some(p2.id));
        assert_eq!(entries[0].target_id, Some(p1.id));

        harness.flush_notifications().await;
        let delivered = harness.transport.delivered();
        assert!(delivered.contains(&Notification::TargetAssigned {
            game_id: game.id,
            recipient: p1.user_id,
            target: p3.user_id,
            reason: TargetReason::NewTarget,
        }));
        assert!(delivered.contains(&Notification::Eliminated {
            game_id: game.id,
            recipient: p2.user_id,
            eliminated_by: Some(p1.user_id),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_target_must_match_the_stored_edge() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, true).await;

        let err = eliminate_target(
            &harness.state,
            &player(participants[0].user_id),
            game.id,
            participants[2].id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTarget));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_blocks_back_to_back_eliminations() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 4, true).await;
        let hunter = &participants[0];

        eliminate_target(
            &harness.state,
            &player(hunter.user_id),
            game.id,
            participants[1].id,
        )
        .await
        .unwrap();

        let err = eliminate_target(
            &harness.state,
            &player(hunter.user_id),
            game.id,
            participants[2].id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::CooldownActive { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn admin_elimination_credits_the_hunter_and_can_stay_silent() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, true).await;
        let victim = &participants[1];

        eliminate_participant(
            &harness.state,
            &admin(),
            victim.id,
            false,
            Some("missed the deadline".into()),
        )
        .await
        .unwrap();

        let victim_row = harness.participant(victim.id).await;
        assert!(!victim_row.is_alive);
        assert_eq!(victim_row.eliminated_by, Some(participants[0].id));

        // The hunter earned the kill even though an admin recorded it; only
        // the self-serve cooldown stays untouched.
        let hunter_row = harness.participant(participants[0].id).await;
        assert_eq!(hunter_row.target_id, Some(participants[2].id));
        assert_eq!(hunter_row.elimination_count, 1);
        assert_eq!(hunter_row.cooldown_until, None);

        let entries = harness.store.list_audit_entries(game.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message.as_deref(), Some("missed the deadline"));

        harness.flush_notifications().await;
        assert!(harness.transport.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn eliminating_the_last_opponent_leaves_a_winner() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 2, true).await;

        eliminate_target(
            &harness.state,
            &player(participants[0].user_id),
            game.id,
            participants[1].id,
        )
        .await
        .unwrap();

        let winner = harness.participant(participants[0].id).await;
        assert!(winner.is_alive);
        assert_eq!(winner.target_id, None);
        ring::validate_ring(&harness.snapshot(game.id).await).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn revive_reinserts_after_the_chosen_anchor() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, true).await;
        let (p1, p2, p3) = (&participants[0], &participants[1], &participants[2]);

        eliminate_target(&harness.state, &player(p1.user_id), game.id, p2.id)
            .await
            .unwrap();
        revive(
            &harness.state,
            &admin(),
            game.id,
            p2.id,
            p3.id,
            true,
            Some("appeal upheld".into()),
        )
        .await
        .unwrap();

        let subject = harness.participant(p2.id).await;
        assert!(subject.is_alive);
        assert_eq!(subject.target_id, Some(p1.id));
        assert_eq!(subject.eliminated_by, None);
        assert_eq!(subject.eliminated_at, None);

        let anchor = harness.participant(p3.id).await;
        assert_eq!(anchor.target_id, Some(p2.id));

        ring::validate_ring(&harness.snapshot(game.id).await).unwrap();

        let entries = harness.store.list_audit_entries(game.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|entry| entry.kind == AuditKind::Revive
            && entry.subject_id == Some(p2.id)
            && entry.target_id == Some(p3.id)
            && entry.message.as_deref() == Some("appeal upheld")));

        harness.flush_notifications().await;
        let delivered = harness.transport.delivered();
        assert!(delivered.contains(&Notification::TargetAssigned {
            game_id: game.id,
            recipient: p3.user_id,
            target: p2.user_id,
            reason: TargetReason::NewTarget,
        }));
        assert!(delivered.contains(&Notification::TargetAssigned {
            game_id: game.id,
            recipient: p2.user_id,
            target: p1.user_id,
            reason: TargetReason::Revival,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn revive_guards_subject_and_anchor_state() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, true).await;
        let (p1, p2, p3) = (&participants[0], &participants[1], &participants[2]);

        let err = revive(&harness.state, &admin(), game.id, p2.id, p3.id, false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SubjectNotEliminated));

        eliminate_target(&harness.state, &player(p1.user_id), game.id, p2.id)
            .await
            .unwrap();

        let err = revive(&harness.state, &admin(), game.id, p2.id, p2.id, false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TargetNotAlive));
    }

    #[tokio::test(start_paused = true)]
    async fn shuffle_rebuilds_a_valid_ring_silently() {
        let harness = Harness::new();
        let (game, _) = seed_game(&harness.store, 5, true).await;

        shuffle_all(&harness.state, &admin(), game.id).await.unwrap();

        ring::validate_ring(&harness.snapshot(game.id).await).unwrap();

        let entries = harness.store.list_audit_entries(game.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, AuditKind::Shuffle);

        harness.flush_notifications().await;
        assert!(harness.transport.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shuffle_skips_eliminated_participants() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 4, true).await;
        eliminate_target(
            &harness.state,
            &player(participants[0].user_id),
            game.id,
            participants[1].id,
        )
        .await
        .unwrap();

        shuffle_all(&harness.state, &admin(), game.id).await.unwrap();

        let victim = harness.participant(participants[1].id).await;
        assert!(!victim.is_alive);
        assert_eq!(victim.target_id, None);
        ring::validate_ring(&harness.snapshot(game.id).await).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn assign_targets_builds_the_ring_before_start() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 4, false).await;
        // Fresh games have no edges yet.
        for participant in &participants {
            let mut blank = participant.clone();
            blank.target_id = None;
            harness.store.insert_participant(blank).await;
        }

        let rows = assign_targets(&harness.state, &admin(), game.id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
        ring::validate_ring(&harness.snapshot(game.id).await).unwrap();

        // Pre-start assignment is silent and unaudited.
        assert!(harness
            .store
            .list_audit_entries(game.id)
            .await
            .unwrap()
            .is_empty());
        harness.flush_notifications().await;
        assert!(harness.transport.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn email_targets_requires_an_active_game() {
        let harness = Harness::new();
        let (game, participants) = seed_game(&harness.store, 3, false).await;

        let err = email_targets(&harness.state, &admin(), game.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GameNotActive));

        start(&harness.state, &admin(), game.id).await.unwrap();
        email_targets(&harness.state, &admin(), game.id)
            .await
            .unwrap();

        let entries = harness.store.list_audit_entries(game.id).await.unwrap();
        assert!(entries.iter().any(|entry| entry.kind == AuditKind::Notify));

        harness.flush_notifications().await;
        // One batch from start, one from the re-send.
        assert_eq!(harness.transport.delivered().len(), participants.len() * 2);
    }
}
