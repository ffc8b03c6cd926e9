//! Read side of the audit log.

use uuid::Uuid;

use crate::{
    dao::models::AuditEntryEntity,
    error::ServiceError,
    services::{Actor, ensure_admin},
    state::SharedState,
};

/// Return a game's audit log, newest first.
///
/// Storage hands entries back in no particular order; display order is
/// imposed here.
pub async fn game_log(
    state: &SharedState,
    actor: &Actor,
    game_id: Uuid,
) -> Result<Vec<AuditEntryEntity>, ServiceError> {
    ensure_admin(actor)?;
    let mut entries = state.store().list_audit_entries(game_id).await?;
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(entries)
}
