//! Lifecycle operations and reporting, expressed as free async functions
//! over the shared application state.

pub mod audit;
pub mod lifecycle;

pub use lifecycle::Actor;

use crate::error::ServiceError;

/// Gate an admin-only operation on the caller's role flag.
pub(crate) fn ensure_admin(actor: &Actor) -> Result<(), ServiceError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}
