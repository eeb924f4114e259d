//! Role and ownership guards shared by the clients. All of them run before
//! any mutation.

use crate::domain::Actor;
use crate::error::{AppError, AppResult};

pub fn ensure_active(actor: &Actor) -> AppResult<()> {
    if actor.is_active {
        Ok(())
    } else {
        Err(AppError::forbidden("Account is deactivated"))
    }
}

pub fn ensure_admin(actor: &Actor) -> AppResult<()> {
    ensure_active(actor)?;
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Admin access required"))
    }
}

pub fn ensure_customer(actor: &Actor) -> AppResult<()> {
    ensure_active(actor)?;
    if actor.is_customer() {
        Ok(())
    } else {
        Err(AppError::forbidden("Only customers can do this"))
    }
}
