//! Back-office handlers.
//!
//! Every route here sits behind `require_admin`. Finer permissions are
//! checked per handler with [`ensure_permission`](crate::api::middlewares::ensure_permission).

pub mod catalogue;
pub mod content;
pub mod dashboard;
pub mod grades;
pub mod moderation;
pub mod roles;
pub mod users;

use crate::error::{AppError, AppResult};
use crate::models::User;

/// Platform configuration is reserved to the admin role itself.
pub(crate) fn ensure_admin(user: &User) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only administrators can change platform configuration".to_string(),
        ))
    }
}
