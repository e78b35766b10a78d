//! Role checks shared by the admin-only operations.

use crate::store::Tables;
use shared::{GameId, HuntError, HuntResult, Role, UserId};

/// Fails with `Unauthorized` unless `user` is registered as an admin of `game`.
/// Unregistered callers are treated like non-admins.
pub fn require_admin(tables: &Tables, game: GameId, user: UserId) -> HuntResult<()> {
    match tables.role_of(game, user) {
        Some(Role::Admin) => Ok(()),
        _ => Err(HuntError::Unauthorized { user, game }),
    }
}
