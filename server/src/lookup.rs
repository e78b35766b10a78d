//! Read-only views: a player's own target, the admin ledger listing and the
//! per-caller game summary.

use crate::access::require_admin;
use crate::store::Tables;
use shared::{
    Entity, GameId, GameInfo, GameStatus, HuntError, HuntResult, PlayerId, Role, StateViolation,
    TargetInfo, TargetView, UserId,
};

/// The display name of the caller's current prey, and nothing else.
pub fn fetch_current_target(tables: &Tables, game: GameId, user: UserId) -> HuntResult<TargetInfo> {
    let player = tables.lookup_player(game, user)?;
    if !player.is_alive() {
        return Err(StateViolation::PlayerNotAlive {
            player: player.id,
            status: player.status,
        }
        .into());
    }

    let row = tables.game(game)?;
    if row.status != GameStatus::InProgress {
        return Err(StateViolation::GameNotInProgress {
            game,
            status: row.status,
        }
        .into());
    }

    let record = tables.pending_for_hunter(game, player.id)?;
    Ok(TargetInfo {
        name: tables.player_name(record.prey)?,
    })
}

/// Every record of the game, any status, in creation order.
pub fn list_targets_for_admin(
    tables: &Tables,
    caller: UserId,
    game: GameId,
) -> HuntResult<Vec<TargetView>> {
    tables.game(game)?;
    require_admin(tables, game, caller)?;

    let players = tables.list_players(game);
    let names = tables.display_names(players.iter().map(|p| p.user));
    let name_of = |player: PlayerId| -> HuntResult<String> {
        let user = tables.player(player)?.user;
        names
            .get(&user)
            .cloned()
            .ok_or(HuntError::NotFound(Entity::User(user)))
    };

    tables
        .targets_for_game(game)
        .into_iter()
        .map(|record| -> HuntResult<TargetView> {
            Ok(TargetView {
                record_id: record.id,
                from_name: name_of(record.hunter)?,
                to_name: name_of(record.prey)?,
                status: record.status,
            })
        })
        .collect()
}

pub fn fetch_game_info(tables: &Tables, caller: UserId, game: GameId) -> HuntResult<GameInfo> {
    let row = tables.game(game)?;
    let role = tables.role_of(game, caller);
    Ok(GameInfo {
        game_id: row.id,
        name: row.name.clone(),
        status: row.status,
        role,
        registered: role == Some(Role::Player),
        immunities: row.immunities.clone(),
        kill_deductions: row.kill_deductions.clone(),
    })
}
