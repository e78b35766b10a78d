//! Public standings derived from the target ledger
//!
//! Kills are counted from COMPLETE records only; the killer of a player is the
//! hunter of the COMPLETE record naming them as prey. Kill deductions are
//! matched by display name and subtracted without clamping, so a player with
//! more deductions than kills shows a negative count.

use crate::store::Tables;
use shared::{Entity, GameId, HuntError, HuntResult, LeaderboardEntry, PlayerId, TargetStatus};
use std::collections::HashMap;

pub fn compute_leaderboard(tables: &Tables, game: GameId) -> HuntResult<Vec<LeaderboardEntry>> {
    let row = tables.game(game)?;
    let participants = tables.list_participants(game);
    let names = tables.display_names(participants.iter().map(|p| p.user));

    let mut kills: HashMap<PlayerId, i64> = HashMap::new();
    let mut killed_by: HashMap<PlayerId, PlayerId> = HashMap::new();
    for record in tables
        .targets_for_game(game)
        .into_iter()
        .filter(|t| t.status == TargetStatus::Complete)
    {
        *kills.entry(record.hunter).or_insert(0) += 1;
        killed_by.insert(record.prey, record.hunter);
    }

    let mut deductions: HashMap<&str, i64> = HashMap::new();
    for name in &row.kill_deductions {
        *deductions.entry(name.as_str()).or_insert(0) += 1;
    }

    participants
        .iter()
        .map(|player| -> HuntResult<LeaderboardEntry> {
            let name = names
                .get(&player.user)
                .ok_or(HuntError::NotFound(Entity::User(player.user)))?;
            let killer = match killed_by.get(&player.id) {
                Some(&hunter) => Some(tables.player_name(hunter)?),
                None => None,
            };
            Ok(LeaderboardEntry {
                player_id: player.id,
                name: name.clone(),
                kills: kills.get(&player.id).copied().unwrap_or(0)
                    - deductions.get(name.as_str()).copied().unwrap_or(0),
                alive: player.is_alive(),
                killed_by: killer,
            })
        })
        .collect()
}
