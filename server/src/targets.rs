//! Hunt cycle construction
//!
//! A cycle build expires every PENDING record of the game and links the
//! shuffled alive players into one ring: `p0 -> p1 -> ... -> p(n-1) -> p0`.
//! The plan carries an alive-precondition for every player it links, so a
//! kill that commits between planning and committing makes the rebuild fail
//! instead of putting an eliminated player back into the ring.

use crate::access::require_admin;
use crate::rng::HuntRng;
use crate::store::{Batch, Tables, Write};
use shared::{
    GameId, GameStatus, HuntError, HuntResult, PlayerId, PlayerStatus, StateViolation, UserId,
};

/// Writes for one cycle build plus the ring order they encode.
#[derive(Debug, Clone)]
pub struct CyclePlan {
    pub batch: Batch,
    pub order: Vec<PlayerId>,
}

pub fn plan_cycle(
    tables: &Tables,
    caller: UserId,
    game: GameId,
    rng: &mut HuntRng,
) -> HuntResult<CyclePlan> {
    let row = tables.game(game)?;
    require_admin(tables, game, caller)?;

    let mut order: Vec<PlayerId> = tables
        .list_alive_players(game)
        .iter()
        .map(|p| p.id)
        .collect();

    if order.len() < 2 {
        return Err(StateViolation::NotEnoughPlayers {
            game,
            alive: order.len(),
        }
        .into());
    }

    rng.shuffle(&mut order);

    let mut batch = Batch::new();
    batch.push(Write::ExpirePending { game });
    for &player in &order {
        batch.push(Write::RequirePlayer {
            player,
            status: PlayerStatus::Alive,
        });
    }
    for (i, &hunter) in order.iter().enumerate() {
        let prey = order[(i + 1) % order.len()];
        batch.push(Write::InsertTarget { game, hunter, prey });
    }
    if row.status != GameStatus::InProgress {
        batch.push(Write::SetGameStatus {
            game,
            to: GameStatus::InProgress,
        });
    }

    Ok(CyclePlan { batch, order })
}

/// Names a failed alive-precondition in a cycle commit for what it is: the
/// roster changed under the rebuild, not a stale kill.
pub fn rebuild_conflict(err: HuntError) -> HuntError {
    match err {
        HuntError::InvalidState(StateViolation::ParticipantEliminated { player }) => {
            StateViolation::RosterChanged { player }.into()
        }
        other => other,
    }
}
