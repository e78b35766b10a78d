//! Kill confirmation and cycle surgery
//!
//! Confirming a kill on record `H -> P` removes `P` from the ring. With
//! `P -> Q` being the prey's own assignment:
//! - `P` becomes KILLED
//! - `H -> P` becomes COMPLETE
//! - `P -> Q` becomes USER_KILLED
//! - a new PENDING `H -> Q` is inserted
//!
//! When `Q` is `H` only two players were alive, so the kill ends the game
//! instead of producing a self-assignment.
//!
//! Every status change in the plan names the status it was planned against.
//! A second confirmation of the same record, a confirmation racing another
//! kill on the same hunter or prey, or a confirmation of a record expired by a
//! rebuild all fail at commit without touching anything.

use crate::access::require_admin;
use crate::store::{Batch, Tables, Write};
use shared::{
    Entity, GameId, GameStatus, HuntError, HuntResult, PlayerId, PlayerStatus, RecordId,
    StateViolation, TargetStatus, UserId,
};

#[derive(Debug, Clone)]
pub struct KillPlan {
    pub batch: Batch,
    pub hunter: PlayerId,
    pub killed: PlayerId,
    /// The prey's former target, inherited by the hunter.
    pub next_prey: PlayerId,
    pub game_over: bool,
}

pub fn plan_kill(
    tables: &Tables,
    caller: UserId,
    game: GameId,
    record_id: RecordId,
) -> HuntResult<KillPlan> {
    tables.game(game)?;
    require_admin(tables, game, caller)?;

    let record = tables.target(record_id)?;
    if record.game != game {
        return Err(HuntError::NotFound(Entity::Target(record_id)));
    }
    if record.status != TargetStatus::Pending {
        return Err(StateViolation::AlreadyResolved {
            record: record_id,
            status: record.status,
        }
        .into());
    }

    let hunter = tables.player(record.hunter)?;
    let prey = tables.player(record.prey)?;
    for participant in [hunter, prey] {
        if !participant.is_alive() {
            return Err(StateViolation::ParticipantEliminated {
                player: participant.id,
            }
            .into());
        }
    }

    let prey_outgoing = tables.pending_for_hunter(game, prey.id)?;
    let next_prey = prey_outgoing.prey;
    let game_over = next_prey == hunter.id;

    let mut batch = Batch::new();
    batch
        .push(Write::RequirePlayer {
            player: hunter.id,
            status: PlayerStatus::Alive,
        })
        .push(Write::SetPlayerStatus {
            player: prey.id,
            from: PlayerStatus::Alive,
            to: PlayerStatus::Killed,
        })
        .push(Write::SetTargetStatus {
            record: record.id,
            from: TargetStatus::Pending,
            to: TargetStatus::Complete,
        })
        .push(Write::SetTargetStatus {
            record: prey_outgoing.id,
            from: TargetStatus::Pending,
            to: TargetStatus::UserKilled,
        });

    if game_over {
        batch.push(Write::SetGameStatus {
            game,
            to: GameStatus::Complete,
        });
    } else {
        batch.push(Write::InsertTarget {
            game,
            hunter: hunter.id,
            prey: next_prey,
        });
    }

    Ok(KillPlan {
        batch,
        hunter: hunter.id,
        killed: prey.id,
        next_prey,
        game_over,
    })
}
