//! Random administrative corrections
//!
//! An immunity grant or a kill deduction draws one alive participant with the
//! injected random source and appends their display name to the matching list
//! on the game. Only kill deductions affect the leaderboard. With nobody alive
//! the draw is skipped and nothing is written.

use crate::access::require_admin;
use crate::rng::HuntRng;
use crate::store::{Batch, Tables, Write};
use shared::{CorrectionKind, GameId, HuntResult, PlayerStatus, UserId};

#[derive(Debug, Clone)]
pub struct CorrectionPlan {
    pub batch: Batch,
    pub name: String,
}

pub fn plan_correction(
    tables: &Tables,
    caller: UserId,
    game: GameId,
    kind: CorrectionKind,
    rng: &mut HuntRng,
) -> HuntResult<Option<CorrectionPlan>> {
    tables.game(game)?;
    require_admin(tables, game, caller)?;

    let alive = tables.list_alive_players(game);
    let Some(chosen) = rng.choose(&alive) else {
        return Ok(None);
    };
    let name = tables.display_name(chosen.user)?;

    let mut batch = Batch::new();
    batch
        .push(Write::RequirePlayer {
            player: chosen.id,
            status: PlayerStatus::Alive,
        })
        .push(Write::AppendCorrection {
            game,
            kind,
            name: name.clone(),
        });

    Ok(Some(CorrectionPlan { batch, name }))
}
