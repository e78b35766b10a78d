use crate::corrections::plan_correction;
use crate::kills::plan_kill;
use crate::leaderboard::compute_leaderboard;
use crate::lookup::{fetch_current_target, fetch_game_info, list_targets_for_admin};
use crate::rng::HuntRng;
use crate::store::Store;
use crate::targets::{plan_cycle, rebuild_conflict};
use log::{debug, info, warn};
use shared::{
    CorrectionKind, CycleSummary, GameId, GameInfo, HuntError, HuntResult, KillOutcome,
    LeaderboardEntry, Operation, RecordId, Reply, TargetInfo, TargetView, UserId,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Entry point for every hunt operation.
///
/// Mutating operations read the committed state, plan a [`crate::store::Batch`]
/// against it and hand the batch to the store. The read lock is released
/// before the commit, so a concurrent writer may win in between; the batch
/// preconditions turn that into a clean `InvalidState` for the loser.
pub struct HuntService {
    store: Arc<Store>,
    rng: Mutex<HuntRng>,
}

impl HuntService {
    pub fn new(store: Arc<Store>, rng: HuntRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn build_cycle(&self, caller: UserId, game: GameId) -> HuntResult<CycleSummary> {
        let plan = {
            let tables = self.store.read().await;
            let mut rng = self.rng.lock().await;
            plan_cycle(&tables, caller, game, &mut rng)?
        };
        let committed = self
            .store
            .commit(plan.batch)
            .await
            .map_err(rebuild_conflict)?;
        info!(
            "Built hunt cycle for {} over {} players ({} assignments expired)",
            game,
            plan.order.len(),
            committed.expired
        );
        Ok(CycleSummary {
            game,
            assignments: committed.inserted.len(),
            expired: committed.expired,
        })
    }

    pub async fn process_kill(
        &self,
        caller: UserId,
        game: GameId,
        record: RecordId,
    ) -> HuntResult<KillOutcome> {
        let plan = {
            let tables = self.store.read().await;
            plan_kill(&tables, caller, game, record)?
        };
        let committed = self.store.commit(plan.batch).await?;
        if plan.game_over {
            info!("{} eliminated {} in {}; game over", plan.hunter, plan.killed, game);
        } else {
            info!(
                "{} eliminated {} in {}; now hunting {}",
                plan.hunter, plan.killed, game, plan.next_prey
            );
        }
        Ok(KillOutcome {
            killed: plan.killed,
            completed: record,
            inherited: committed.inserted.first().copied(),
            game_over: plan.game_over,
        })
    }

    pub async fn fetch_current_target(&self, game: GameId, user: UserId) -> HuntResult<TargetInfo> {
        let tables = self.store.read().await;
        fetch_current_target(&tables, game, user)
    }

    pub async fn compute_leaderboard(&self, game: GameId) -> HuntResult<Vec<LeaderboardEntry>> {
        let tables = self.store.read().await;
        compute_leaderboard(&tables, game)
    }

    pub async fn list_targets_for_admin(
        &self,
        caller: UserId,
        game: GameId,
    ) -> HuntResult<Vec<TargetView>> {
        let tables = self.store.read().await;
        list_targets_for_admin(&tables, caller, game)
    }

    pub async fn fetch_game_info(&self, caller: UserId, game: GameId) -> HuntResult<GameInfo> {
        let tables = self.store.read().await;
        fetch_game_info(&tables, caller, game)
    }

    pub async fn grant_immunity(&self, caller: UserId, game: GameId) -> HuntResult<Option<String>> {
        self.correct(caller, game, CorrectionKind::Immunity).await
    }

    pub async fn deduct_kill(&self, caller: UserId, game: GameId) -> HuntResult<Option<String>> {
        self.correct(caller, game, CorrectionKind::KillDeduction).await
    }

    async fn correct(
        &self,
        caller: UserId,
        game: GameId,
        kind: CorrectionKind,
    ) -> HuntResult<Option<String>> {
        let plan = {
            let tables = self.store.read().await;
            let mut rng = self.rng.lock().await;
            plan_correction(&tables, caller, game, kind, &mut rng)?
        };
        let Some(plan) = plan else {
            debug!("No alive players in {} for {:?}", game, kind);
            return Ok(None);
        };
        self.store.commit(plan.batch).await?;
        info!("Recorded {:?} for {} in {}", kind, plan.name, game);
        Ok(Some(plan.name))
    }

    /// Runs one wire operation on behalf of `caller`.
    pub async fn handle(&self, caller: UserId, op: Operation) -> HuntResult<Reply> {
        debug!("{} requested {:?}", caller, op);
        let result = match op.clone() {
            Operation::BuildCycle { game } => {
                self.build_cycle(caller, game).await.map(Reply::CycleBuilt)
            }
            Operation::ProcessKill { game, record } => self
                .process_kill(caller, game, record)
                .await
                .map(Reply::KillRecorded),
            Operation::FetchTarget { game } => self
                .fetch_current_target(game, caller)
                .await
                .map(Reply::Target),
            Operation::Leaderboard { game } => {
                self.compute_leaderboard(game).await.map(Reply::Leaderboard)
            }
            Operation::ListTargets { game } => self
                .list_targets_for_admin(caller, game)
                .await
                .map(Reply::Targets),
            Operation::GrantImmunity { game } => {
                self.grant_immunity(caller, game).await.map(Reply::Correction)
            }
            Operation::DeductKill { game } => {
                self.deduct_kill(caller, game).await.map(Reply::Correction)
            }
            Operation::GameInfo { game } => {
                self.fetch_game_info(caller, game).await.map(Reply::GameInfo)
            }
        };

        if let Err(e) = &result {
            match e {
                HuntError::Storage(_) => warn!("{:?} by {} failed: {}", op, caller, e),
                _ => debug!("{:?} by {} rejected: {}", op, caller, e),
            }
        }
        result
    }
}
