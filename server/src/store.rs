//! Transactional in-memory store for games, players, users and target records
//!
//! The store stands in for the external registries the hunt core depends on:
//! - Player Registry (players, roles, alive/killed status)
//! - Game Directory (game status and correction lists)
//! - User Directory (display names)
//! - The target ledger, an append-only table of hunter -> prey rows
//!
//! Reads go through a shared lock and always observe a fully committed
//! state. Mutations are expressed as a [`Batch`] of writes, each carrying the
//! status it expects to find. A batch is validated and applied against a
//! staged copy of the tables; the copy replaces the live tables only when
//! every write succeeded (and, when a snapshot file is configured, after the
//! copy has been persisted). A failing precondition therefore leaves nothing
//! behind.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{
    CorrectionKind, Entity, GameId, GameStatus, HuntError, HuntResult, PlayerId, PlayerStatus,
    RecordId, Role, StateViolation, TargetStatus, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::{RwLock, RwLockReadGuard};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl From<StoreError> for HuntError {
    fn from(err: StoreError) -> Self {
        HuntError::Storage(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub surname: String,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub game: GameId,
    pub user: UserId,
    pub role: Role,
    pub status: PlayerStatus,
}

impl Player {
    pub fn is_alive(&self) -> bool {
        self.status == PlayerStatus::Alive
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub status: GameStatus,
    pub immunities: Vec<String>,
    pub kill_deductions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: RecordId,
    pub game: GameId,
    pub hunter: PlayerId,
    pub prey: PlayerId,
    pub status: TargetStatus,
}

/// A single conditional write. Status-changing writes name the status the
/// row must still be in when the batch commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    RequirePlayer {
        player: PlayerId,
        status: PlayerStatus,
    },
    SetPlayerStatus {
        player: PlayerId,
        from: PlayerStatus,
        to: PlayerStatus,
    },
    SetTargetStatus {
        record: RecordId,
        from: TargetStatus,
        to: TargetStatus,
    },
    ExpirePending {
        game: GameId,
    },
    InsertTarget {
        game: GameId,
        hunter: PlayerId,
        prey: PlayerId,
    },
    SetGameStatus {
        game: GameId,
        to: GameStatus,
    },
    AppendCorrection {
        game: GameId,
        kind: CorrectionKind,
        name: String,
    },
}

/// Ordered list of writes committed as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    writes: Vec<Write>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// What a committed batch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Committed {
    /// Ids of inserted target records, in batch order.
    pub inserted: Vec<RecordId>,
    /// Number of PENDING records moved to EXPIRED.
    pub expired: usize,
}

/// Every table the store owns. This is also the snapshot format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tables {
    users: BTreeMap<UserId, User>,
    games: BTreeMap<GameId, Game>,
    players: BTreeMap<PlayerId, Player>,
    targets: BTreeMap<RecordId, TargetRecord>,
    next_game: u64,
    next_player: u64,
    next_record: u64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            games: BTreeMap::new(),
            players: BTreeMap::new(),
            targets: BTreeMap::new(),
            next_game: 1,
            next_player: 1,
            next_record: 1,
        }
    }
}

impl Tables {
    pub fn game(&self, game: GameId) -> HuntResult<&Game> {
        self.games
            .get(&game)
            .ok_or(HuntError::NotFound(Entity::Game(game)))
    }

    pub fn player(&self, player: PlayerId) -> HuntResult<&Player> {
        self.players
            .get(&player)
            .ok_or(HuntError::NotFound(Entity::Player(player)))
    }

    /// Player Registry `lookupPlayer(gameId, userId)`.
    pub fn lookup_player(&self, game: GameId, user: UserId) -> HuntResult<&Player> {
        self.players
            .values()
            .find(|p| p.game == game && p.user == user)
            .ok_or(HuntError::NotFound(Entity::Registration { user, game }))
    }

    pub fn role_of(&self, game: GameId, user: UserId) -> Option<Role> {
        self.lookup_player(game, user).ok().map(|p| p.role)
    }

    /// Every registration of a game, admins included.
    pub fn list_players(&self, game: GameId) -> Vec<&Player> {
        self.players.values().filter(|p| p.game == game).collect()
    }

    /// Registrations that take part in the hunt. Admins only referee.
    pub fn list_participants(&self, game: GameId) -> Vec<&Player> {
        self.players
            .values()
            .filter(|p| p.game == game && p.role == Role::Player)
            .collect()
    }

    /// Player Registry `listAlivePlayers(gameId)`, in registration order.
    /// Only PLAYER registrations take part; ADMIN registrations referee and
    /// are never alive participants.
    pub fn list_alive_players(&self, game: GameId) -> Vec<&Player> {
        self.players
            .values()
            .filter(|p| p.game == game && p.role == Role::Player && p.is_alive())
            .collect()
    }

    pub fn user(&self, user: UserId) -> HuntResult<&User> {
        self.users
            .get(&user)
            .ok_or(HuntError::NotFound(Entity::User(user)))
    }

    /// User Directory `getDisplayName(userId)`.
    pub fn display_name(&self, user: UserId) -> HuntResult<String> {
        self.user(user).map(User::display_name)
    }

    /// User Directory `batchGetDisplayNames(ids)`. Unknown ids are left out.
    pub fn display_names<I>(&self, users: I) -> HashMap<UserId, String>
    where
        I: IntoIterator<Item = UserId>,
    {
        users
            .into_iter()
            .filter_map(|id| self.users.get(&id).map(|u| (id, u.display_name())))
            .collect()
    }

    pub fn player_name(&self, player: PlayerId) -> HuntResult<String> {
        let player = self.player(player)?;
        self.display_name(player.user)
    }

    pub fn target(&self, record: RecordId) -> HuntResult<&TargetRecord> {
        self.targets
            .get(&record)
            .ok_or(HuntError::NotFound(Entity::Target(record)))
    }

    /// All records of a game in creation order.
    pub fn targets_for_game(&self, game: GameId) -> Vec<&TargetRecord> {
        self.targets.values().filter(|t| t.game == game).collect()
    }

    pub fn pending_targets(&self, game: GameId) -> Vec<&TargetRecord> {
        self.targets
            .values()
            .filter(|t| t.game == game && t.status == TargetStatus::Pending)
            .collect()
    }

    /// The PENDING record a player is currently hunting through.
    pub fn pending_for_hunter(&self, game: GameId, hunter: PlayerId) -> HuntResult<&TargetRecord> {
        self.targets
            .values()
            .find(|t| t.game == game && t.hunter == hunter && t.status == TargetStatus::Pending)
            .ok_or(HuntError::NotFound(Entity::Assignment(hunter)))
    }

    pub fn upsert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn create_game(&mut self, name: String) -> GameId {
        let id = GameId(self.next_game);
        self.next_game += 1;
        self.games.insert(
            id,
            Game {
                id,
                name,
                status: GameStatus::Pending,
                immunities: Vec::new(),
                kill_deductions: Vec::new(),
            },
        );
        id
    }

    pub fn register_player(&mut self, game: GameId, user: UserId, role: Role) -> HuntResult<PlayerId> {
        self.game(game)?;
        self.user(user)?;
        if let Ok(existing) = self.lookup_player(game, user) {
            return Ok(existing.id);
        }
        let id = PlayerId(self.next_player);
        self.next_player += 1;
        self.players.insert(
            id,
            Player {
                id,
                game,
                user,
                role,
                status: PlayerStatus::Alive,
            },
        );
        Ok(id)
    }

    fn apply(&mut self, write: Write, committed: &mut Committed) -> HuntResult<()> {
        match write {
            Write::RequirePlayer { player, status } => {
                if self.player(player)?.status != status {
                    return Err(StateViolation::ParticipantEliminated { player }.into());
                }
            }
            Write::SetPlayerStatus { player, from, to } => {
                let row = self
                    .players
                    .get_mut(&player)
                    .ok_or(HuntError::NotFound(Entity::Player(player)))?;
                if row.status != from {
                    return Err(StateViolation::ParticipantEliminated { player }.into());
                }
                row.status = to;
            }
            Write::SetTargetStatus { record, from, to } => {
                let row = self
                    .targets
                    .get_mut(&record)
                    .ok_or(HuntError::NotFound(Entity::Target(record)))?;
                if row.status != from {
                    return Err(StateViolation::AlreadyResolved {
                        record,
                        status: row.status,
                    }
                    .into());
                }
                row.status = to;
            }
            Write::ExpirePending { game } => {
                for row in self.targets.values_mut() {
                    if row.game == game && row.status == TargetStatus::Pending {
                        row.status = TargetStatus::Expired;
                        committed.expired += 1;
                    }
                }
            }
            Write::InsertTarget { game, hunter, prey } => {
                let id = RecordId(self.next_record);
                self.next_record += 1;
                self.targets.insert(
                    id,
                    TargetRecord {
                        id,
                        game,
                        hunter,
                        prey,
                        status: TargetStatus::Pending,
                    },
                );
                committed.inserted.push(id);
            }
            Write::SetGameStatus { game, to } => {
                let row = self
                    .games
                    .get_mut(&game)
                    .ok_or(HuntError::NotFound(Entity::Game(game)))?;
                row.status = to;
            }
            Write::AppendCorrection { game, kind, name } => {
                let row = self
                    .games
                    .get_mut(&game)
                    .ok_or(HuntError::NotFound(Entity::Game(game)))?;
                match kind {
                    CorrectionKind::Immunity => row.immunities.push(name),
                    CorrectionKind::KillDeduction => row.kill_deductions.push(name),
                }
            }
        }
        Ok(())
    }
}

pub struct Store {
    tables: RwLock<Tables>,
    snapshot: Option<PathBuf>,
}

impl Store {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot: None,
        }
    }

    /// Opens a store backed by a snapshot file, loading it when present.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let tables: Tables = bincode::deserialize(&bytes)?;
                info!(
                    "Loaded snapshot {} ({} games, {} target records)",
                    path.display(),
                    tables.games.len(),
                    tables.targets.len()
                );
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", path.display());
                Tables::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(path),
        })
    }

    /// Shared view of the last committed state.
    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub async fn is_empty(&self) -> bool {
        let tables = self.tables.read().await;
        tables.users.is_empty() && tables.games.is_empty()
    }

    /// Validates and applies every write of the batch, or none of them.
    pub async fn commit(&self, batch: Batch) -> HuntResult<Committed> {
        let writes = batch.len();
        let committed = self
            .transact(move |tables| {
                let mut committed = Committed::default();
                for write in batch.writes {
                    tables.apply(write, &mut committed)?;
                }
                Ok(committed)
            })
            .await?;
        debug!(
            "Committed {} writes ({} inserted, {} expired)",
            writes,
            committed.inserted.len(),
            committed.expired
        );
        Ok(committed)
    }

    /// Creates or renames a user in the directory.
    pub async fn upsert_user(&self, user: User) -> HuntResult<()> {
        self.transact(move |tables| {
            tables.upsert_user(user);
            Ok(())
        })
        .await
    }

    pub async fn create_game(&self, name: &str) -> HuntResult<GameId> {
        let name = name.to_string();
        self.transact(move |tables| Ok(tables.create_game(name))).await
    }

    /// Registers a user in a game. Registering twice returns the existing player.
    pub async fn register_player(&self, game: GameId, user: UserId, role: Role) -> HuntResult<PlayerId> {
        self.transact(move |tables| tables.register_player(game, user, role))
            .await
    }

    /// Runs several registry changes as one transaction: an error from `f`
    /// leaves the store untouched.
    pub async fn register_all<T, F>(&self, f: F) -> HuntResult<T>
    where
        F: FnOnce(&mut Tables) -> HuntResult<T>,
    {
        self.transact(f).await
    }

    async fn transact<T, F>(&self, f: F) -> HuntResult<T>
    where
        F: FnOnce(&mut Tables) -> HuntResult<T>,
    {
        let mut live = self.tables.write().await;
        let mut staged = live.clone();
        let value = f(&mut staged)?;
        if let Some(path) = &self.snapshot {
            persist(path, &staged).await?;
        }
        *live = staged;
        Ok(value)
    }
}

/// Writes the snapshot next to its final location, then renames it over.
async fn persist(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let bytes = bincode::serialize(tables)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
