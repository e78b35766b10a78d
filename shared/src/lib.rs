use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a person, independent of any game.
    UserId,
    "user#"
);
id_type!(GameId, "game#");
id_type!(
    /// A user's participation in one game.
    PlayerId,
    "player#"
);
id_type!(
    /// One row of the hunter -> prey ledger.
    RecordId,
    "target#"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStatus {
    Alive,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetStatus {
    Pending,
    Complete,
    UserKilled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    Pending,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrectionKind {
    Immunity,
    KillDeduction,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TargetStatus::Pending => "PENDING",
            TargetStatus::Complete => "COMPLETE",
            TargetStatus::UserKilled => "USER_KILLED",
            TargetStatus::Expired => "EXPIRED",
        };
        f.write_str(label)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GameStatus::Pending => "PENDING",
            GameStatus::InProgress => "IN_PROGRESS",
            GameStatus::Complete => "COMPLETE",
        };
        f.write_str(label)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerStatus::Alive => f.write_str("ALIVE"),
            PlayerStatus::Killed => f.write_str("KILLED"),
        }
    }
}

/// Datagrams exchanged between clients and the server.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Request {
        request_id: u64,
        caller: UserId,
        op: Operation,
    },
    Response {
        request_id: u64,
        result: Result<Reply, HuntError>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Operation {
    BuildCycle { game: GameId },
    ProcessKill { game: GameId, record: RecordId },
    FetchTarget { game: GameId },
    Leaderboard { game: GameId },
    ListTargets { game: GameId },
    GrantImmunity { game: GameId },
    DeductKill { game: GameId },
    GameInfo { game: GameId },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Reply {
    CycleBuilt(CycleSummary),
    KillRecorded(KillOutcome),
    Target(TargetInfo),
    Leaderboard(Vec<LeaderboardEntry>),
    Targets(Vec<TargetView>),
    Correction(Option<String>),
    GameInfo(GameInfo),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub game: GameId,
    pub assignments: usize,
    pub expired: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KillOutcome {
    pub killed: PlayerId,
    pub completed: RecordId,
    /// The hunter's new assignment; absent when the kill ended the game.
    pub inherited: Option<RecordId>,
    pub game_over: bool,
}

/// What a live player is allowed to learn about their assignment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    /// Completed kills minus deductions. May go negative.
    pub kills: i64,
    pub alive: bool,
    pub killed_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TargetView {
    pub record_id: RecordId,
    pub from_name: String,
    pub to_name: String,
    pub status: TargetStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub game_id: GameId,
    pub name: String,
    pub status: GameStatus,
    pub role: Option<Role>,
    pub registered: bool,
    pub immunities: Vec<String>,
    pub kill_deductions: Vec<String>,
}

/// Things a request can refer to that may not exist.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Entity {
    Game(GameId),
    Player(PlayerId),
    Registration { user: UserId, game: GameId },
    Target(RecordId),
    /// The outgoing PENDING record of a player.
    Assignment(PlayerId),
    User(UserId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Game(id) => write!(f, "{id}"),
            Entity::Player(id) => write!(f, "{id}"),
            Entity::Registration { user, game } => write!(f, "{user} in {game}"),
            Entity::Target(id) => write!(f, "{id}"),
            Entity::Assignment(id) => write!(f, "pending assignment of {id}"),
            Entity::User(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateViolation {
    #[error("{record} is already resolved ({status})")]
    AlreadyResolved { record: RecordId, status: TargetStatus },
    #[error("stale kill: {player} was already eliminated")]
    ParticipantEliminated { player: PlayerId },
    #[error("{player} is {status}")]
    PlayerNotAlive { player: PlayerId, status: PlayerStatus },
    #[error("{game} is {status}, not IN_PROGRESS")]
    GameNotInProgress { game: GameId, status: GameStatus },
    #[error("{game} has {alive} alive players; a hunt cycle needs at least 2")]
    NotEnoughPlayers { game: GameId, alive: usize },
    #[error("{player} was eliminated while the hunt cycle was being rebuilt")]
    RosterChanged { player: PlayerId },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HuntError {
    #[error("not found: {0}")]
    NotFound(Entity),
    #[error("{user} is not an admin of {game}")]
    Unauthorized { user: UserId, game: GameId },
    #[error("invalid state: {0}")]
    InvalidState(StateViolation),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("reply of {bytes} bytes does not fit in one datagram")]
    ReplyTooLarge { bytes: u64 },
}

impl From<StateViolation> for HuntError {
    fn from(violation: StateViolation) -> Self {
        HuntError::InvalidState(violation)
    }
}

pub type HuntResult<T> = Result<T, HuntError>;
