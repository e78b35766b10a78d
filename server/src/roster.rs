//! JSON roster used to seed the registries of a fresh store.
//!
//! ```json
//! {
//!   "users": [{ "id": 1, "first_name": "Ada", "surname": "Lovelace" }],
//!   "games": [{ "name": "Spring Hunt", "admins": [1], "players": [2, 3, 4] }]
//! }
//! ```

use crate::store::{Store, User};
use log::info;
use serde::Deserialize;
use shared::{GameId, HuntResult, Role, UserId};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("cannot read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed roster: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Roster {
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default)]
    pub games: Vec<GameEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UserEntry {
    pub id: u64,
    pub first_name: String,
    pub surname: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GameEntry {
    pub name: String,
    #[serde(default)]
    pub admins: Vec<u64>,
    #[serde(default)]
    pub players: Vec<u64>,
}

impl Roster {
    pub fn from_json(text: &str) -> Result<Self, RosterError> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    /// Registers every user and game in a single transaction. Returns the
    /// created game ids in order. Any unknown user id aborts the whole seed.
    pub async fn seed(&self, store: &Store) -> HuntResult<Vec<GameId>> {
        let games = store
            .register_all(|tables| {
                for user in &self.users {
                    tables.upsert_user(User {
                        id: UserId(user.id),
                        first_name: user.first_name.clone(),
                        surname: user.surname.clone(),
                    });
                }

                let mut games = Vec::with_capacity(self.games.len());
                for entry in &self.games {
                    let game = tables.create_game(entry.name.clone());
                    for &admin in &entry.admins {
                        tables.register_player(game, UserId(admin), Role::Admin)?;
                    }
                    for &player in &entry.players {
                        tables.register_player(game, UserId(player), Role::Player)?;
                    }
                    games.push(game);
                }
                Ok(games)
            })
            .await?;

        for (game, entry) in games.iter().zip(&self.games) {
            info!(
                "Seeded {} \"{}\" with {} admins and {} players",
                game,
                entry.name,
                entry.admins.len(),
                entry.players.len()
            );
        }
        Ok(games)
    }
}
