//! Integration tests for the hunt server and client
//!
//! Every test starts a real server on a loopback UDP port and talks to it
//! through `client::network::Client`.

use client::network::{Client, ClientError};
use server::game::HuntService;
use server::network::{Server, ServerMessage};
use server::rng::HuntRng;
use server::roster::{GameEntry, Roster, UserEntry};
use server::store::{Batch, Store, Write};
use shared::{
    Entity, GameId, GameStatus, HuntError, Operation, PlayerId, RecordId, Reply, StateViolation,
    TargetStatus, UserId,
};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

const ADMIN: UserId = UserId(1);
const ADA: UserId = UserId(2);
const BO: UserId = UserId(3);
const CY: UserId = UserId(4);
const DEE: UserId = UserId(5);
const OUTSIDER: UserId = UserId(6);

const ROSTER: &str = r#"{
    "users": [
        { "id": 1, "first_name": "Gail", "surname": "Master" },
        { "id": 2, "first_name": "Ada", "surname": "Lovelace" },
        { "id": 3, "first_name": "Bo", "surname": "Diddley" },
        { "id": 4, "first_name": "Cy", "surname": "Young" },
        { "id": 5, "first_name": "Dee", "surname": "Snider" },
        { "id": 6, "first_name": "Oz", "surname": "Outside" }
    ],
    "games": [{ "name": "Spring Hunt", "admins": [1], "players": [2, 3, 4, 5] }]
}"#;

struct TestServer {
    addr: SocketAddr,
    store: Arc<Store>,
    game: GameId,
    shutdown: UnboundedSender<ServerMessage>,
}

impl TestServer {
    async fn start(seed: u64) -> Self {
        Self::with_roster(Roster::from_json(ROSTER).unwrap(), seed).await
    }

    async fn with_roster(roster: Roster, seed: u64) -> Self {
        let store = Arc::new(Store::in_memory());
        let games = roster.seed(&store).await.unwrap();

        let service = Arc::new(HuntService::new(Arc::clone(&store), HuntRng::new(seed)));
        let mut server = Server::new("127.0.0.1:0", service).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_sender();
        tokio::spawn(async move { server.run().await });

        TestServer {
            addr,
            store,
            game: games[0],
            shutdown,
        }
    }

    async fn client(&self, user: UserId) -> Client {
        Client::new(&self.addr.to_string(), user).await.unwrap()
    }

    async fn player(&self, user: UserId) -> PlayerId {
        self.store
            .read()
            .await
            .lookup_player(self.game, user)
            .unwrap()
            .id
    }

    /// Commits the ring `users[0] -> users[1] -> ... -> users[0]` directly,
    /// bypassing the shuffle. Returns the record ids in ring order.
    async fn fixed_ring(&self, users: &[UserId]) -> Vec<RecordId> {
        let mut players = Vec::new();
        for &user in users {
            players.push(self.player(user).await);
        }

        let mut batch = Batch::new();
        for (i, &hunter) in players.iter().enumerate() {
            batch.push(Write::InsertTarget {
                game: self.game,
                hunter,
                prey: players[(i + 1) % players.len()],
            });
        }
        batch.push(Write::SetGameStatus {
            game: self.game,
            to: GameStatus::InProgress,
        });
        self.store.commit(batch).await.unwrap().inserted
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(ServerMessage::Shutdown);
    }
}

fn rejection(result: Result<impl std::fmt::Debug, ClientError>) -> HuntError {
    match result {
        Err(ClientError::Rejected(err)) => err,
        other => panic!("expected a server rejection, got {:?}", other),
    }
}

/// CYCLE CONSTRUCTION TESTS
mod cycle_tests {
    use super::*;

    /// The pending assignments form one ring through every alive player
    #[tokio::test]
    async fn build_covers_every_player_in_one_cycle() {
        let server = TestServer::start(7).await;
        let mut admin = server.client(ADMIN).await;

        let summary = admin.build_cycle(server.game).await.unwrap();
        assert_eq!(summary.assignments, 4);
        assert_eq!(summary.expired, 0);

        let pending: HashMap<String, String> = admin
            .list_targets(server.game)
            .await
            .unwrap()
            .into_iter()
            .filter(|view| view.status == TargetStatus::Pending)
            .map(|view| (view.from_name, view.to_name))
            .collect();
        assert_eq!(pending.len(), 4);
        assert!(!pending.contains_key("Gail Master"));

        let start = "Ada Lovelace".to_string();
        let mut seen = HashSet::new();
        let mut current = start.clone();
        loop {
            assert!(seen.insert(current.clone()), "ring revisits {}", current);
            current = pending[&current].clone();
            if current == start {
                break;
            }
        }
        assert_eq!(seen.len(), 4);

        let info = admin.game_info(server.game).await.unwrap();
        assert_eq!(info.status, GameStatus::InProgress);
    }

    /// Every player learns a target that is somebody else
    #[tokio::test]
    async fn players_see_their_targets() {
        let server = TestServer::start(11).await;
        server.client(ADMIN).await.build_cycle(server.game).await.unwrap();

        let mut targets = HashSet::new();
        for (user, own_name) in [
            (ADA, "Ada Lovelace"),
            (BO, "Bo Diddley"),
            (CY, "Cy Young"),
            (DEE, "Dee Snider"),
        ] {
            let target = server.client(user).await.fetch_target(server.game).await.unwrap();
            assert_ne!(target.name, own_name);
            targets.insert(target.name);
        }
        assert_eq!(targets.len(), 4);
    }

    /// A rebuild expires open assignments so old kill reports go stale
    #[tokio::test]
    async fn kill_on_record_expired_by_rebuild() {
        let server = TestServer::start(3).await;
        let ring = server.fixed_ring(&[ADA, BO, CY, DEE]).await;
        let mut admin = server.client(ADMIN).await;

        let summary = admin.build_cycle(server.game).await.unwrap();
        assert_eq!(summary.expired, 4);

        let err = rejection(admin.process_kill(server.game, ring[0]).await);
        assert_eq!(
            err,
            HuntError::InvalidState(StateViolation::AlreadyResolved {
                record: ring[0],
                status: TargetStatus::Expired,
            })
        );

        let leaderboard = admin.leaderboard(server.game).await.unwrap();
        assert!(leaderboard.iter().all(|entry| entry.alive && entry.kills == 0));
    }

    #[tokio::test]
    async fn players_cannot_build() {
        let server = TestServer::start(1).await;
        let err = rejection(server.client(ADA).await.build_cycle(server.game).await);
        assert_eq!(
            err,
            HuntError::Unauthorized {
                user: ADA,
                game: server.game,
            }
        );
        assert!(server.store.read().await.targets_for_game(server.game).is_empty());
    }
}

/// KILL PROCESSING TESTS
mod kill_tests {
    use super::*;

    /// A -> B -> C -> A: confirming A's kill hands A the target C
    #[tokio::test]
    async fn kill_passes_prey_target_to_hunter() {
        let server = TestServer::start(5).await;
        let ring = server.fixed_ring(&[ADA, BO, CY]).await;
        let mut admin = server.client(ADMIN).await;

        let outcome = admin.process_kill(server.game, ring[0]).await.unwrap();
        assert_eq!(outcome.killed, server.player(BO).await);
        assert!(!outcome.game_over);
        let inherited = outcome.inherited.unwrap();
        let (ada, cy) = (server.player(ADA).await, server.player(CY).await);

        {
            let tables = server.store.read().await;
            assert_eq!(tables.target(ring[0]).unwrap().status, TargetStatus::Complete);
            assert_eq!(tables.target(ring[1]).unwrap().status, TargetStatus::UserKilled);
            assert_eq!(tables.target(ring[2]).unwrap().status, TargetStatus::Pending);
            let new_record = tables.target(inherited).unwrap();
            assert_eq!(new_record.hunter, ada);
            assert_eq!(new_record.prey, cy);
        }

        let target = server.client(ADA).await.fetch_target(server.game).await.unwrap();
        assert_eq!(target.name, "Cy Young");

        let err = rejection(server.client(BO).await.fetch_target(server.game).await);
        assert!(matches!(
            err,
            HuntError::InvalidState(StateViolation::PlayerNotAlive { .. })
        ));

        let board = admin.leaderboard(server.game).await.unwrap();
        let entry = |name: &str| board.iter().find(|e| e.name == name).unwrap().clone();
        let (a, b, c) = (entry("Ada Lovelace"), entry("Bo Diddley"), entry("Cy Young"));
        assert_eq!(a.kills, 1);
        assert!(a.alive);
        assert_eq!(b.kills, 0);
        assert!(!b.alive);
        assert_eq!(b.killed_by.as_deref(), Some("Ada Lovelace"));
        assert_eq!(c.kills, 0);
        assert!(c.alive);
        assert_eq!(c.killed_by, None);
    }

    /// The same kill confirmed twice applies once
    #[tokio::test]
    async fn double_confirmation_is_rejected() {
        let server = TestServer::start(5).await;
        let ring = server.fixed_ring(&[ADA, BO, CY, DEE]).await;
        let mut admin = server.client(ADMIN).await;

        admin.process_kill(server.game, ring[0]).await.unwrap();
        let records_after_first = server.store.read().await.targets_for_game(server.game).len();

        let err = rejection(admin.process_kill(server.game, ring[0]).await);
        assert_eq!(
            err,
            HuntError::InvalidState(StateViolation::AlreadyResolved {
                record: ring[0],
                status: TargetStatus::Complete,
            })
        );
        assert_eq!(
            server.store.read().await.targets_for_game(server.game).len(),
            records_after_first
        );
    }

    /// Concurrent confirmations of one record from separate clients
    #[tokio::test]
    async fn racing_confirmations_apply_once() {
        let server = TestServer::start(9).await;
        let ring = server.fixed_ring(&[ADA, BO, CY, DEE]).await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let mut admin = server.client(ADMIN).await;
            let game = server.game;
            let record = ring[1];
            handles.push(tokio::spawn(async move {
                admin.process_kill(game, record).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ClientError::Rejected(HuntError::InvalidState(_))) => {}
                Err(e) => panic!("unexpected failure: {}", e),
            }
        }
        assert_eq!(successes, 1);

        let tables = server.store.read().await;
        assert_eq!(tables.pending_targets(server.game).len(), 3);
        assert_eq!(tables.list_alive_players(server.game).len(), 3);
    }

    /// The last kill ends the game without a self-assignment
    #[tokio::test]
    async fn last_kill_completes_game() {
        let server = TestServer::start(2).await;
        let ring = server.fixed_ring(&[ADA, BO, CY]).await;
        let mut admin = server.client(ADMIN).await;

        let first = admin.process_kill(server.game, ring[0]).await.unwrap();
        let last = admin
            .process_kill(server.game, first.inherited.unwrap())
            .await
            .unwrap();
        assert!(last.game_over);
        assert_eq!(last.inherited, None);

        let info = admin.game_info(server.game).await.unwrap();
        assert_eq!(info.status, GameStatus::Complete);
        assert!(server.store.read().await.pending_targets(server.game).is_empty());

        let err = rejection(server.client(ADA).await.fetch_target(server.game).await);
        assert_eq!(
            err,
            HuntError::InvalidState(StateViolation::GameNotInProgress {
                game: server.game,
                status: GameStatus::Complete,
            })
        );
    }

    #[tokio::test]
    async fn players_cannot_confirm_kills() {
        let server = TestServer::start(4).await;
        let ring = server.fixed_ring(&[ADA, BO]).await;

        let err = rejection(server.client(ADA).await.process_kill(server.game, ring[0]).await);
        assert!(matches!(err, HuntError::Unauthorized { .. }));
        assert_eq!(server.store.read().await.pending_targets(server.game).len(), 2);
    }
}

/// STANDINGS AND CORRECTION TESTS
mod standings_tests {
    use super::*;

    /// Three kills minus two deductions leave one
    #[tokio::test]
    async fn leaderboard_subtracts_deductions() {
        let server = TestServer::start(8).await;
        let ring = server.fixed_ring(&[ADA, BO, CY, DEE]).await;
        let mut admin = server.client(ADMIN).await;

        let mut record = ring[0];
        for _ in 0..3 {
            let outcome = admin.process_kill(server.game, record).await.unwrap();
            if let Some(next) = outcome.inherited {
                record = next;
            }
        }

        let mut batch = Batch::new();
        for _ in 0..2 {
            batch.push(Write::AppendCorrection {
                game: server.game,
                kind: shared::CorrectionKind::KillDeduction,
                name: "Ada Lovelace".to_string(),
            });
        }
        server.store.commit(batch).await.unwrap();

        let board = server.client(DEE).await.leaderboard(server.game).await.unwrap();
        assert_eq!(board.len(), 4);
        let ada = board.iter().find(|e| e.name == "Ada Lovelace").unwrap();
        assert_eq!(ada.kills, 1);
        assert!(ada.alive);
        for name in ["Bo Diddley", "Cy Young", "Dee Snider"] {
            let entry = board.iter().find(|e| e.name == name).unwrap();
            assert_eq!(entry.kills, 0);
            assert!(!entry.alive);
            assert_eq!(entry.killed_by.as_deref(), Some("Ada Lovelace"));
        }
    }

    /// Corrections draw from alive players and show up in the game info
    #[tokio::test]
    async fn corrections_are_recorded() {
        let server = TestServer::start(12).await;
        server.fixed_ring(&[ADA, BO, CY, DEE]).await;
        let mut admin = server.client(ADMIN).await;

        let immune = admin.grant_immunity(server.game).await.unwrap().unwrap();
        let deducted = admin.deduct_kill(server.game).await.unwrap().unwrap();

        let info = server.client(ADA).await.game_info(server.game).await.unwrap();
        assert_eq!(info.immunities, vec![immune]);
        assert_eq!(info.kill_deductions, vec![deducted.clone()]);

        let board = admin.leaderboard(server.game).await.unwrap();
        let entry = board.iter().find(|e| e.name == deducted).unwrap();
        assert_eq!(entry.kills, -1);

        let err = rejection(server.client(BO).await.deduct_kill(server.game).await);
        assert!(matches!(err, HuntError::Unauthorized { .. }));
    }
}

/// ACCESS AND ERROR HANDLING TESTS
mod access_tests {
    use super::*;

    #[tokio::test]
    async fn outsider_has_no_assignment() {
        let server = TestServer::start(6).await;
        server.fixed_ring(&[ADA, BO]).await;

        let err = rejection(server.client(OUTSIDER).await.fetch_target(server.game).await);
        assert_eq!(
            err,
            HuntError::NotFound(Entity::Registration {
                user: OUTSIDER,
                game: server.game,
            })
        );

        let info = server.client(OUTSIDER).await.game_info(server.game).await.unwrap();
        assert!(!info.registered);
        assert_eq!(info.role, None);
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let server = TestServer::start(6).await;
        let missing = GameId(404);
        let err = rejection(server.client(ADMIN).await.leaderboard(missing).await);
        assert_eq!(err, HuntError::NotFound(Entity::Game(missing)));
    }

    /// A listing too large for one datagram comes back as a typed error
    #[tokio::test]
    async fn oversized_listing_is_rejected_not_dropped() {
        let users: Vec<UserEntry> = (1..=301)
            .map(|id| UserEntry {
                id,
                first_name: "Player".to_string(),
                surname: format!("Number{:04}", id),
            })
            .collect();
        let roster = Roster {
            users,
            games: vec![GameEntry {
                name: "Crowded Hunt".to_string(),
                admins: vec![1],
                players: (2..=301).collect(),
            }],
        };
        let server = TestServer::with_roster(roster, 13).await;
        let mut admin = server.client(ADMIN).await;

        for _ in 0..5 {
            admin.build_cycle(server.game).await.unwrap();
        }

        let records = server.store.read().await.targets_for_game(server.game).len();
        assert_eq!(records, 1500);
        let err = rejection(admin.list_targets(server.game).await);
        assert!(matches!(err, HuntError::ReplyTooLarge { bytes } if bytes > 65_507));

        let board = admin.leaderboard(server.game).await.unwrap();
        assert_eq!(board.len(), 300);
    }

    /// Malformed datagrams are dropped and the server keeps answering
    #[tokio::test]
    async fn garbage_datagram_does_not_stop_server() {
        let server = TestServer::start(6).await;
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.send_to(&[0xff; 32], server.addr).await.unwrap();

        let mut admin = server.client(ADMIN).await;
        let reply = admin
            .request(Operation::GameInfo { game: server.game })
            .await
            .unwrap();
        assert!(matches!(reply, Reply::GameInfo(info) if info.name == "Spring Hunt"));
    }
}
