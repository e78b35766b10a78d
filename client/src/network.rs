use bincode::{deserialize, serialize};
use log::{debug, warn};
use shared::{
    CycleSummary, GameId, GameInfo, HuntError, KillOutcome, LeaderboardEntry, Operation, Packet,
    RecordId, Reply, TargetInfo, TargetView, UserId, MAX_DATAGRAM_SIZE,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server address: {0}")]
    Address(#[from] std::net::AddrParseError),
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
    #[error("packet encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("server rejected request: {0}")]
    Rejected(#[from] HuntError),
    #[error("unexpected reply {0:?}")]
    UnexpectedReply(Box<Reply>),
}

/// Request/response client acting on behalf of one user.
///
/// Requests are sent one at a time; responses carrying another request id
/// (late answers to timed-out requests) are discarded.
pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    caller: UserId,
    timeout: Duration,
    next_request_id: u64,
}

impl Client {
    pub async fn new(server_addr: &str, caller: UserId) -> Result<Self, ClientError> {
        let server_addr: SocketAddr = server_addr.parse()?;
        let bind = if server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind).await?;

        Ok(Client {
            socket,
            server_addr,
            caller,
            timeout: DEFAULT_TIMEOUT,
            next_request_id: 1,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn caller(&self) -> UserId {
        self.caller
    }

    pub async fn request(&mut self, op: Operation) -> Result<Reply, ClientError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let packet = Packet::Request {
            request_id,
            caller: self.caller,
            op,
        };
        self.socket
            .send_to(&serialize(&packet)?, self.server_addr)
            .await?;
        debug!("Sent request {} to {}", request_id, self.server_addr);

        let deadline = Instant::now() + self.timeout;
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, addr) = timeout_at(deadline, self.socket.recv_from(&mut buffer))
                .await
                .map_err(|_| ClientError::Timeout(self.timeout))??;

            if addr != self.server_addr {
                warn!("Ignoring datagram from {}", addr);
                continue;
            }

            match deserialize::<Packet>(&buffer[..len]) {
                Ok(Packet::Response {
                    request_id: id,
                    result,
                }) if id == request_id => return Ok(result?),
                Ok(Packet::Response { request_id: id, .. }) => {
                    debug!("Discarding stale response {}", id);
                }
                Ok(_) => warn!("Unexpected packet type from server"),
                Err(e) => warn!("Failed to deserialize packet: {}", e),
            }
        }
    }

    pub async fn build_cycle(&mut self, game: GameId) -> Result<CycleSummary, ClientError> {
        match self.request(Operation::BuildCycle { game }).await? {
            Reply::CycleBuilt(summary) => Ok(summary),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }

    pub async fn process_kill(
        &mut self,
        game: GameId,
        record: RecordId,
    ) -> Result<KillOutcome, ClientError> {
        match self.request(Operation::ProcessKill { game, record }).await? {
            Reply::KillRecorded(outcome) => Ok(outcome),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }

    pub async fn fetch_target(&mut self, game: GameId) -> Result<TargetInfo, ClientError> {
        match self.request(Operation::FetchTarget { game }).await? {
            Reply::Target(target) => Ok(target),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }

    pub async fn leaderboard(&mut self, game: GameId) -> Result<Vec<LeaderboardEntry>, ClientError> {
        match self.request(Operation::Leaderboard { game }).await? {
            Reply::Leaderboard(board) => Ok(board),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }

    pub async fn list_targets(&mut self, game: GameId) -> Result<Vec<TargetView>, ClientError> {
        match self.request(Operation::ListTargets { game }).await? {
            Reply::Targets(targets) => Ok(targets),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }

    pub async fn grant_immunity(&mut self, game: GameId) -> Result<Option<String>, ClientError> {
        match self.request(Operation::GrantImmunity { game }).await? {
            Reply::Correction(name) => Ok(name),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }

    pub async fn deduct_kill(&mut self, game: GameId) -> Result<Option<String>, ClientError> {
        match self.request(Operation::DeductKill { game }).await? {
            Reply::Correction(name) => Ok(name),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }

    pub async fn game_info(&mut self, game: GameId) -> Result<GameInfo, ClientError> {
        match self.request(Operation::GameInfo { game }).await? {
            Reply::GameInfo(info) => Ok(info),
            other => Err(ClientError::UnexpectedReply(Box::new(other))),
        }
    }
}
