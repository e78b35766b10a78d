//! Server network layer handling UDP request/response traffic

use crate::game::HuntService;
use bincode::{deserialize, serialize, serialized_size};
use log::{debug, error, info, warn};
use shared::{HuntError, HuntResult, Packet, Reply, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages sent from request handlers to the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server coordinating networking and request handling
pub struct Server {
    socket: Arc<UdpSocket>,
    service: Arc<HuntService>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl Server {
    pub async fn new(addr: &str, service: Arc<HuntService>) -> std::io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            service,
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping [`Server::run`] from another task.
    pub fn shutdown_sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let data = serialize(packet)?;
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(format!("response of {} bytes exceeds a datagram", data.len()).into());
        }
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Dispatches one request on its own task so slow requests never hold up
    /// the receive loop.
    fn handle_packet(&self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Request {
                request_id,
                caller,
                op,
            } => {
                let service = Arc::clone(&self.service);
                let outbound_tx = self.outbound_tx.clone();

                tokio::spawn(async move {
                    let result = service.handle(caller, op).await;
                    let response = bounded_response(request_id, result);
                    if let Err(e) = outbound_tx.send(OutboundMessage::SendPacket {
                        packet: response,
                        addr,
                    }) {
                        error!("Failed to queue response for {}: {}", addr, e);
                    }
                });
            }
            Packet::Response { .. } => {
                warn!("Unexpected response packet from {}", addr);
            }
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    debug!("Packet from {}", addr);
                    self.handle_packet(packet, addr);
                }
                ServerMessage::Shutdown => break,
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}

/// Wraps a result in a response, swapping replies too large for one
/// datagram for a typed error so the caller never waits on a dropped packet.
fn bounded_response(request_id: u64, result: HuntResult<Reply>) -> Packet {
    let response = Packet::Response { request_id, result };
    let error = match serialized_size(&response) {
        Ok(bytes) if bytes <= MAX_DATAGRAM_SIZE as u64 => return response,
        Ok(bytes) => {
            warn!("Reply to request {} is {} bytes, too large to send", request_id, bytes);
            HuntError::ReplyTooLarge { bytes }
        }
        Err(e) => {
            error!("Failed to size reply to request {}: {}", request_id, e);
            HuntError::Storage(e.to_string())
        }
    };
    Packet::Response {
        request_id,
        result: Err(error),
    }
}
