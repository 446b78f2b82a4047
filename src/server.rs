use std::{net::SocketAddr, sync::Arc};

use net::{Packet, ProtocolState, StatusResponse, STATUS_PING_ID, STATUS_REQUEST_ID};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, Semaphore},
    time::timeout,
};

use crate::{
    config::ServerConfig,
    connection::Connection,
    error::ConnectionError,
    logging::ServerLogger,
    metrics::HandshakeMetrics,
    registry::{ConnectionHandle, ConnectionRegistry},
    telemetry::get_meter,
};

pub struct Server {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    metrics: HandshakeMetrics,
    shutdown: broadcast::Sender<()>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Server {
        Server {
            config,
            registry: Arc::new(ConnectionRegistry::new()),
            metrics: HandshakeMetrics::new(&get_meter()),
            shutdown: broadcast::channel(1).0,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub async fn start(&'static self, stop: broadcast::Receiver<()>) -> anyhow::Result<()> {
        ServerLogger::preparing_socket(&self.config.bind);
        let address: SocketAddr = self.config.bind.parse()?;
        let listener = TcpListener::bind(address).await?;
        self.serve(listener, stop).await
    }

    /// Accept loop. Runs until `stop` fires, then tells open connections to
    /// close and waits for them within the configured grace period.
    pub async fn serve(
        &'static self,
        listener: TcpListener,
        mut stop: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        ServerLogger::server_started(&listener.local_addr()?);
        let semaphore = Arc::new(Semaphore::new(self.config.max_conn as usize));

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = stop.recv() => break,
            };

            let (client, addr) = match accepted {
                Ok(value) => value,
                Err(err) => {
                    ServerLogger::accept_failed(&err);
                    continue;
                }
            };

            let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                ServerLogger::connection_limit(&addr);
                drop(client);
                continue;
            };

            if let Err(err) = client.set_nodelay(true) {
                ServerLogger::tcp_nodelay_failed(&err);
            }

            self.metrics.record_open();
            let handle = self.registry.insert(addr);
            let shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                self.handle_connection(client, addr, handle, shutdown).await;
                drop(permit);
            });
        }

        drop(listener);
        // no receivers means no open handlers
        let _ = self.shutdown.send(());
        self.drain().await;
        Ok(())
    }

    async fn drain(&self) {
        let open = self.registry.len();
        ServerLogger::shutting_down(open);
        let grace = self.config.shutdown_grace();
        if timeout(grace, self.registry.wait_empty()).await.is_err() {
            ServerLogger::drain_timeout(grace, self.registry.len());
        }
        ServerLogger::stopped();
    }

    pub async fn handle_connection(
        &self,
        stream: TcpStream,
        address: SocketAddr,
        handle: ConnectionHandle,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        ServerLogger::new_connection(&address);
        let mut connection = Connection::new(stream, address, self.config.read_timeout());

        match self.drive(&mut connection, &handle, &mut shutdown).await {
            Ok(()) => ServerLogger::connection_closed(&address),
            Err(ConnectionError::Disconnected) => ServerLogger::client_disconnected(&address),
            Err(ConnectionError::ShuttingDown) => ServerLogger::connection_interrupted(&address),
            Err(err) => {
                if handle.state() == Some(ProtocolState::Handshaking) {
                    self.metrics.record_failure(err.kind());
                }
                ServerLogger::connection_error(&address, &err);
            }
        }

        connection.shutdown().await;
        // deregisters before the socket is released
        drop(handle);
    }

    /// Per-connection state machine. Returns `Ok` when the exchange ended
    /// normally (ping answered).
    async fn drive(
        &self,
        connection: &mut Connection,
        handle: &ConnectionHandle,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ConnectionError> {
        let address = *connection.addr();
        let mut state = ProtocolState::Handshaking;

        loop {
            let frame = tokio::select! {
                frame = connection.recv_frame() => frame?,
                _ = shutdown.recv() => return Err(ConnectionError::ShuttingDown),
            };
            ServerLogger::packet_received(&address, frame.id, frame.length);
            let packet = Packet::from_frame(state, frame)?;
            let id = packet.id();

            match state {
                ProtocolState::Handshaking => {
                    let Packet::Handshake { handshake, .. } = packet else {
                        return Err(ConnectionError::UnhandledPacket { state, id });
                    };

                    if handshake.protocol_version != self.config.protocol_version {
                        return Err(ConnectionError::VersionMismatch {
                            client: handshake.protocol_version,
                            server: self.config.protocol_version,
                        });
                    }

                    state = handshake.next_state.target_state();
                    handle.set_state(state)?;
                    self.metrics.record_attempt(state.as_str());
                    ServerLogger::handshake_completed(&address, state);
                }
                ProtocolState::Status => match id {
                    STATUS_REQUEST_ID => {
                        let status = self.status_response();
                        connection.send(&status).await?;
                        self.metrics.record_status();
                        ServerLogger::status_sent(&address, status.online_players);
                    }
                    STATUS_PING_ID => {
                        connection.send_raw(packet.frame().raw()).await?;
                        ServerLogger::ping_echoed(&address);
                        return Ok(());
                    }
                    _ => return Err(ConnectionError::UnhandledPacket { state, id }),
                },
                ProtocolState::Login | ProtocolState::Play => {
                    return Err(ConnectionError::UnhandledState(state));
                }
            }
        }
    }

    pub fn status_response(&self) -> StatusResponse {
        let online = u32::try_from(self.registry.online_players()).unwrap_or(u32::MAX);
        StatusResponse::new(
            &self.config.version_name,
            self.config.protocol_version,
            self.config.max_players,
            online,
            self.config.description.clone(),
            self.config.enforces_secure_chat,
        )
    }
}
