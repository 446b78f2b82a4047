use std::{fmt::Display, net::SocketAddr, time::Duration};

use log::{debug, error, info, warn};
use net::ProtocolState;

pub struct ServerLogger;

impl ServerLogger {
    pub fn preparing_socket(address: &str) {
        info!("Preparing socket {}", address);
    }

    pub fn server_started(address: &SocketAddr) {
        info!("Server started on {address}");
    }

    pub fn accept_failed(err: &std::io::Error) {
        error!("Failed to accept connection: {err}");
    }

    pub fn connection_limit(addr: &SocketAddr) {
        debug!("Connection limit reached, rejecting {addr}");
    }

    pub fn tcp_nodelay_failed(err: &std::io::Error) {
        error!("Failed to set TCP_NODELAY: {err}");
    }

    pub fn new_connection(address: &SocketAddr) {
        info!("Client connected {}", address);
    }

    pub fn packet_received(addr: &SocketAddr, id: u32, length: u32) {
        debug!("Received packet {id:#04x} (length: {length}) from {addr}");
    }

    pub fn handshake_completed(addr: &SocketAddr, next_state: ProtocolState) {
        debug!(
            "Handshake from {} completed, next state: {}",
            addr,
            next_state.as_str()
        );
    }

    pub fn status_sent(addr: &SocketAddr, online: u32) {
        debug!("Sent status to {addr} ({online} online)");
    }

    pub fn ping_echoed(addr: &SocketAddr) {
        debug!("Echoed ping for {addr}");
    }

    pub fn client_disconnected(addr: &SocketAddr) {
        info!("Client disconnected {addr}");
    }

    pub fn connection_closed(addr: &SocketAddr) {
        debug!("Connection {addr} closed");
    }

    pub fn connection_interrupted(addr: &SocketAddr) {
        debug!("Closing {addr} for shutdown");
    }

    pub fn connection_error(addr: &SocketAddr, err: &dyn Display) {
        if dotenvy::var("DO_NOT_LOG_CONNECTION_ERROR").is_ok() {
            return;
        }
        error!("connection error@{addr}: {}", err);
    }

    pub fn registry_inconsistent(err: &dyn Display) {
        error!("Connection registry out of sync: {err}");
    }

    pub fn shutting_down(open: usize) {
        info!("Stopping listener, waiting for {open} open connection(s)");
    }

    pub fn drain_timeout(grace: Duration, open: usize) {
        warn!("{open} connection(s) still open after {grace:?}, giving up");
    }

    pub fn stopped() {
        info!("Server stopped");
    }
}
