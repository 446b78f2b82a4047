use std::{net::SocketAddr, time::Duration};

use bytes::BytesMut;
use net::{PacketDecoder, PacketEncode, PacketEncoder, PacketFrame};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::error::ConnectionError;

const MAX_CHUNK_SIZE: usize = 1024;

/// Client socket with framing state.
pub struct Connection {
    address: SocketAddr,
    stream: TcpStream,
    dec: PacketDecoder,
    enc: PacketEncoder,
    buf: BytesMut,
    read_timeout: Duration,
}

impl Connection {
    pub fn new(stream: TcpStream, address: SocketAddr, read_timeout: Duration) -> Self {
        Self {
            address,
            stream,
            dec: PacketDecoder::new(),
            enc: PacketEncoder::new(),
            buf: BytesMut::with_capacity(MAX_CHUNK_SIZE),
            read_timeout,
        }
    }

    pub fn addr(&self) -> &SocketAddr {
        &self.address
    }

    /// Reads until one whole frame is buffered. Partial reads accumulate in
    /// the decoder; a zero-length read means the peer went away.
    pub async fn recv_frame(&mut self) -> Result<PacketFrame, ConnectionError> {
        loop {
            if let Some(frame) = self.dec.try_next_packet()? {
                return Ok(frame);
            }

            self.buf.clear();
            self.buf.reserve(MAX_CHUNK_SIZE);
            let read = timeout(self.read_timeout, self.stream.read_buf(&mut self.buf)).await??;
            if read == 0 {
                return Err(ConnectionError::Disconnected);
            }

            self.dec.queue_slice(&self.buf);
        }
    }

    pub async fn send<P: PacketEncode>(&mut self, pkt: &P) -> Result<(), ConnectionError> {
        self.enc.write_packet(pkt)?;
        let bytes = self.enc.take();
        self.send_raw(&bytes).await
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Sends FIN; the socket itself closes on drop.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
