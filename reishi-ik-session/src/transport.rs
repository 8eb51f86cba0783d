//! Message transport used to carry handshake stages.
//!
//! Handshake messages are prefixed with a 2-byte big-endian length, the
//! framing libp2p uses for Noise. Stages are never fragmented or pipelined,
//! so one `send` is one frame and one `recv` reads exactly one frame.

use std::io;

use async_trait::async_trait;
use reishi_ik::MAX_MESSAGE_LEN;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Sends and receives whole handshake messages.
#[async_trait]
pub trait MessageTransport: Send {
    async fn send(&mut self, message: &[u8]) -> io::Result<()>;
    async fn recv(&mut self) -> io::Result<Vec<u8>>;
}

/// Length-prefixed framing over a byte stream.
#[derive(Debug)]
pub struct FramedTransport<T> {
    io: T,
    max_message_len: usize,
}

impl<T> FramedTransport<T> {
    pub fn new(io: T) -> Self {
        Self {
            io,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    /// Lower the largest accepted frame. Clamped to the Noise limit.
    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max.min(MAX_MESSAGE_LEN);
        self
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    fn too_large(&self, len: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "handshake message too large: {} > {}",
                len, self.max_message_len
            ),
        )
    }
}

#[async_trait]
impl<T> MessageTransport for FramedTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &[u8]) -> io::Result<()> {
        if message.len() > self.max_message_len {
            return Err(self.too_large(message.len()));
        }
        let mut frame = Vec::with_capacity(2 + message.len());
        frame.extend_from_slice(&(message.len() as u16).to_be_bytes());
        frame.extend_from_slice(message);
        self.io.write_all(&frame).await?;
        self.io.flush().await
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        let len = self.io.read_u16().await? as usize;
        if len > self.max_message_len {
            return Err(self.too_large(len));
        }
        let mut buf = vec![0u8; len];
        self.io.read_exact(&mut buf).await?;
        Ok(buf)
    }
}
