//! Abstractions for the node types, [`ServerNode`] and [`ClientNode`], and the TCP framing
//! they share.

pub use self::{client::ClientNode, server::ServerNode};

pub mod client;
pub mod server;

use crate::messages::TcpMessage;
use eyre::{bail, Context};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound for the payload of a single frame (1 MiB).
///
/// A call carries two operands and a clock, so anything larger is rejected on both ends.
pub const MAX_MSG_LEN: u64 = 1 << 20;

/// Sends the given message on the given tcp stream.
///
/// TCP messages should only be sent using this method, to ensure that all
/// messages are sent in the same format: an 8-byte little-endian length followed by the
/// JSON-encoded message.
pub async fn send_tcp_message<W>(message: &TcpMessage, stream_tx: &mut W) -> eyre::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let serialized = serde_json::to_vec(&message).context("failed to serialize tcp message")?;
    if serialized.len() as u64 > MAX_MSG_LEN {
        bail!(
            "Message is too long (length: {} bytes, limit: {})",
            serialized.len(),
            MAX_MSG_LEN
        );
    }
    let len = (serialized.len() as u64).to_le_bytes();
    stream_tx
        .write_all(&len)
        .await
        .context("failed to send message length")?;
    stream_tx
        .write_all(&serialized)
        .await
        .context("failed to send message")?;
    stream_tx.flush().await.context("failed to flush stream")?;
    log::trace!("sent tcp message: {:?}", message);
    Ok(())
}

/// Receives the raw bytes of one frame from the given stream.
///
/// Returns `Ok(None)` if the peer closed the connection before or during the frame.
pub async fn receive_tcp_frame<R>(stream_rx: &mut R) -> eyre::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_raw = [0; 8];
    if let Err(err) = stream_rx.read_exact(&mut len_raw).await {
        if err.kind() == std::io::ErrorKind::UnexpectedEof
            || err.kind() == std::io::ErrorKind::ConnectionReset
        {
            return Ok(None);
        } else {
            return Err(eyre::Error::new(err).wrap_err("failed to read message length"));
        }
    }
    let len = u64::from_le_bytes(len_raw);

    if len > MAX_MSG_LEN {
        bail!(
            "Message is too long (length: {} bytes, limit: {})",
            len,
            MAX_MSG_LEN
        );
    }

    let mut buf = vec![0; len as usize];
    if let Err(err) = stream_rx.read_exact(&mut buf).await {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            log::warn!("receive tcp message failed: {}", err);
            return Ok(None);
        } else {
            return Err(eyre::Error::new(err).wrap_err("failed to read message"));
        }
    }
    Ok(Some(buf))
}

/// Receives a [`TcpMessage`] from the given stream.
///
/// This function requires that all messages are sent using [`send_tcp_message`],
/// otherwise parsing the messages will fail.
pub async fn receive_tcp_message<R>(stream_rx: &mut R) -> eyre::Result<Option<TcpMessage>>
where
    R: AsyncRead + Unpin,
{
    let buf = match receive_tcp_frame(stream_rx).await? {
        Some(buf) => buf,
        None => return Ok(None),
    };
    let message = decode_message(&buf)?;
    log::trace!("received tcp message: {:?}", message);
    Ok(Some(message))
}

pub(crate) fn decode_message(buf: &[u8]) -> eyre::Result<TcpMessage> {
    serde_json::from_slice(buf).with_context(|| {
        format!(
            "failed to deserialize message: `{}`",
            String::from_utf8_lossy(buf)
        )
    })
}
