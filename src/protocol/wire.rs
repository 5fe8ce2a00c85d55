//! RFC 5734 wire framing.
//!
//! Each EPP frame on the wire is a 4-byte unsigned big-endian length header
//! followed by the XML payload. The length value counts the 4 header bytes
//! themselves, so the smallest legal value is 5 (a one-byte payload).
//!
//! ```text
//! ┌────────────┬──────────────────────┐
//! │ Length     │ XML payload          │
//! │ 4 bytes BE │ (length − 4) bytes   │
//! └────────────┴──────────────────────┘
//! ```
//!
//! The framer moves bytes only; it never interprets the XML.

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Smallest legal length value (header plus a one-byte payload).
pub const MIN_FRAME_LEN: u32 = 5;

/// Largest payload accepted from a peer, guarding against memory bombs.
pub const MAX_FRAME_LEN: u32 = 4 * 1024 * 1024;

/// Wire framing violations.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The peer closed the stream between frames.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended inside a header or payload.
    #[error("connection closed mid-frame")]
    Truncated,

    /// The length header is below the 5-byte minimum.
    #[error("frame length {0} below minimum {MIN_FRAME_LEN}")]
    LengthTooSmall(u32),

    /// The length header exceeds the configured maximum.
    #[error("frame length {0} exceeds maximum {MAX_FRAME_LEN}")]
    LengthTooLarge(u32),

    /// Underlying stream error.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for framing operations.
pub type Result<T> = std::result::Result<T, FramingError>;

/// Validate a decoded length header.
pub fn validate_frame_len(len: u32) -> Result<usize> {
    if len < MIN_FRAME_LEN {
        return Err(FramingError::LengthTooSmall(len));
    }
    if len > MAX_FRAME_LEN {
        return Err(FramingError::LengthTooLarge(len));
    }
    Ok(len as usize - HEADER_SIZE)
}

/// Read one frame, returning the XML payload bytes.
///
/// A clean EOF before the first header byte maps to
/// [`FramingError::ConnectionClosed`]; an EOF anywhere later maps to
/// [`FramingError::Truncated`].
pub async fn read_frame<S>(stream: &mut S) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];

    // The first byte distinguishes "no next frame" from a truncated one.
    let n = stream.read(&mut header[..1]).await?;
    if n == 0 {
        return Err(FramingError::ConnectionClosed);
    }
    stream
        .read_exact(&mut header[1..])
        .await
        .map_err(map_eof_truncated)?;

    let payload_len = validate_frame_len(u32::from_be_bytes(header))?;

    let mut payload = vec![0u8; payload_len];
    stream
        .read_exact(&mut payload)
        .await
        .map_err(map_eof_truncated)?;

    Ok(payload)
}

/// Write one frame: length header plus payload in a single buffer.
///
/// The frame is assembled before writing so the stream never observes a
/// header without its payload.
pub async fn write_frame<S>(stream: &mut S, payload: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let total = (payload.len() + HEADER_SIZE) as u32;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&total.to_be_bytes());
    buf.extend_from_slice(payload);

    stream.write_all(&buf).await?;
    stream.flush().await?;

    Ok(())
}

fn map_eof_truncated(e: std::io::Error) -> FramingError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FramingError::Truncated
    } else {
        FramingError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"<epp/>").await.unwrap();
        let payload = read_frame(&mut server).await.unwrap();

        assert_eq!(payload, b"<epp/>");
    }

    #[tokio::test]
    async fn test_length_includes_header() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"hello").await.unwrap();

        let mut raw = [0u8; 9];
        server.read_exact(&mut raw).await.unwrap();
        assert_eq!(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]), 9);
        assert_eq!(&raw[4..], b"hello");
    }

    #[tokio::test]
    async fn test_multiple_frames_in_sequence() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        write_frame(&mut client, b"one").await.unwrap();
        write_frame(&mut client, b"two").await.unwrap();

        assert_eq!(read_frame(&mut server).await.unwrap(), b"one");
        assert_eq!(read_frame(&mut server).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_clean_eof_is_connection_closed() {
        let (client, mut server) = tokio::io::duplex(1024);
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, FramingError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        client.write_all(&[0, 0]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, FramingError::Truncated));
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        // Header promises 16 payload bytes but only 3 arrive.
        client.write_all(&20u32.to_be_bytes()).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, FramingError::Truncated));
    }

    #[tokio::test]
    async fn test_length_below_minimum() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        client.write_all(&4u32.to_be_bytes()).await.unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, FramingError::LengthTooSmall(4)));
    }

    #[tokio::test]
    async fn test_length_above_maximum() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        client
            .write_all(&(MAX_FRAME_LEN + 1).to_be_bytes())
            .await
            .unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, FramingError::LengthTooLarge(_)));
    }

    #[test]
    fn test_validate_frame_len() {
        assert!(validate_frame_len(0).is_err());
        assert!(validate_frame_len(MIN_FRAME_LEN - 1).is_err());
        assert_eq!(validate_frame_len(MIN_FRAME_LEN).unwrap(), 1);
        assert_eq!(validate_frame_len(1024).unwrap(), 1020);
        assert!(validate_frame_len(MAX_FRAME_LEN + 1).is_err());
    }
}
