//! Handshake token and length-delimited message framing.
//!
//! A frame is a 4-byte little-endian payload length followed by exactly that
//! many bytes of JSON. Readers consume precisely one frame and never read past
//! its end, so a stream may carry further data after it.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Token a client writes immediately after connecting.
pub const MAGIC: &[u8; 6] = b"RASCSI";

/// Largest payload accepted in either direction.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

const LENGTH_PREFIX_BYTES: usize = 4;

/// Errors raised while exchanging the handshake token.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Writing or reading the token failed.
    #[error("failed to exchange magic token: {0}")]
    Io(#[from] io::Error),
    /// The peer sent something other than [`MAGIC`].
    #[error("invalid magic token {received:?}")]
    Mismatch {
        /// Bytes received instead of the token.
        received: Vec<u8>,
    },
}

/// Errors raised while writing or reading a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying stream failed or ended early.
    #[error("frame I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The payload exceeds [`MAX_FRAME_BYTES`].
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Declared or encoded payload size.
        size: usize,
        /// Configured limit.
        max: usize,
    },
    /// The message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    /// The payload did not decode into the expected message.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Writes the handshake token.
///
/// # Errors
///
/// Returns [`HandshakeError::Io`] if the token cannot be written completely.
pub fn write_magic<W: Write>(writer: &mut W) -> Result<(), HandshakeError> {
    writer.write_all(MAGIC)?;
    writer.flush()?;
    Ok(())
}

/// Reads and validates the handshake token.
///
/// # Errors
///
/// Returns [`HandshakeError::Io`] when fewer than six bytes arrive and
/// [`HandshakeError::Mismatch`] when they differ from [`MAGIC`].
pub fn read_magic<R: Read>(reader: &mut R) -> Result<(), HandshakeError> {
    let mut received = [0_u8; MAGIC.len()];
    reader.read_exact(&mut received)?;
    if &received != MAGIC {
        return Err(HandshakeError::Mismatch {
            received: received.to_vec(),
        });
    }
    Ok(())
}

/// Serialises `message` and writes it as one frame.
///
/// # Errors
///
/// Returns [`FrameError`] when encoding fails, the payload is too large, or
/// the stream rejects the write.
#[expect(clippy::little_endian_bytes, reason = "the wire length prefix is little-endian")]
pub fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize,
{
    let payload = serde_json::to_vec(message).map_err(FrameError::Encode)?;
    let length = frame_length(payload.len())?;
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads exactly one frame and deserialises it.
///
/// # Errors
///
/// Returns [`FrameError`] when the stream ends early, the declared length is
/// too large, or the payload does not decode.
#[expect(clippy::little_endian_bytes, reason = "the wire length prefix is little-endian")]
pub fn read_message<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut prefix = [0_u8; LENGTH_PREFIX_BYTES];
    reader.read_exact(&mut prefix)?;
    let size = usize::try_from(u32::from_le_bytes(prefix)).unwrap_or(usize::MAX);
    if size > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge {
            size,
            max: MAX_FRAME_BYTES,
        });
    }

    let mut payload = vec![0_u8; size];
    reader.read_exact(&mut payload)?;
    serde_json::from_slice(&payload).map_err(FrameError::Decode)
}

fn frame_length(size: usize) -> Result<u32, FrameError> {
    if size > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge {
            size,
            max: MAX_FRAME_BYTES,
        });
    }
    u32::try_from(size).map_err(|_| FrameError::TooLarge {
        size,
        max: MAX_FRAME_BYTES,
    })
}
