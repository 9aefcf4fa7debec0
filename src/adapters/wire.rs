//! Framing and messages for the data server protocol.
//!
//! Every frame is a one-byte protocol version, a big-endian `u32` payload
//! length, then that many bytes of JSON.

use crate::domain::bar::Bar;
use crate::domain::error::BarflowError;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

pub const PROTOCOL_VERSION: u8 = 1;
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    ListSymbols,
    FetchBars {
        symbol: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Symbols(Vec<String>),
    Bars(Vec<Bar>),
    Error { message: String },
}

fn protocol(reason: impl Into<String>) -> BarflowError {
    BarflowError::Protocol {
        reason: reason.into(),
    }
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), BarflowError> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| protocol(format!("frame of {} bytes exceeds limit", payload.len())))?;

    writer.write_all(&[PROTOCOL_VERSION])?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed the stream cleanly
/// before a new frame began.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, BarflowError> {
    let mut version = [0u8; 1];
    match reader.read_exact(&mut version) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    if version[0] != PROTOCOL_VERSION {
        return Err(protocol(format!(
            "unsupported protocol version {} (expected {})",
            version[0], PROTOCOL_VERSION
        )));
    }

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(protocol(format!("frame of {} bytes exceeds limit", len)));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

pub fn send<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), BarflowError> {
    let payload =
        serde_json::to_vec(message).map_err(|e| protocol(format!("encode failed: {}", e)))?;
    write_frame(writer, &payload)
}

pub fn recv<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, BarflowError> {
    match read_frame(reader)? {
        None => Ok(None),
        Some(payload) => serde_json::from_slice(&payload)
            .map(Some)
            .map_err(|e| protocol(format!("decode failed: {}", e))),
    }
}
