//! Decode-stream record parsing
//!
//! The decode tool emits one tab-separated record per observed packet:
//! `(link descriptor, epoch timestamp, payload length)`. Parsing one record
//! never touches shared state, so a bad line costs nothing but a log entry.

use thiserror::Error;

/// Token the decode tool uses for the host side of a transfer
const HOST_TOKEN: &str = "host";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 3 tab-separated fields, got {0}")]
    FieldCount(usize),

    #[error("bad link descriptor {0:?}")]
    Link(String),

    #[error("bad timestamp {0:?}")]
    Timestamp(String),

    #[error("bad payload length {0:?}")]
    Size(String),
}

/// One decoded packet, attributed to a device identity and direction label
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    pub device: String,
    pub direction: String,
    /// Capture timestamp, epoch seconds
    pub timestamp: f64,
    pub size_bytes: u64,
}

/// Parse one line of decode output
pub fn parse_record(line: &str) -> Result<PacketRecord, ParseError> {
    let fields: Vec<&str> = line.trim().split('\t').collect();
    if fields.len() != 3 {
        return Err(ParseError::FieldCount(fields.len()));
    }

    let (device, direction) = split_link(fields[0])?;
    let timestamp = fields[1]
        .parse::<f64>()
        .map_err(|_| ParseError::Timestamp(fields[1].to_string()))?;
    let size_bytes = fields[2]
        .parse::<u64>()
        .map_err(|_| ParseError::Size(fields[2].to_string()))?;

    Ok(PacketRecord {
        device,
        direction,
        timestamp,
        size_bytes,
    })
}

/// Split a link descriptor into device identity and direction label.
///
/// Transfers to or from the host carry the host token on one side. The device
/// identity is the lexicographically smaller of the two tokens, which keeps
/// the endpoint canonical whichever side it appears on, and the direction
/// follows the host token's position: host second means outbound, host first
/// means inbound. Links without the host token name the device first and the
/// direction label second.
fn split_link(link: &str) -> Result<(String, String), ParseError> {
    let mut tokens = link.split(',');
    let (Some(first), Some(second), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ParseError::Link(link.to_string()));
    };
    if first.is_empty() || second.is_empty() {
        return Err(ParseError::Link(link.to_string()));
    }

    if first == HOST_TOKEN || second == HOST_TOKEN {
        let device = first.min(second).to_string();
        let direction = if second == HOST_TOKEN { "out" } else { "in" };
        return Ok((device, direction.to_string()));
    }

    Ok((first.to_string(), second.to_string()))
}
