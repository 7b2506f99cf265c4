// Packet dataset: the labeled (packet bytes, expected checksum) examples a
// search runs against.
//
// Datasets arrive from two places: JSONL files (one record per line, parsed
// with serde_json) and the `[packets]` section of a `.cads` configuration
// file (see `config`). Either way the core only ever sees an immutable
// `Dataset` with its minimum packet length computed once.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::warn;
use serde::Deserialize;
use thiserror::Error;

/// Largest packet the loaders accept, in bytes.
pub const MAX_PACKET_SIZE: usize = 1024;

/// Largest checksum width, in bytes.
pub const MAX_CHECKSUM_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for dataset construction and loading.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex string '{0}': {1}")]
    InvalidHex(String, String),
    #[error("packet size {0} out of range 1..={MAX_PACKET_SIZE}")]
    PacketSize(usize),
    #[error("checksum size {0} out of range 1..={MAX_CHECKSUM_SIZE}")]
    ChecksumSize(usize),
    #[error("no valid packets found")]
    Empty,
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A single labeled example: packet bytes (checksum excluded) and the
/// checksum those bytes are expected to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
    expected_checksum: u64,
    checksum_size: usize,
    description: String,
}

impl Packet {
    /// Build a packet, validating size limits.
    pub fn new(
        bytes: Vec<u8>,
        expected_checksum: u64,
        checksum_size: usize,
        description: impl Into<String>,
    ) -> Result<Packet, DatasetError> {
        if bytes.is_empty() || bytes.len() > MAX_PACKET_SIZE {
            return Err(DatasetError::PacketSize(bytes.len()));
        }
        if checksum_size == 0 || checksum_size > MAX_CHECKSUM_SIZE {
            return Err(DatasetError::ChecksumSize(checksum_size));
        }
        Ok(Packet {
            bytes,
            expected_checksum,
            checksum_size,
            description: description.into(),
        })
    }

    /// Build a packet from hex strings, as found in input files.
    pub fn from_hex(
        packet_hex: &str,
        checksum_hex: &str,
        checksum_size: usize,
        description: impl Into<String>,
    ) -> Result<Packet, DatasetError> {
        let bytes = decode_hex(packet_hex)?;
        let checksum = decode_checksum_hex(checksum_hex, checksum_size)?;
        Packet::new(bytes, checksum, checksum_size, description)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn expected_checksum(&self) -> u64 {
        self.expected_checksum
    }

    pub fn checksum_size(&self) -> usize {
        self.checksum_size
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// An ordered, non-empty collection of packets, shared read-only by every
/// worker for the duration of a search.
#[derive(Debug, Clone)]
pub struct Dataset {
    packets: Vec<Packet>,
    min_packet_len: usize,
}

impl Dataset {
    /// Build a dataset from packets; at least one is required.
    pub fn new(packets: Vec<Packet>) -> Result<Dataset, DatasetError> {
        let min_packet_len = packets
            .iter()
            .map(Packet::len)
            .min()
            .ok_or(DatasetError::Empty)?;
        Ok(Dataset {
            packets,
            min_packet_len,
        })
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Length of the shortest packet, computed once at construction. Field
    /// subsets are drawn from `0..min_packet_len` so every permutation is in
    /// bounds for every packet.
    pub fn min_packet_len(&self) -> usize {
        self.min_packet_len
    }

    /// Load packets from a JSONL file (one JSON object per line).
    pub fn from_jsonl_path(
        path: impl AsRef<Path>,
        checksum_size: usize,
    ) -> Result<Dataset, DatasetError> {
        let file = File::open(path.as_ref())?;
        Dataset::from_jsonl_reader(file, checksum_size)
    }

    /// Load packets from JSONL text. Blank lines and lines starting with
    /// `#` or `/` are skipped; a line missing `packet` or `checksum` is
    /// skipped with a warning; zero usable packets is an error.
    pub fn from_jsonl_reader(
        reader: impl Read,
        checksum_size: usize,
    ) -> Result<Dataset, DatasetError> {
        #[derive(Deserialize)]
        struct PacketRecord {
            packet: String,
            checksum: String,
            #[serde(default)]
            description: Option<String>,
        }

        let mut packets = Vec::new();
        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line_number = index + 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('/') {
                continue;
            }

            let record: PacketRecord = match serde_json::from_str(trimmed) {
                Ok(record) => record,
                Err(e) => {
                    warn!("skipping line {line_number}: {e}");
                    continue;
                }
            };

            let description = record
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("Packet_{line_number}"));

            match Packet::from_hex(&record.packet, &record.checksum, checksum_size, description) {
                Ok(packet) => packets.push(packet),
                Err(e) => warn!("skipping line {line_number}: {e}"),
            }
        }

        Dataset::new(packets)
    }
}

// ---------------------------------------------------------------------------
// Hex decoding
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Interior whitespace is tolerated; an odd
/// digit count or a non-hex character is an error.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, DatasetError> {
    let mut bytes = Vec::with_capacity(s.len() / 2);
    let mut high: Option<u8> = None;
    for ch in s.chars() {
        if ch.is_whitespace() {
            continue;
        }
        let nibble = ch
            .to_digit(16)
            .ok_or_else(|| DatasetError::InvalidHex(s.to_string(), format!("bad digit '{ch}'")))?
            as u8;
        match high.take() {
            None => high = Some(nibble),
            Some(h) => bytes.push((h << 4) | nibble),
        }
    }
    if high.is_some() {
        return Err(DatasetError::InvalidHex(
            s.to_string(),
            "odd number of hex digits".to_string(),
        ));
    }
    Ok(bytes)
}

/// Decode a hex checksum string, big-endian, masked to `checksum_size`
/// bytes.
pub fn decode_checksum_hex(s: &str, checksum_size: usize) -> Result<u64, DatasetError> {
    if checksum_size == 0 || checksum_size > MAX_CHECKSUM_SIZE {
        return Err(DatasetError::ChecksumSize(checksum_size));
    }
    let mut value: u64 = 0;
    let mut digits = 0usize;
    for ch in s.chars() {
        if ch.is_whitespace() {
            continue;
        }
        let nibble = ch
            .to_digit(16)
            .ok_or_else(|| DatasetError::InvalidHex(s.to_string(), format!("bad digit '{ch}'")))?
            as u64;
        value = (value << 4) | nibble;
        digits += 1;
        if digits > 16 {
            return Err(DatasetError::InvalidHex(
                s.to_string(),
                "more than 16 hex digits".to_string(),
            ));
        }
    }
    if digits == 0 {
        return Err(DatasetError::InvalidHex(
            s.to_string(),
            "empty checksum".to_string(),
        ));
    }
    let mask = if checksum_size == 8 {
        u64::MAX
    } else {
        (1u64 << (checksum_size * 8)) - 1
    };
    Ok(value & mask)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
