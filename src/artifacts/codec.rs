//! Binary envelope shared by every persisted artifact.
//!
//! Layout (bincode): `format_version`, `kind`, hex SHA-256 of `payload`, `payload`.
//! The payload is itself bincode, which writes `f64` values as their raw bits, so a
//! decoded artifact is bit-identical to the encoded one.

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::Display;

/// Current envelope format
pub const FORMAT_VERSION: u32 = 1;

/// What an artifact contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
    Preprocessor,
    Model,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    kind: ArtifactKind,
    checksum: String,
    payload: Vec<u8>,
}

/// Header of an encoded artifact, without decoding its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeInfo {
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub checksum: String,
    pub payload_bytes: usize,
}

fn checksum(payload: &[u8]) -> String {
    format!("{:x}", Sha256::digest(payload))
}

/// Encode `value` as an artifact of the given kind
pub fn encode<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(value).map_err(|e| {
        AppError::Serialization(format!("Failed to serialize {} artifact: {}", kind, e))
    })?;

    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        kind,
        checksum: checksum(&payload),
        payload,
    };

    bincode::serialize(&envelope).map_err(|e| {
        AppError::Serialization(format!("Failed to serialize artifact envelope: {}", e))
    })
}

fn open(bytes: &[u8]) -> Result<Envelope> {
    let envelope: Envelope = bincode::deserialize(bytes).map_err(|e| {
        AppError::ArtifactCorrupt(format!("Unreadable artifact envelope: {}", e))
    })?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(AppError::ArtifactCorrupt(format!(
            "Unsupported artifact format version {} (expected {})",
            envelope.format_version, FORMAT_VERSION
        )));
    }

    let actual = checksum(&envelope.payload);
    if actual != envelope.checksum {
        return Err(AppError::ArtifactCorrupt(format!(
            "Checksum mismatch: recorded {}, computed {}",
            envelope.checksum, actual
        )));
    }

    Ok(envelope)
}

/// Decode an artifact, requiring it to be of the expected kind
pub fn decode<T: DeserializeOwned>(expected: ArtifactKind, bytes: &[u8]) -> Result<T> {
    let envelope = open(bytes)?;

    if envelope.kind != expected {
        return Err(AppError::ArtifactCorrupt(format!(
            "Expected a {} artifact, found {}",
            expected, envelope.kind
        )));
    }

    bincode::deserialize(&envelope.payload).map_err(|e| {
        AppError::ArtifactCorrupt(format!("Unreadable {} payload: {}", expected, e))
    })
}

/// Read and verify an artifact header
pub fn inspect(bytes: &[u8]) -> Result<EnvelopeInfo> {
    let envelope = open(bytes)?;
    Ok(EnvelopeInfo {
        format_version: envelope.format_version,
        kind: envelope.kind,
        checksum: envelope.checksum,
        payload_bytes: envelope.payload.len(),
    })
}
