//! Versioned artifact envelope.
//!
//! Every persisted model is wrapped as:
//!
//! ```text
//! magic "JCKA" | version u16 LE | kind u8 | payload length u32 LE | payload | CRC-32 u32 LE
//! ```
//!
//! The payload is bincode. Decoding checks every header field and the
//! checksum before touching the payload.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analysis::NormalizerOptions;
use crate::classifier::TrainedClassifier;
use crate::error::{JobCheckError, Result};
use crate::feature::VocabularyModel;
use crate::storage::keys;
use crate::storage::traits::ArtifactStore;

/// Envelope magic bytes.
pub const MAGIC: &[u8; 4] = b"JCKA";

/// Current envelope format version.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 1 + 4;
const TRAILER_LEN: usize = 4;

/// What an envelope contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ArtifactKind {
    Vocabulary = 1,
    Classifier = 2,
}

impl ArtifactKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ArtifactKind::Vocabulary),
            2 => Some(ArtifactKind::Classifier),
            _ => None,
        }
    }
}

/// Decoded envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub version: u16,
    pub kind: ArtifactKind,
    pub payload_len: u32,
    pub checksum: u32,
}

/// The fitted vocabulary together with the normalizer options it was
/// trained behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyArtifact {
    pub normalizer: NormalizerOptions,
    pub vocabulary: VocabularyModel,
}

/// Serialize `value` into an envelope of `kind`.
pub fn encode<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(value)?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| JobCheckError::artifact("payload exceeds 4 GiB"))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    bytes.extend_from_slice(MAGIC);
    bytes.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    bytes.write_u8(kind as u8)?;
    bytes.write_u32::<LittleEndian>(payload_len)?;
    bytes.extend_from_slice(&payload);
    bytes.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
    Ok(bytes)
}

/// Validate the envelope and return its header.
pub fn read_header(bytes: &[u8]) -> Result<ArtifactHeader> {
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(JobCheckError::artifact(format!(
            "blob too short: {} bytes",
            bytes.len()
        )));
    }

    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(JobCheckError::artifact("bad magic, not a jobcheck artifact"));
    }

    let version = cursor.read_u16::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(JobCheckError::artifact(format!(
            "unsupported format version {version}, expected {FORMAT_VERSION}"
        )));
    }

    let raw_kind = cursor.read_u8()?;
    let kind = ArtifactKind::from_u8(raw_kind)
        .ok_or_else(|| JobCheckError::artifact(format!("unknown artifact kind {raw_kind}")))?;

    let payload_len = cursor.read_u32::<LittleEndian>()?;
    if payload_len as usize != bytes.len() - HEADER_LEN - TRAILER_LEN {
        return Err(JobCheckError::artifact(format!(
            "payload length {} does not match blob size {}",
            payload_len,
            bytes.len()
        )));
    }

    let payload = &bytes[HEADER_LEN..HEADER_LEN + payload_len as usize];
    let mut trailer = &bytes[HEADER_LEN + payload_len as usize..];
    let checksum = trailer.read_u32::<LittleEndian>()?;
    if crc32fast::hash(payload) != checksum {
        return Err(JobCheckError::artifact("checksum mismatch, artifact is corrupt"));
    }

    Ok(ArtifactHeader {
        version,
        kind,
        payload_len,
        checksum,
    })
}

/// Validate an envelope of `kind` and deserialize its payload.
pub fn decode<T: DeserializeOwned>(kind: ArtifactKind, bytes: &[u8]) -> Result<T> {
    let header = read_header(bytes)?;
    if header.kind != kind {
        return Err(JobCheckError::artifact(format!(
            "expected {:?} artifact, found {:?}",
            kind, header.kind
        )));
    }

    let payload = &bytes[HEADER_LEN..HEADER_LEN + header.payload_len as usize];
    bincode::deserialize(payload)
        .map_err(|e| JobCheckError::artifact(format!("failed to decode {kind:?} payload: {e}")))
}

/// Encode and store the vocabulary artifact.
pub fn save_vocabulary(store: &dyn ArtifactStore, artifact: &VocabularyArtifact) -> Result<()> {
    store.put(
        keys::VOCABULARY,
        &encode(ArtifactKind::Vocabulary, artifact)?,
    )
}

/// Load and decode the vocabulary artifact.
pub fn load_vocabulary(store: &dyn ArtifactStore) -> Result<VocabularyArtifact> {
    let artifact: VocabularyArtifact =
        decode(ArtifactKind::Vocabulary, &store.get(keys::VOCABULARY)?)?;
    if !artifact.vocabulary.is_fitted() {
        return Err(JobCheckError::artifact("stored vocabulary is not fitted"));
    }
    Ok(artifact)
}

/// Encode and store a classifier under `key`.
pub fn save_classifier(
    store: &dyn ArtifactStore,
    key: &str,
    classifier: &TrainedClassifier,
) -> Result<()> {
    store.put(key, &encode(ArtifactKind::Classifier, classifier)?)
}

/// Load and decode the classifier stored under `key`.
pub fn load_classifier(store: &dyn ArtifactStore, key: &str) -> Result<TrainedClassifier> {
    decode(ArtifactKind::Classifier, &store.get(key)?)
}
