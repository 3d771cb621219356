//! Binary encoding of a store's content.
//!
//! The header and trailer are fixed little-endian fields; each record is a
//! bincode-encoded [`Record`] (fixed-width integers, little-endian).
//!
//! ```text
//! header   magic "STRX" | version: u16 | reserved: u16 | dimension: u32
//!          | count: u64 | next_id: u64
//! records  count x bincode(Record { id, embedding, metadata })
//! trailer  crc32 of every preceding byte
//! ```
//!
//! A dimension of 0 means the store has not locked one yet and is only
//! valid with a count of 0.

use crate::document::{Document, Metadata, MetadataValue};
use crate::error::{Result, VectorDbError};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const MAGIC: [u8; 4] = *b"STRX";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_SIZE: usize = 28;
const CHECKSUM_SIZE: usize = 4;

/// Decoded store content.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub dimension: Option<usize>,
    pub next_id: u64,
    pub documents: Vec<Document>,
}

/// On-disk form of one document. Metadata pairs are sorted by key so equal
/// maps encode to identical bytes.
#[derive(Debug, Serialize, Deserialize)]
struct Record<'a> {
    id: u64,
    embedding: Cow<'a, [f32]>,
    metadata: Vec<(Cow<'a, str>, StoredValue<'a>)>,
}

/// Externally tagged mirror of [`MetadataValue`]; bincode cannot decode
/// untagged enums.
#[derive(Debug, Serialize, Deserialize)]
enum StoredValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Cow<'a, str>),
}

impl<'a> From<&'a MetadataValue> for StoredValue<'a> {
    fn from(value: &'a MetadataValue) -> Self {
        match value {
            MetadataValue::Null => StoredValue::Null,
            MetadataValue::Bool(b) => StoredValue::Bool(*b),
            MetadataValue::Int(i) => StoredValue::Int(*i),
            MetadataValue::Float(f) => StoredValue::Float(*f),
            MetadataValue::String(s) => StoredValue::String(Cow::Borrowed(s.as_str())),
        }
    }
}

impl From<StoredValue<'_>> for MetadataValue {
    fn from(value: StoredValue<'_>) -> Self {
        match value {
            StoredValue::Null => MetadataValue::Null,
            StoredValue::Bool(b) => MetadataValue::Bool(b),
            StoredValue::Int(i) => MetadataValue::Int(i),
            StoredValue::Float(f) => MetadataValue::Float(f),
            StoredValue::String(s) => MetadataValue::String(s.into_owned()),
        }
    }
}

impl<'a> Record<'a> {
    fn borrowed(doc: &'a Document) -> Self {
        let mut metadata: Vec<_> = doc
            .metadata
            .iter()
            .map(|(k, v)| (Cow::Borrowed(k.as_str()), StoredValue::from(v)))
            .collect();
        metadata.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            id: doc.id,
            embedding: Cow::Borrowed(doc.embedding.as_slice()),
            metadata,
        }
    }

    fn into_document(self) -> Result<Document> {
        let mut metadata = Metadata::with_capacity(self.metadata.len());
        for (key, value) in self.metadata {
            if metadata.insert(key.into_owned(), value.into()).is_some() {
                return Err(VectorDbError::corrupt(format!(
                    "Duplicate metadata key in document {}",
                    self.id
                )));
            }
        }
        Ok(Document::new(self.id, self.embedding.into_owned(), metadata))
    }
}

// Reads are capped at `limit` bytes, so a corrupt length prefix cannot
// trigger a huge allocation.
fn record_options(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(limit)
}

/// Encode store content into the versioned binary layout.
pub fn encode(dimension: Option<usize>, next_id: u64, documents: &[Document]) -> Result<Vec<u8>> {
    let dim = dimension.unwrap_or(0);
    if dim == 0 && !documents.is_empty() {
        return Err(VectorDbError::invalid_argument(
            "Cannot encode documents without a locked dimension",
        ));
    }
    let dim_field = u32::try_from(dim)
        .map_err(|_| VectorDbError::invalid_argument(format!("Dimension exceeds u32: {}", dim)))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + documents.len() * (24 + dim * 4) + CHECKSUM_SIZE);
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&dim_field.to_le_bytes());
    buf.extend_from_slice(&(documents.len() as u64).to_le_bytes());
    buf.extend_from_slice(&next_id.to_le_bytes());

    for doc in documents {
        if doc.embedding.len() != dim {
            return Err(VectorDbError::DimensionMismatch {
                expected: dim,
                actual: doc.embedding.len(),
            });
        }
        record_options(u64::MAX)
            .serialize_into(&mut buf, &Record::borrowed(doc))
            .map_err(|e| VectorDbError::SerializationError(e.to_string()))?;
    }

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// Decode and validate a buffer produced by [`encode`].
///
/// The version is checked before the checksum so files written by a newer
/// format are reported as such rather than as corruption.
pub fn decode(bytes: &[u8]) -> Result<StoreSnapshot> {
    if bytes.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(VectorDbError::corrupt(format!(
            "File too small: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0..4] != MAGIC {
        return Err(VectorDbError::corrupt("Bad magic number"));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(VectorDbError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);
    let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual_crc = crc32fast::hash(body);
    if actual_crc != expected_crc {
        return Err(VectorDbError::corrupt(format!(
            "Checksum mismatch: stored {:08x}, computed {:08x}",
            expected_crc, actual_crc
        )));
    }

    let dim = u32::from_le_bytes([body[8], body[9], body[10], body[11]]) as usize;
    let count = u64::from_le_bytes(header_field(body, 12));
    let next_id = u64::from_le_bytes(header_field(body, 20));

    if dim == 0 && count != 0 {
        return Err(VectorDbError::corrupt(
            "Documents present without a locked dimension",
        ));
    }

    let mut records = &body[HEADER_SIZE..];
    // Each record holds at least an id and two length prefixes
    let min_record = 24 + dim as u64 * 4;
    if count.saturating_mul(min_record) > records.len() as u64 {
        return Err(VectorDbError::corrupt(format!(
            "Document count {} does not fit in {} bytes",
            count,
            records.len()
        )));
    }

    let mut documents = Vec::with_capacity(count as usize);
    let mut last_id: Option<u64> = None;
    for _ in 0..count {
        let record: Record<'static> = record_options(records.len() as u64)
            .deserialize_from(&mut records)
            .map_err(|e| VectorDbError::corrupt(format!("Malformed record: {}", e)))?;

        if last_id.map_or(false, |last| record.id <= last) {
            return Err(VectorDbError::corrupt(format!(
                "Document ids not strictly increasing at id {}",
                record.id
            )));
        }
        if record.id >= next_id {
            return Err(VectorDbError::corrupt(format!(
                "Document id {} is not below next id {}",
                record.id, next_id
            )));
        }
        if record.embedding.len() != dim {
            return Err(VectorDbError::corrupt(format!(
                "Document {} has {} components, header says {}",
                record.id,
                record.embedding.len(),
                dim
            )));
        }
        last_id = Some(record.id);
        documents.push(record.into_document()?);
    }

    if !records.is_empty() {
        return Err(VectorDbError::corrupt(format!(
            "{} trailing bytes after last record",
            records.len()
        )));
    }

    Ok(StoreSnapshot {
        dimension: if dim == 0 { None } else { Some(dim) },
        next_id,
        documents,
    })
}

fn header_field(body: &[u8], offset: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&body[offset..offset + 8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_documents() -> Vec<Document> {
        let mut m0 = Metadata::new();
        m0.insert("category".to_string(), "news".into());
        m0.insert("year".to_string(), 2024.into());
        m0.insert("score".to_string(), 0.75.into());
        m0.insert("draft".to_string(), false.into());
        m0.insert("note".to_string(), MetadataValue::Null);

        vec![
            Document::new(0, vec![1.0, 0.0, -2.5], m0),
            Document::new(3, vec![0.5, 0.25, 8.0], Metadata::new()),
        ]
    }

    #[test]
    fn test_roundtrip() {
        let docs = sample_documents();
        let bytes = encode(Some(3), 4, &docs).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.dimension, Some(3));
        assert_eq!(decoded.next_id, 4);
        assert_eq!(decoded.documents, docs);
    }

    #[test]
    fn test_empty_store_roundtrip() {
        let bytes = encode(None, 0, &[]).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + CHECKSUM_SIZE);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimension, None);
        assert!(decoded.documents.is_empty());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let docs = sample_documents();
        assert_eq!(encode(Some(3), 4, &docs).unwrap(), encode(Some(3), 4, &docs).unwrap());
    }

    #[test]
    fn test_encode_rejects_wrong_dimension() {
        let docs = sample_documents();
        assert!(matches!(
            encode(Some(2), 4, &docs),
            Err(VectorDbError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(Some(3), 4, &sample_documents()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(VectorDbError::CorruptData(_))));
    }

    #[test]
    fn test_unknown_version() {
        let mut bytes = encode(Some(3), 4, &sample_documents()).unwrap();
        bytes[4..6].copy_from_slice(&2u16.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(VectorDbError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn test_flipped_byte_fails_checksum() {
        let mut bytes = encode(Some(3), 4, &sample_documents()).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x40;
        assert!(matches!(decode(&bytes), Err(VectorDbError::CorruptData(_))));
    }

    #[test]
    fn test_truncation_detected() {
        let bytes = encode(Some(3), 4, &sample_documents()).unwrap();
        for len in [0, 10, HEADER_SIZE, bytes.len() - 1] {
            assert!(decode(&bytes[..len]).is_err(), "length {} accepted", len);
        }
    }

    #[test]
    fn test_rejects_ids_at_or_above_next_id() {
        let bytes = encode(Some(3), 3, &sample_documents()).unwrap();
        assert!(matches!(decode(&bytes), Err(VectorDbError::CorruptData(_))));
    }

    #[test]
    fn test_rejects_unordered_ids() {
        let mut docs = sample_documents();
        docs.swap(0, 1);
        let bytes = encode(Some(3), 4, &docs).unwrap();
        assert!(matches!(decode(&bytes), Err(VectorDbError::CorruptData(_))));
    }

    #[test]
    fn test_record_layout_is_fixed_width() {
        let doc = Document::new(5, vec![1.0, 2.0], Metadata::new());
        let bytes = encode(Some(2), 6, &[doc]).unwrap();
        // id + embedding length prefix + 2 x f32 + metadata length prefix
        assert_eq!(bytes.len(), HEADER_SIZE + 8 + 8 + 8 + 8 + CHECKSUM_SIZE);
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 8], &5u64.to_le_bytes());
    }

    #[test]
    fn test_duplicate_metadata_key_rejected() {
        let record = Record {
            id: 0,
            embedding: Cow::Owned(vec![1.0]),
            metadata: vec![
                (Cow::Borrowed("k"), StoredValue::Int(1)),
                (Cow::Borrowed("k"), StoredValue::Int(2)),
            ],
        };
        assert!(matches!(record.into_document(), Err(VectorDbError::CorruptData(_))));
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        let doc = Document::new(0, vec![1.0], Metadata::new());
        let mut bytes = encode(Some(1), 1, &[doc]).unwrap();
        // Claim a huge embedding length, then fix up the checksum
        let at = HEADER_SIZE + 8;
        bytes[at..at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        let body_len = bytes.len() - CHECKSUM_SIZE;
        let crc = crc32fast::hash(&bytes[..body_len]);
        bytes[body_len..].copy_from_slice(&crc.to_le_bytes());

        assert!(matches!(decode(&bytes), Err(VectorDbError::CorruptData(_))));
    }
}
