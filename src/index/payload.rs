//! Payload schema for Qdrant points

use super::IndexedVector;
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::loader::DocumentFormat;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Payload stored with each point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Source file identifier
    pub source: String,

    /// Source format tag
    pub format: DocumentFormat,

    /// Page / sheet / row index
    pub page: i64,

    /// Chunk sequence within the source
    pub sequence: i64,

    /// Hash of the chunk content
    pub chunk_hash: String,

    /// Chunk text, kept for lookup
    pub text: String,
}

impl From<&Chunk> for ChunkPayload {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: chunk.source.clone(),
            format: chunk.format,
            page: chunk.page as i64,
            sequence: chunk.sequence as i64,
            chunk_hash: chunk.hash.clone(),
            text: chunk.text.clone(),
        }
    }
}

impl ChunkPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(&self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();
        map.insert("source".to_string(), string_to_qdrant(&self.source));
        map.insert("format".to_string(), string_to_qdrant(self.format.as_str()));
        map.insert("page".to_string(), int_to_qdrant(self.page));
        map.insert("sequence".to_string(), int_to_qdrant(self.sequence));
        map.insert("chunk_hash".to_string(), string_to_qdrant(&self.chunk_hash));
        map.insert("text".to_string(), string_to_qdrant(&self.text));
        map
    }

    /// Decode a payload returned by Qdrant
    pub fn from_qdrant_payload(payload: HashMap<String, QdrantValue>) -> Result<Self> {
        let map: Map<String, Value> = payload
            .into_iter()
            .map(|(k, v)| (k, json_from_qdrant_value(v)))
            .collect();
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Qdrant(format!("Malformed point payload: {}", e)))
    }

    pub fn into_chunk(self) -> Chunk {
        Chunk {
            text: self.text,
            source: self.source,
            format: self.format,
            page: self.page.max(0) as usize,
            sequence: self.sequence.max(0) as usize,
            hash: self.chunk_hash,
        }
    }
}

impl IndexedVector {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(&self) -> PointStruct {
        let payload = ChunkPayload::from(&self.chunk).to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector.clone(), payload)
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::IntegerValue(i)),
    }
}

/// Convert Qdrant value to serde_json Value
pub fn json_from_qdrant_value(v: QdrantValue) -> Value {
    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(json_from_qdrant_value).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            text: "Theobromine is toxic to dogs.".to_string(),
            source: "documents/toxins.pdf".to_string(),
            format: DocumentFormat::Pdf,
            page: 2,
            sequence: 7,
            hash: "abc123".to_string(),
        }
    }

    #[test]
    fn test_payload_through_qdrant_values() {
        let chunk = sample_chunk();
        let payload = ChunkPayload::from(&chunk).to_qdrant_payload();

        assert_eq!(payload.len(), 6);
        assert!(matches!(
            payload.get("page").and_then(|v| v.kind.clone()),
            Some(Kind::IntegerValue(2))
        ));

        let decoded = ChunkPayload::from_qdrant_payload(payload).unwrap();
        assert_eq!(decoded.into_chunk(), chunk);
    }

    #[test]
    fn test_format_tag_matches_serde() {
        for format in DocumentFormat::ALL {
            let serde_tag = serde_json::to_value(format).unwrap();
            assert_eq!(serde_tag, Value::String(format.as_str().to_string()));
        }
    }

    #[test]
    fn test_malformed_payload_is_error() {
        let mut payload = HashMap::new();
        payload.insert("source".to_string(), string_to_qdrant("x.txt"));
        assert!(ChunkPayload::from_qdrant_payload(payload).is_err());
    }

    #[test]
    fn test_point_struct_carries_uuid() {
        let vector = IndexedVector::new(sample_chunk(), vec![0.1, 0.2]);
        let point = vector.to_point_struct();
        assert!(point.id.is_some());
        assert_eq!(point.payload.len(), 6);
    }
}
