//! On-disk envelope for writes that carry metadata.
//!
//! When a caller supplies non-empty metadata the payload is wrapped as
//! `{timestamp, metadata, content}` and pretty-printed. Without metadata the
//! raw content is stored verbatim.
//!
//! # Example
//!
//! ```
//! use dual_mount_sync::{encode_payload, Metadata, WriteEnvelope};
//! use serde_json::json;
//!
//! // No metadata: stored as-is
//! assert_eq!(encode_payload("hello", None).unwrap(), b"hello");
//!
//! // Metadata: wrapped
//! let mut metadata = Metadata::new();
//! metadata.insert("k".into(), json!(1));
//! let bytes = encode_payload("hello", Some(&metadata)).unwrap();
//! let envelope = WriteEnvelope::parse(&bytes).unwrap();
//! assert_eq!(envelope.content, "hello");
//! assert_eq!(envelope.metadata, metadata);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied metadata attached to a write.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteEnvelope {
    /// Server-assigned at write time
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
    pub content: String,
}

impl WriteEnvelope {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            timestamp: Utc::now(),
            metadata,
            content: content.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Produce the exact bytes that go to disk for one write.
pub fn encode_payload(content: &str, metadata: Option<&Metadata>) -> Result<Vec<u8>, serde_json::Error> {
    match metadata {
        Some(metadata) if !metadata.is_empty() => {
            WriteEnvelope::new(content, metadata.clone()).to_bytes()
        }
        _ => Ok(content.as_bytes().to_vec()),
    }
}
