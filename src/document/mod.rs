//! The saved-document model: the textual wire form a block tree round-trips
//! through, plus a compact binary snapshot of the same tree.

pub mod loader;
pub mod writer;

pub use loader::*;
pub use writer::*;

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::fs;

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk container for a saved document.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    text: String,
}

/// Controls what a write emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Whether connected child blocks are written.
    pub child_blocks: bool,
    /// Whether block ids are written.
    pub block_ids: bool,
}

impl WriteOptions {
    /// Everything, ids included.
    pub const ALL: WriteOptions = WriteOptions {
        child_blocks: true,
        block_ids: true,
    };
    /// Whole trees without ids; what `deep_copy` uses, so the loader mints
    /// fresh identities.
    pub const ALL_WITHOUT_IDS: WriteOptions = WriteOptions {
        child_blocks: true,
        block_ids: false,
    };
    /// A single block without its children.
    pub const ROOT_ONLY: WriteOptions = WriteOptions {
        child_blocks: false,
        block_ids: true,
    };
}

/// Distinguishes real blocks from shadow (default-value) blocks in a saved
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeTag {
    Block,
    Shadow,
}

/// One block node of a saved document.
///
/// Flag attributes are present only when they differ from their defaults;
/// `inline` is present iff the flag was ever explicitly set; `x`/`y` only on
/// the root of the written tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedBlock {
    #[serde(rename = "kind")]
    pub tag: NodeTag,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<SavedInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<SavedNext>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<serde_json::Value>,
}

/// One serialized input: field values plus the child and/or shadow occupying
/// its connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SavedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<SavedBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Box<SavedBlock>>,
}

/// A named field value. Label fields carry no state and are never saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedField {
    pub name: String,
    pub value: String,
}

/// Wrapper for the next-chain successor: the chained block and/or the shadow
/// default for the next slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedNext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<SavedBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<SavedBlock>,
}

impl SavedBlock {
    /// Renders the document as its textual wire form.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string(self).map_err(|e| DocumentError::Encode(e.to_string()))
    }

    /// Parses a document from its textual wire form.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(text).map_err(|e| DocumentError::Decode(e.to_string()))
    }

    /// Encodes a binary snapshot of the document: a versioned container
    /// around the canonical textual form. Framing the text keeps the
    /// conditionally-present attributes intact under the non-self-describing
    /// encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            text: self.to_json()?,
        };
        bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())
            .map_err(|e| DocumentError::Encode(e.to_string()))
    }

    /// Decodes a document from a binary snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let (snapshot, _): (Snapshot, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| DocumentError::Decode(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DocumentError::Decode(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Self::from_json(&snapshot.text)
    }

    /// Saves a binary snapshot to a file.
    pub fn save(&self, path: &str) -> Result<(), DocumentError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|e| DocumentError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Loads a binary snapshot from a file.
    pub fn from_file(path: &str) -> Result<Self, DocumentError> {
        let bytes = fs::read(path).map_err(|e| DocumentError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }
}
