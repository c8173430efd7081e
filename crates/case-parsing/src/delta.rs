//! Cumulative case deltas.
//!
//! A [`Delta`] is the net effect of one or more transactions on one case. It
//! is produced by [`project`](crate::projection::project) and combined with
//! [`Delta::merge`].

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{Relationship, SourceType};

/// Properties settable both at creation and through an update.
pub const SPECIAL_PROPERTIES: [&str; 4] = ["case_type", "case_name", "date_opened", "owner_id"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeltaIndexEntry {
    pub case_type: String,
    #[serde(default)]
    pub relationship: Relationship,
    pub case_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeltaAttachmentEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    pub src_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Decoded inline payload, base64 text in the serialized form.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::codec::base64_option"
    )]
    pub data: Option<Vec<u8>>,
}

/// Net change to a single case.
///
/// Special properties hold the last known value. `update`, `index` and
/// `attachment` are last-write-wins per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delta {
    pub case_id: String,
    /// Time of the most recent transaction, UTC.
    pub date_modified: NaiveDateTime,
    /// The sequence includes the case's creation.
    pub create: bool,
    /// The sequence ends with the case closed.
    pub close: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_opened: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default)]
    pub update: IndexMap<String, String>,
    #[serde(default)]
    pub index: IndexMap<String, DeltaIndexEntry>,
    // TODO: resolve from="local" attachments against the submission context
    // once the caller can hand one in.
    #[serde(default)]
    pub attachment: IndexMap<String, DeltaAttachmentEntry>,
}

impl Delta {
    /// A delta that changes nothing but the modification time.
    pub fn new(case_id: impl Into<String>, date_modified: NaiveDateTime) -> Self {
        Self {
            case_id: case_id.into(),
            date_modified,
            create: false,
            close: false,
            case_type: None,
            case_name: None,
            date_opened: None,
            owner_id: None,
            update: IndexMap::new(),
            index: IndexMap::new(),
            attachment: IndexMap::new(),
        }
    }
}
