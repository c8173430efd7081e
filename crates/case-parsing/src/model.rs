//! Typed case blocks for the case transaction v2 dialect.
//!
//! ```xml
//! <case xmlns="http://commcarehq.org/case/transaction/v2" case_id="" user_id="" date_modified="">
//!     <create/>      <!-- at most one -->
//!     <update/>      <!-- at most one -->
//!     <index/>       <!-- at most one: named references to other cases -->
//!     <attachment/>  <!-- at most one: named binary attachments -->
//!     <close/>       <!-- at most one -->
//! </case>
//! ```

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{encode_timestamp, EncodedPayload};
use crate::error::ValidationError;
use crate::schema::{Choice, Fields, TEXT_KEY};

/// Namespace every v2 case block must declare.
pub const CASEXML_XMLNS: &str = "http://commcarehq.org/case/transaction/v2";

const XMLNS_CHOICES: &[&str] = &[CASEXML_XMLNS];

const CASE_BLOCK: &str = "CaseBlock";
const CREATE_BLOCK: &str = "CreateBlock";
const UPDATE_BLOCK: &str = "UpdateBlock";
const INDEX_ITEM: &str = "IndexItem";
const ATTACHMENT_ITEM: &str = "AttachmentItem";

/// How an indexed case and the indexing case affect each other's liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// The indexing case depends on the indexed case and forces its presence.
    #[default]
    Child,
    /// The indexing case extends the indexed case and goes away with it.
    Extension,
}

impl Choice for Relationship {
    const CHOICES: &'static [&'static str] = &["child", "extension"];

    fn from_wire(value: &str) -> Option<Self> {
        match value {
            "child" => Some(Relationship::Child),
            "extension" => Some(Relationship::Extension),
            _ => None,
        }
    }

    fn as_wire(self) -> &'static str {
        match self {
            Relationship::Child => "child",
            Relationship::Extension => "extension",
        }
    }
}

/// Where an attachment's content comes from (`@from` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Local,
    Remote,
    Inline,
}

impl Choice for SourceType {
    const CHOICES: &'static [&'static str] = &["local", "remote", "inline"];

    fn from_wire(value: &str) -> Option<Self> {
        match value {
            "local" => Some(SourceType::Local),
            "remote" => Some(SourceType::Remote),
            "inline" => Some(SourceType::Inline),
            _ => None,
        }
    }

    fn as_wire(self) -> &'static str {
        match self {
            SourceType::Local => "local",
            SourceType::Remote => "remote",
            SourceType::Inline => "inline",
        }
    }
}

/// `<create>`: first-time case materialization data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAction {
    pub case_type: String,
    pub owner_id: Option<String>,
    pub case_name: String,
}

impl CreateAction {
    fn from_fields(mut fields: Fields) -> Result<Self, ValidationError> {
        let action = Self {
            case_type: fields.required_str("case_type")?,
            owner_id: fields.optional_str("owner_id")?,
            case_name: fields.required_str("case_name")?,
        };
        fields.finish()?;
        Ok(action)
    }

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("case_type".to_string(), Value::from(self.case_type.as_str()));
        if let Some(owner_id) = &self.owner_id {
            map.insert("owner_id".to_string(), Value::from(owner_id.as_str()));
        }
        map.insert("case_name".to_string(), Value::from(self.case_name.as_str()));
        Value::Object(map)
    }
}

/// `<update>`: the four reserved properties plus free-form case properties.
///
/// Free-form values are kept exactly as submitted, even when they look like
/// dates or numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateAction {
    pub case_type: Option<String>,
    pub case_name: Option<String>,
    pub date_opened: Option<NaiveDateTime>,
    pub owner_id: Option<String>,
    pub properties: IndexMap<String, String>,
}

impl UpdateAction {
    /// Keys routed to the named fields instead of `properties`.
    pub const RESERVED: [&'static str; 4] = ["case_type", "case_name", "date_opened", "owner_id"];

    fn from_fields(mut fields: Fields) -> Result<Self, ValidationError> {
        let mut action = Self {
            case_type: fields.optional_str("case_type")?,
            case_name: fields.optional_str("case_name")?,
            date_opened: fields.optional_timestamp("date_opened")?,
            owner_id: fields.optional_str("owner_id")?,
            properties: IndexMap::new(),
        };
        let block = fields.block();
        for (key, value) in fields.into_remaining() {
            match value {
                Value::String(value) => {
                    action.properties.insert(key, value);
                }
                Value::Null => {}
                _ => {
                    return Err(ValidationError::WrongType {
                        field: key,
                        block,
                        expected: "a string",
                    })
                }
            }
        }
        Ok(action)
    }

    /// Looks up a free-form property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.case_type.is_none()
            && self.case_name.is_none()
            && self.date_opened.is_none()
            && self.owner_id.is_none()
            && self.properties.is_empty()
    }

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(case_type) = &self.case_type {
            map.insert("case_type".to_string(), Value::from(case_type.as_str()));
        }
        if let Some(case_name) = &self.case_name {
            map.insert("case_name".to_string(), Value::from(case_name.as_str()));
        }
        if let Some(date_opened) = &self.date_opened {
            map.insert("date_opened".to_string(), Value::from(encode_timestamp(date_opened)));
        }
        if let Some(owner_id) = &self.owner_id {
            map.insert("owner_id".to_string(), Value::from(owner_id.as_str()));
        }
        for (key, value) in &self.properties {
            map.insert(key.clone(), Value::from(value.as_str()));
        }
        Value::Object(map)
    }
}

/// One named child of `<index>`: a reference to another case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub case_type: String,
    pub relationship: Relationship,
    /// Identifier of the referenced case (element text on the wire).
    pub case_id: String,
}

impl IndexEntry {
    fn from_fields(mut fields: Fields) -> Result<Self, ValidationError> {
        let entry = Self {
            case_type: fields.required_str("@case_type")?,
            relationship: fields
                .optional_choice("@relationship")?
                .unwrap_or_default(),
            case_id: fields.required_str(TEXT_KEY)?,
        };
        fields.finish()?;
        Ok(entry)
    }

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("@case_type".to_string(), Value::from(self.case_type.as_str()));
        map.insert(
            "@relationship".to_string(),
            Value::from(self.relationship.as_wire()),
        );
        map.insert(TEXT_KEY.to_string(), Value::from(self.case_id.as_str()));
        Value::Object(map)
    }
}

/// One named child of `<attachment>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEntry {
    pub src: Option<String>,
    pub src_type: SourceType,
    pub name: Option<String>,
    data: Option<EncodedPayload>,
}

impl AttachmentEntry {
    pub fn new(src_type: SourceType) -> Self {
        Self {
            src: None,
            src_type,
            name: None,
            data: None,
        }
    }

    /// Decoded inline payload.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_ref().map(|payload| payload.bytes.as_slice())
    }

    pub fn set_data(&mut self, data: Option<Vec<u8>>) {
        self.data = data.map(EncodedPayload::encode);
    }

    fn from_fields(mut fields: Fields) -> Result<Self, ValidationError> {
        let entry = Self {
            src: fields.optional_str("@src")?,
            src_type: fields.required_choice("@from")?,
            name: fields.optional_str("@name")?,
            data: fields.optional_base64(TEXT_KEY)?,
        };
        fields.finish()?;
        Ok(entry)
    }

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(src) = &self.src {
            map.insert("@src".to_string(), Value::from(src.as_str()));
        }
        map.insert("@from".to_string(), Value::from(self.src_type.as_wire()));
        if let Some(name) = &self.name {
            map.insert("@name".to_string(), Value::from(name.as_str()));
        }
        if let Some(payload) = &self.data {
            map.insert(TEXT_KEY.to_string(), Value::from(payload.wire.as_str()));
        }
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CloseMarker;

/// A validated `<case>` block: one transaction against one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub xmlns: String,
    pub case_id: String,
    pub user_id: Option<String>,
    /// Normalized to UTC.
    pub date_modified: NaiveDateTime,
    pub create: Option<CreateAction>,
    pub update: UpdateAction,
    pub index: IndexMap<String, IndexEntry>,
    pub attachment: IndexMap<String, AttachmentEntry>,
    close: Option<CloseMarker>,
}

impl Transaction {
    /// An empty v2 transaction for `case_id`.
    pub fn new(case_id: impl Into<String>, date_modified: NaiveDateTime) -> Self {
        Self {
            xmlns: CASEXML_XMLNS.to_string(),
            case_id: case_id.into(),
            user_id: None,
            date_modified,
            create: None,
            update: UpdateAction::default(),
            index: IndexMap::new(),
            attachment: IndexMap::new(),
            close: None,
        }
    }

    /// Validates a generic case mapping (attribute keys prefixed with `@`).
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        let mut fields = Fields::open(value, CASE_BLOCK)?;

        let xmlns = fields.required_str("@xmlns")?;
        if xmlns != CASEXML_XMLNS {
            return Err(ValidationError::InvalidChoice {
                field: "@xmlns".to_string(),
                block: CASE_BLOCK,
                value: xmlns,
                allowed: XMLNS_CHOICES,
            });
        }
        let case_id = fields.required_str("@case_id")?;
        let user_id = fields.optional_str("@user_id")?;
        let date_modified = fields.required_timestamp("@date_modified")?;

        let create = fields
            .optional_block("create", CREATE_BLOCK)?
            .map(CreateAction::from_fields)
            .transpose()?;
        let update = fields
            .optional_block("update", UPDATE_BLOCK)?
            .map(UpdateAction::from_fields)
            .transpose()?
            .unwrap_or_default();
        let index = fields
            .entries("index", INDEX_ITEM)?
            .into_iter()
            .map(|(name, entry)| IndexEntry::from_fields(entry).map(|entry| (name, entry)))
            .collect::<Result<IndexMap<_, _>, _>>()?;
        let attachment = fields
            .entries("attachment", ATTACHMENT_ITEM)?
            .into_iter()
            .map(|(name, entry)| AttachmentEntry::from_fields(entry).map(|entry| (name, entry)))
            .collect::<Result<IndexMap<_, _>, _>>()?;
        let close = fields.marker("close")?.then_some(CloseMarker);

        fields.finish()?;

        Ok(Self {
            xmlns,
            case_id,
            user_id,
            date_modified,
            create,
            update,
            index,
            attachment,
            close,
        })
    }

    /// Renders the block back into its generic mapping.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("@xmlns".to_string(), Value::from(self.xmlns.as_str()));
        map.insert("@case_id".to_string(), Value::from(self.case_id.as_str()));
        if let Some(user_id) = &self.user_id {
            map.insert("@user_id".to_string(), Value::from(user_id.as_str()));
        }
        map.insert(
            "@date_modified".to_string(),
            Value::from(encode_timestamp(&self.date_modified)),
        );
        if let Some(create) = &self.create {
            map.insert("create".to_string(), create.to_json());
        }
        if !self.update.is_empty() {
            map.insert("update".to_string(), self.update.to_json());
        }
        if !self.index.is_empty() {
            let entries = self
                .index
                .iter()
                .map(|(name, entry)| (name.clone(), entry.to_json()))
                .collect();
            map.insert("index".to_string(), Value::Object(entries));
        }
        if !self.attachment.is_empty() {
            let entries = self
                .attachment
                .iter()
                .map(|(name, entry)| (name.clone(), entry.to_json()))
                .collect();
            map.insert("attachment".to_string(), Value::Object(entries));
        }
        if self.close() {
            map.insert("close".to_string(), Value::from(""));
        }
        Value::Object(map)
    }

    /// Whether the block carries a `<close/>` marker.
    pub fn close(&self) -> bool {
        self.close.is_some()
    }

    pub fn set_close(&mut self, close: bool) {
        self.close = close.then_some(CloseMarker);
    }
}

impl TryFrom<Value> for Transaction {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Transaction::from_json(value)
    }
}
