//! Strict field reader for case block mappings.
//!
//! A [`Fields`] owns one block's mapping and hands out typed values field by
//! field. Every read removes the key, so whatever is left at the end is either
//! rejected ([`Fields::finish`]) or returned as free-form data
//! ([`Fields::into_remaining`]).

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::codec::{decode_timestamp, EncodedPayload};
use crate::error::ValidationError;

/// Key holding element text in the generic mapping.
pub const TEXT_KEY: &str = case_xml::TEXT_KEY;

/// A closed set of string values a field may take.
pub trait Choice: Sized + Copy + 'static {
    /// Wire spellings, in declaration order.
    const CHOICES: &'static [&'static str];

    fn from_wire(value: &str) -> Option<Self>;

    fn as_wire(self) -> &'static str;
}

#[derive(Debug)]
pub struct Fields {
    block: &'static str,
    map: Map<String, Value>,
}

impl Fields {
    /// Opens `value` as the mapping of `block`.
    ///
    /// Elements rendered as bare text read as `{"#text": text}`, and the empty
    /// string (an empty element) reads as an empty block.
    pub fn open(value: Value, block: &'static str) -> Result<Self, ValidationError> {
        let map = match value {
            Value::Object(map) => map,
            Value::String(text) if text.is_empty() => Map::new(),
            Value::String(text) => {
                let mut map = Map::new();
                map.insert(TEXT_KEY.to_string(), Value::String(text));
                map
            }
            other => {
                return Err(ValidationError::NotAnObject {
                    block,
                    found: kind_of(&other),
                })
            }
        };
        Ok(Self { block, map })
    }

    pub fn block(&self) -> &'static str {
        self.block
    }

    /// Removes `name`, treating `null` as absent.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        match self.map.remove(name) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    pub fn optional_str(&mut self, name: &str) -> Result<Option<String>, ValidationError> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.wrong_type(name, "a string")),
        }
    }

    pub fn required_str(&mut self, name: &str) -> Result<String, ValidationError> {
        self.optional_str(name)?
            .ok_or_else(|| self.missing(name))
    }

    pub fn optional_choice<T: Choice>(&mut self, name: &str) -> Result<Option<T>, ValidationError> {
        let Some(value) = self.optional_str(name)? else {
            return Ok(None);
        };
        T::from_wire(&value)
            .map(Some)
            .ok_or_else(|| ValidationError::InvalidChoice {
                field: name.to_string(),
                block: self.block,
                value,
                allowed: T::CHOICES,
            })
    }

    pub fn required_choice<T: Choice>(&mut self, name: &str) -> Result<T, ValidationError> {
        self.optional_choice(name)?
            .ok_or_else(|| self.missing(name))
    }

    /// Reads a presence marker: absent is `false`, the empty string is `true`.
    pub fn marker(&mut self, name: &str) -> Result<bool, ValidationError> {
        match self.optional_str(name)? {
            None => Ok(false),
            Some(value) if value.is_empty() => Ok(true),
            Some(value) => Err(ValidationError::InvalidChoice {
                field: name.to_string(),
                block: self.block,
                value,
                allowed: &[""],
            }),
        }
    }

    pub fn optional_timestamp(
        &mut self,
        name: &str,
    ) -> Result<Option<NaiveDateTime>, ValidationError> {
        let Some(value) = self.optional_str(name)? else {
            return Ok(None);
        };
        decode_timestamp(&value)
            .map(Some)
            .map_err(|reason| ValidationError::InvalidTimestamp {
                field: name.to_string(),
                value,
                reason,
            })
    }

    pub fn required_timestamp(&mut self, name: &str) -> Result<NaiveDateTime, ValidationError> {
        self.optional_timestamp(name)?
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn optional_base64(
        &mut self,
        name: &str,
    ) -> Result<Option<EncodedPayload>, ValidationError> {
        let Some(value) = self.optional_str(name)? else {
            return Ok(None);
        };
        EncodedPayload::decode(value)
            .map(Some)
            .map_err(|reason| ValidationError::InvalidBase64 {
                field: name.to_string(),
                reason,
            })
    }

    /// Reads an optional nested block.
    pub fn optional_block(
        &mut self,
        name: &str,
        block: &'static str,
    ) -> Result<Option<Fields>, ValidationError> {
        self.take(name).map(|value| Fields::open(value, block)).transpose()
    }

    /// Reads a mapping of named entries, each opened as `block`.
    ///
    /// An absent field and an empty element both give no entries.
    pub fn entries(
        &mut self,
        name: &str,
        block: &'static str,
    ) -> Result<Vec<(String, Fields)>, ValidationError> {
        let Some(value) = self.take(name) else {
            return Ok(Vec::new());
        };
        let map = match value {
            Value::Object(map) => map,
            Value::String(text) if text.is_empty() => return Ok(Vec::new()),
            _ => return Err(self.wrong_type(name, "a mapping")),
        };
        map.into_iter()
            .map(|(key, value)| Fields::open(value, block).map(|fields| (key, fields)))
            .collect()
    }

    /// Closes a strict block: any field not read so far is an error.
    pub fn finish(self) -> Result<(), ValidationError> {
        match self.map.into_iter().next() {
            None => Ok(()),
            Some((field, _)) => Err(ValidationError::UnexpectedField {
                field,
                block: self.block,
            }),
        }
    }

    /// Closes an open block, returning the unread fields.
    pub fn into_remaining(self) -> Map<String, Value> {
        self.map
    }

    fn missing(&self, name: &str) -> ValidationError {
        ValidationError::MissingField {
            field: name.to_string(),
            block: self.block,
        }
    }

    fn wrong_type(&self, name: &str, expected: &'static str) -> ValidationError {
        ValidationError::WrongType {
            field: name.to_string(),
            block: self.block,
            expected,
        }
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
