//! Scalar field codecs: ISO-8601 timestamps and base64 payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};

use crate::error::TimestampError;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Decodes an ISO-8601 date-time with a mandatory UTC offset.
///
/// The instant is normalized to UTC and returned without an offset, so
/// `2014-01-15T13:12:33.139-05` decodes to `2014-01-15 18:12:33.139`.
/// Accepted offsets are `Z`, `±hh`, `±hhmm` and `±hh:mm`.
pub fn decode_timestamp(value: &str) -> Result<NaiveDateTime, TimestampError> {
    let (local, offset) = split_offset(value)?;
    let naive = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())
        .ok_or(TimestampError::InvalidDateTime)?;
    let instant = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or(TimestampError::InvalidDateTime)?;
    Ok(instant.naive_utc())
}

/// Encodes a naive UTC instant as `YYYY-MM-DDThh:mm:ss[.fraction]Z`.
pub fn encode_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.fZ").to_string()
}

fn split_offset(value: &str) -> Result<(&str, FixedOffset), TimestampError> {
    let time_start = value
        .find(|c: char| c == 'T' || c == ' ')
        .ok_or(TimestampError::InvalidDateTime)?;
    if let Some(local) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        let utc = FixedOffset::east_opt(0).ok_or(TimestampError::InvalidOffset)?;
        return Ok((local, utc));
    }
    let sign_at = value[time_start..]
        .rfind(|c: char| c == '+' || c == '-')
        .map(|i| time_start + i)
        .ok_or(TimestampError::MissingOffset)?;
    let (local, offset) = value.split_at(sign_at);
    Ok((local, parse_offset(offset)?))
}

fn parse_offset(offset: &str) -> Result<FixedOffset, TimestampError> {
    if !offset.is_ascii() {
        return Err(TimestampError::InvalidOffset);
    }
    let (sign, digits) = match offset.as_bytes().first() {
        Some(b'+') => (1, &offset[1..]),
        Some(b'-') => (-1, &offset[1..]),
        _ => return Err(TimestampError::InvalidOffset),
    };
    let (hh, mm) = match digits.len() {
        2 => (digits, "00"),
        4 => digits.split_at(2),
        5 if digits.as_bytes()[2] == b':' => (&digits[..2], &digits[3..]),
        _ => return Err(TimestampError::InvalidOffset),
    };
    let hours = two_digits(hh)?;
    let minutes = two_digits(mm)?;
    if hours > 23 || minutes > 59 {
        return Err(TimestampError::InvalidOffset);
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or(TimestampError::InvalidOffset)
}

fn two_digits(s: &str) -> Result<i32, TimestampError> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::InvalidOffset);
    }
    s.parse().map_err(|_| TimestampError::InvalidOffset)
}

/// Encodes binary data as padded standard base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes padded standard base64. ASCII whitespace (line wrapping) is ignored.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// An inline payload together with the wire text it was decoded from.
///
/// Only the attachment model keeps the wire text, so re-serialising a parsed
/// block reproduces the submitted payload byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EncodedPayload {
    pub(crate) wire: String,
    pub(crate) bytes: Vec<u8>,
}

impl EncodedPayload {
    pub(crate) fn decode(wire: String) -> Result<Self, base64::DecodeError> {
        let bytes = decode_base64(&wire)?;
        Ok(Self { wire, bytes })
    }

    pub(crate) fn encode(bytes: Vec<u8>) -> Self {
        Self {
            wire: encode_base64(&bytes),
            bytes,
        }
    }
}

/// Serde adapter storing optional binary data as base64 text.
pub(crate) mod base64_option {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&super::encode_base64(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let text: Option<String> = Option::deserialize(d)?;
        text.map(|t| super::decode_base64(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}
