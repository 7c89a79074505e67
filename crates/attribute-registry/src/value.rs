use crate::error::CodecError;
use crate::types::{AttributeDescriptor, AttributeType};
use core::fmt;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Decoded attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// Q15.16 fixed point converted to a float.
    Fixed(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Fixed(_) => "fixed-point",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Parse a textual literal for the descriptor's type.
    ///
    /// Booleans accept `true`/`false`/`1`/`0`, integers and fixed point accept
    /// decimal, text is taken verbatim and bytes are hex (optional `0x`, spaces ignored).
    pub fn parse(desc: &AttributeDescriptor, literal: &str) -> Result<Self, CodecError> {
        let bad = || CodecError::InvalidLiteral {
            id: desc.id,
            ty: desc.ty,
            literal: literal.to_string(),
        };
        let t = literal.trim();
        match desc.ty {
            AttributeType::Boolean => match t.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(bad()),
            },
            AttributeType::Sint8
            | AttributeType::Sint16
            | AttributeType::Sint32
            | AttributeType::Sint64 => t.parse::<i64>().map(Value::Int).map_err(|_| bad()),
            AttributeType::Q15_16 => t.parse::<f64>().map(Value::Fixed).map_err(|_| bad()),
            AttributeType::Utf8String => Ok(Value::Text(literal.to_string())),
            AttributeType::Bytes => parse_hex(t).map(Value::Bytes).ok_or_else(bad),
        }
    }

    /// Interpret an integer value as Unix seconds.
    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Value::Int(secs) => OffsetDateTime::from_unix_timestamp(*secs).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Fixed(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => f.write_str(&to_hex(b)),
        }
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

pub fn parse_hex(s: &str) -> Option<Vec<u8>> {
    let t = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let digits: Vec<u8> = t
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}
