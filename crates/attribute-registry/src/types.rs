use core::fmt;
use serde::{Deserialize, Serialize};

/// Attribute-definition format understood by this crate.
pub const SCHEMA_VERSION: u32 = 2;

/// Ids at or above this value are reserved system attributes shared by every profile.
pub const SYSTEM_ATTRIBUTE_BASE: u16 = 65000;

/// Wire type of an attribute value. The discriminant is the `ATTRIBUTE_TYPE_*` tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[repr(u8)]
pub enum AttributeType {
    #[serde(rename = "BOOLEAN")]
    Boolean = 1,
    #[serde(rename = "SINT8")]
    Sint8 = 2,
    #[serde(rename = "SINT16")]
    Sint16 = 3,
    #[serde(rename = "SINT32")]
    Sint32 = 4,
    #[serde(rename = "SINT64")]
    Sint64 = 5,
    /// Signed fixed point, 16 integer and 16 fractional bits.
    #[serde(rename = "Q_15_16")]
    Q15_16 = 6,
    #[serde(rename = "UTF8S")]
    Utf8String = 20,
    #[serde(rename = "BYTES")]
    Bytes = 21,
}

impl AttributeType {
    pub const ALL: [AttributeType; 8] = [
        AttributeType::Boolean,
        AttributeType::Sint8,
        AttributeType::Sint16,
        AttributeType::Sint32,
        AttributeType::Sint64,
        AttributeType::Q15_16,
        AttributeType::Utf8String,
        AttributeType::Bytes,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Name used in generated headers (`ATTRIBUTE_TYPE_<NAME>`) and in YAML tables.
    pub fn header_name(self) -> &'static str {
        match self {
            AttributeType::Boolean => "BOOLEAN",
            AttributeType::Sint8 => "SINT8",
            AttributeType::Sint16 => "SINT16",
            AttributeType::Sint32 => "SINT32",
            AttributeType::Sint64 => "SINT64",
            AttributeType::Q15_16 => "Q_15_16",
            AttributeType::Utf8String => "UTF8S",
            AttributeType::Bytes => "BYTES",
        }
    }

    pub fn from_header_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.header_name() == name)
    }

    /// Encoded width for numeric types; `None` for text and byte strings.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            AttributeType::Boolean | AttributeType::Sint8 => Some(1),
            AttributeType::Sint16 => Some(2),
            AttributeType::Sint32 | AttributeType::Q15_16 => Some(4),
            AttributeType::Sint64 => Some(8),
            AttributeType::Utf8String | AttributeType::Bytes => None,
        }
    }

    pub fn is_variable(self) -> bool {
        self.fixed_width().is_none()
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            AttributeType::Sint8
                | AttributeType::Sint16
                | AttributeType::Sint32
                | AttributeType::Sint64
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

/// Hardware module a profile targets (`AF_BOARD_*`), as enumerated at schema version 2.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[repr(u8)]
pub enum BoardVariant {
    #[serde(rename = "MODULO_1")]
    Modulo1 = 0,
    #[serde(rename = "MODULO_2")]
    Modulo2 = 1,
    #[serde(rename = "QUANTA")]
    Quanta = 2,
    #[serde(rename = "ABELO_2A")]
    Abelo2A = 3,
    #[serde(rename = "POTENCO")]
    Potenco = 4,
    #[serde(rename = "ABELO_2B")]
    Abelo2B = 5,
    #[serde(rename = "MODULO_1B")]
    Modulo1B = 6,
}

impl BoardVariant {
    pub const ALL: [BoardVariant; 7] = [
        BoardVariant::Modulo1,
        BoardVariant::Modulo2,
        BoardVariant::Quanta,
        BoardVariant::Abelo2A,
        BoardVariant::Potenco,
        BoardVariant::Abelo2B,
        BoardVariant::Modulo1B,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.id() == id)
    }

    pub fn header_name(self) -> &'static str {
        match self {
            BoardVariant::Modulo1 => "MODULO_1",
            BoardVariant::Modulo2 => "MODULO_2",
            BoardVariant::Quanta => "QUANTA",
            BoardVariant::Abelo2A => "ABELO_2A",
            BoardVariant::Potenco => "POTENCO",
            BoardVariant::Abelo2B => "ABELO_2B",
            BoardVariant::Modulo1B => "MODULO_1B",
        }
    }

    pub fn from_header_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.header_name() == name)
    }
}

impl fmt::Display for BoardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct AttributeDescriptor {
    pub id: u16,
    #[serde(default)]
    pub name: String,
    /// Encoded length in bytes; the maximum for text and byte strings.
    pub size: u16,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl AttributeDescriptor {
    pub fn new(id: u16, name: impl Into<String>, size: u16, ty: AttributeType) -> Self {
        Self {
            id,
            name: name.into(),
            size,
            ty,
        }
    }

    pub fn is_system(&self) -> bool {
        self.id >= SYSTEM_ATTRIBUTE_BASE
    }

    pub fn max_len(&self) -> usize {
        usize::from(self.size)
    }
}

/// On-disk form of a single device profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ProfileFile {
    pub name: String,
    pub schema_version: u32,
    pub board: BoardVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
}

/// On-disk form of the shared system attribute table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct SystemTableFile {
    pub schema_version: u32,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
}
