//! Type-safe newtypes for arcgis-mcp.
//!
//! These newtypes provide compile-time safety and semantic clarity
//! for core domain concepts.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portal item identifier.
///
/// ArcGIS item ids are 32 hexadecimal characters. The newtype is only
/// constructible through [`FromStr`], so holding one means the id was
/// validated and normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Length of an ArcGIS item id.
    pub const LEN: usize = 32;

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ItemId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() == Self::LEN && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(ValidationError::ItemId {
                value: s.to_string(),
            })
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field type as reported in layer metadata (`esriFieldType*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "esriFieldTypeSmallInteger")]
    SmallInteger,
    #[serde(rename = "esriFieldTypeInteger")]
    Integer,
    #[serde(rename = "esriFieldTypeBigInteger")]
    BigInteger,
    #[serde(rename = "esriFieldTypeSingle")]
    Single,
    #[serde(rename = "esriFieldTypeDouble")]
    Double,
    #[serde(rename = "esriFieldTypeOID")]
    Oid,
    #[serde(rename = "esriFieldTypeString")]
    String,
    #[serde(rename = "esriFieldTypeGUID")]
    Guid,
    #[serde(rename = "esriFieldTypeGlobalID")]
    GlobalId,
    #[serde(rename = "esriFieldTypeDate")]
    Date,
    #[serde(rename = "esriFieldTypeDateOnly")]
    DateOnly,
    #[serde(rename = "esriFieldTypeTimeOnly")]
    TimeOnly,
    #[serde(rename = "esriFieldTypeTimestampOffset")]
    TimestampOffset,
    #[serde(rename = "esriFieldTypeGeometry")]
    Geometry,
    #[serde(rename = "esriFieldTypeBlob")]
    Blob,
    #[serde(rename = "esriFieldTypeRaster")]
    Raster,
    #[serde(rename = "esriFieldTypeXML")]
    Xml,
    #[serde(other)]
    Unknown,
}

/// Coarse classification deciding how a field is summarized and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Date,
    Text,
}

impl FieldType {
    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::SmallInteger
            | Self::Integer
            | Self::BigInteger
            | Self::Single
            | Self::Double
            | Self::Oid => FieldKind::Numeric,
            Self::Date | Self::DateOnly | Self::TimestampOffset => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }

    /// Short display name without the `esriFieldType` prefix.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::SmallInteger => "SmallInteger",
            Self::Integer => "Integer",
            Self::BigInteger => "BigInteger",
            Self::Single => "Single",
            Self::Double => "Double",
            Self::Oid => "OID",
            Self::String => "String",
            Self::Guid => "GUID",
            Self::GlobalId => "GlobalID",
            Self::Date => "Date",
            Self::DateOnly => "DateOnly",
            Self::TimeOnly => "TimeOnly",
            Self::TimestampOffset => "TimestampOffset",
            Self::Geometry => "Geometry",
            Self::Blob => "Blob",
            Self::Raster => "Raster",
            Self::Xml => "XML",
            Self::Unknown => "Unknown",
        }
    }
}

impl Default for FieldType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
