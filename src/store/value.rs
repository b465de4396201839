//! Typed values held by the store and their text encoding.
//!
//! Every persisted row carries a type tag next to its value text. The tag
//! names are fixed by the on-disk format (`String`, `Boolean`, `Integer`,
//! `Long`, `Float`, `Double`) and decoding dispatches on [`ValueKind`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A value of one of the supported kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// UTF-8 text (also carries serialized objects)
    String(String),
    /// Boolean flag
    Bool(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
}

/// The closed set of value kinds, used as the persisted type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Bool,
    Int,
    Long,
    Float,
    Double,
}

impl ValueKind {
    /// All kinds, in tag order.
    pub const ALL: [Self; 6] = [
        Self::String,
        Self::Bool,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// Persisted tag name.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Bool => "Boolean",
            Self::Int => "Integer",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }

    /// Resolves a persisted tag name. Matching is exact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTypeTag`] for any other string.
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| Error::unknown_tag(tag))
    }

    /// Parses value text as this kind.
    ///
    /// Booleans follow the lenient rule of the stored format: `true` in any
    /// case is true, everything else is false.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the text is not a valid number of this kind.
    pub fn parse(self, text: &str) -> Result<Value> {
        let tag = self.tag();
        let value = match self {
            Self::String => Value::String(text.to_string()),
            Self::Bool => Value::Bool(text.eq_ignore_ascii_case("true")),
            Self::Int => Value::Int(text.parse().map_err(|e| Error::decode(tag, text, e))?),
            Self::Long => Value::Long(text.parse().map_err(|e| Error::decode(tag, text, e))?),
            Self::Float => Value::Float(text.parse().map_err(|e| Error::decode(tag, text, e))?),
            Self::Double => Value::Double(text.parse().map_err(|e| Error::decode(tag, text, e))?),
        };
        Ok(value)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lenient parsing for user input (CLI flags, config files).
///
/// Accepts the persisted tags and their lowercase short forms
/// (`str`, `bool`, `int`, `long`, `float`, `double`).
impl FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Bool),
            "integer" | "int" | "i32" => Ok(Self::Int),
            "long" | "i64" => Ok(Self::Long),
            "float" | "f32" => Ok(Self::Float),
            "double" | "f64" => Ok(Self::Double),
            _ => Err(Error::unknown_tag(s)),
        }
    }
}

impl Value {
    /// Returns the kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
        }
    }

    /// Encodes the value as text for persistence.
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Long(l) => l.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Double(d) => d.to_string(),
        }
    }

    /// Decodes a persisted `(type tag, text)` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is unknown or the text does not parse.
    pub fn decode(tag: &str, text: &str) -> Result<Self> {
        ValueKind::from_tag(tag)?.parse(text)
    }

    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Extraction of a concrete Rust type from a cached [`Value`].
///
/// Extraction is strict: a value stored as `Int` is not returned when a
/// `Long` is requested.
pub trait FromValue: Sized {
    /// Returns `Some` when the value is of the matching kind.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_value_conversions! {
    String => String,
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
