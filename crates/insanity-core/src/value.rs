//! Typed scalar values carried by arguments and extra info.
//!
//! A [`Value`] crosses three boundaries: it is the default of a declared
//! argument, the payload of a supplied argument (wire or command line), and
//! the payload of an extra-info report. On the wire it is encoded as
//! `{"type": "<tag>", "value": <payload>}`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[serde(rename = "string")]
    String(String),
    #[serde(rename = "int")]
    Int32(i32),
    #[serde(rename = "uint")]
    UInt32(u32),
    #[serde(rename = "int64")]
    Int64(i64),
    #[serde(rename = "uint64")]
    UInt64(u64),
    #[serde(rename = "double")]
    Double(f64),
    #[serde(rename = "boolean")]
    Bool(bool),
}

/// The kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int")]
    Int32,
    #[serde(rename = "uint")]
    UInt32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "uint64")]
    UInt64,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "boolean")]
    Bool,
}

impl ValueKind {
    /// The type tag used on the wire and in the metadata document.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int32 => "int",
            Self::UInt32 => "uint",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Double => "double",
            Self::Bool => "boolean",
        }
    }

    /// Convert a command-line string into a value of this kind.
    ///
    /// Integers are parsed in base 10 and must fit the kind's range. Booleans
    /// accept `1`/`true` and `0`/`false`, case-insensitively. Returns `None`
    /// when the text does not convert.
    pub fn parse(self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(raw.to_string())),
            Self::Int32 => raw.trim().parse().ok().map(Value::Int32),
            Self::UInt32 => raw.trim().parse().ok().map(Value::UInt32),
            Self::Int64 => raw.trim().parse().ok().map(Value::Int64),
            Self::UInt64 => raw.trim().parse().ok().map(Value::UInt64),
            Self::Double => raw.trim().parse().ok().map(Value::Double),
            Self::Bool => {
                let lowered = raw.trim().to_ascii_lowercase();
                match lowered.as_str() {
                    "1" | "true" => Some(Value::Bool(true)),
                    "0" | "false" => Some(Value::Bool(false)),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Int32(_) => ValueKind::Int32,
            Self::UInt32(_) => ValueKind::UInt32,
            Self::Int64(_) => ValueKind::Int64,
            Self::UInt64(_) => ValueKind::UInt64,
            Self::Double(_) => ValueKind::Double,
            Self::Bool(_) => ValueKind::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::UInt32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
