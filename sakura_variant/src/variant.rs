#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A property value on a scene node or in the global variable store.
///
/// Only plain data: a value has to stay meaningful inside a packed scene after
/// the nodes it was captured from are gone, so there is no node handle variant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Array(Vec<Variant>),
    /// Sorted keys keep packed bytes stable between captures.
    Dictionary(BTreeMap<String, Variant>),
}

impl Variant {
    pub fn is_null(&self) -> bool {
        matches!(self, Variant::Null)
    }

    /// Engine-facing type name, used in log lines.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Null => "Nil",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Float(_) => "float",
            Variant::String(_) => "String",
            Variant::Bytes(_) => "PackedByteArray",
            Variant::Vector2(_) => "Vector2",
            Variant::Vector3(_) => "Vector3",
            Variant::Array(_) => "Array",
            Variant::Dictionary(_) => "Dictionary",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Variant::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Variant::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Ints widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Variant::Float(f) => Some(f),
            Variant::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Variant::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Variant]> {
        match self {
            Variant::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, Variant>> {
        match self {
            Variant::Dictionary(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut BTreeMap<String, Variant>> {
        match self {
            Variant::Dictionary(map) => Some(map),
            _ => None,
        }
    }

    /// JSON view for debug dumps. Vectors become arrays, non-finite floats
    /// become `null`.
    pub fn to_json_value(&self) -> JsonValue {
        match self {
            Variant::Null => JsonValue::Null,
            Variant::Bool(b) => JsonValue::Bool(*b),
            Variant::Int(i) => JsonValue::from(*i),
            Variant::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Variant::String(s) => JsonValue::String(s.clone()),
            Variant::Bytes(b) => JsonValue::from(b.clone()),
            Variant::Vector2(v) => JsonValue::from(v.to_vec()),
            Variant::Vector3(v) => JsonValue::from(v.to_vec()),
            Variant::Array(items) => items.iter().map(Variant::to_json_value).collect(),
            Variant::Dictionary(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }

    pub fn from_json_value(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Variant::Null,
            JsonValue::Bool(b) => Variant::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Variant::Int(i),
                None => Variant::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Variant::String(s.clone()),
            JsonValue::Array(items) => {
                Variant::Array(items.iter().map(Variant::from_json_value).collect())
            }
            JsonValue::Object(map) => Variant::Dictionary(
                map.iter()
                    .map(|(k, v)| (k.clone(), Variant::from_json_value(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Null => f.write_str("null"),
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Float(x) => write!(f, "{x}"),
            Variant::String(s) => write!(f, "{s:?}"),
            Variant::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Variant::Vector2([x, y]) => write!(f, "({x}, {y})"),
            Variant::Vector3([x, y, z]) => write!(f, "({x}, {y}, {z})"),
            Variant::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Variant::Dictionary(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! variant_from {
    ($($ty:ty => $arm:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$arm(value $(as $cast)?)
                }
            }
        )*
    };
}

variant_from! {
    bool => Bool,
    i32 => Int as i64,
    i64 => Int,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    String => String,
    Vec<u8> => Bytes,
    [f32; 2] => Vector2,
    [f32; 3] => Vector3,
    Vec<Variant> => Array,
    BTreeMap<String, Variant> => Dictionary,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}
