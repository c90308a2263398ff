//! The dynamic value model stored in buckets.
//!
//! [`Value`] is a closed tagged variant able to express arbitrarily nested
//! data: scalars, byte strings, sequences, sets, maps with arbitrary keys, and
//! named variants. It is serialized with serde, so any serde format can carry
//! it; the codec uses bincode.

use serde::{Deserialize, Serialize};

/// JSON key marking a hex-encoded byte string in the JSON bridge.
const JSON_BYTES_KEY: &str = "$bytes";
/// JSON key marking a tagged variant in the JSON bridge.
const JSON_TAG_KEY: &str = "$tag";

/// An arbitrarily nested structured datum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Ordered sequence.
    Seq(Vec<Value>),
    /// Unordered collection. Members are kept in insertion order.
    Set(Vec<Value>),
    /// Key/value pairs. Keys may be any value, including sequences.
    Map(Vec<(Value, Value)>),
    /// A named variant wrapping a payload.
    Tagged(String, Box<Value>),
}

impl Value {
    /// Build a byte-string value.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Build a map from key/value pairs.
    pub fn map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a set from members.
    pub fn set<T: Into<Value>>(members: impl IntoIterator<Item = T>) -> Self {
        Self::Set(members.into_iter().map(Into::into).collect())
    }

    /// Build a tagged variant.
    pub fn tagged(tag: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Tagged(tag.into(), Box::new(value.into()))
    }

    /// Short lowercase name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Seq(_) => "seq",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Tagged(..) => "tagged",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Look up a map entry whose key is the string `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Render as JSON.
    ///
    /// Lossy where JSON has no equivalent: byte strings become
    /// `{"$bytes": "<hex>"}`, tagged variants become
    /// `{"$tag": name, "value": ...}`, sets become arrays, maps with non-string
    /// keys become arrays of `[key, value]` pairs, and non-finite floats
    /// become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::Str(s) => Json::String(s.clone()),
            Self::Bytes(b) => {
                let mut obj = serde_json::Map::new();
                obj.insert(JSON_BYTES_KEY.into(), Json::String(hex::encode(b)));
                Json::Object(obj)
            }
            Self::Seq(items) | Self::Set(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Map(pairs) => {
                if pairs.iter().all(|(k, _)| k.as_str().is_some()) {
                    let obj = pairs
                        .iter()
                        .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.to_json())))
                        .collect();
                    Json::Object(obj)
                } else {
                    Json::Array(
                        pairs
                            .iter()
                            .map(|(k, v)| Json::Array(vec![k.to_json(), v.to_json()]))
                            .collect(),
                    )
                }
            }
            Self::Tagged(tag, inner) => {
                let mut obj = serde_json::Map::new();
                obj.insert(JSON_TAG_KEY.into(), Json::String(tag.clone()));
                obj.insert("value".into(), inner.to_json());
                Json::Object(obj)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::Str(s),
            Json::Array(items) => Self::Seq(items.into_iter().map(Value::from).collect()),
            Json::Object(mut obj) => {
                if obj.len() == 1 {
                    if let Some(Json::String(encoded)) = obj.get(JSON_BYTES_KEY) {
                        if let Ok(bytes) = hex::decode(encoded) {
                            return Self::Bytes(bytes);
                        }
                    }
                }
                if obj.len() == 2 && obj.contains_key("value") {
                    if let Some(Json::String(tag)) = obj.get(JSON_TAG_KEY).cloned() {
                        let inner = obj.remove("value").unwrap_or(Json::Null);
                        return Self::tagged(tag, Value::from(inner));
                    }
                }
                Self::Map(
                    obj.into_iter()
                        .map(|(k, v)| (Self::Str(k), Value::from(v)))
                        .collect(),
                )
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Seq(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        // {'hello': b'world', ('foo', 'bar'): {'baz'}}
        Value::Map(vec![
            (Value::from("hello"), Value::bytes(b"world".to_vec())),
            (
                Value::Seq(vec![Value::from("foo"), Value::from("bar")]),
                Value::set(["baz"]),
            ),
        ])
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(3).kind(), "int");
        assert_eq!(sample().kind(), "map");
        assert_eq!(Value::tagged("Some", 1).kind(), "tagged");
    }

    #[test]
    fn map_lookup_by_string_key() {
        let v = sample();
        assert_eq!(v.get("hello"), Some(&Value::bytes(b"world".to_vec())));
        assert!(v.get("missing").is_none());
        assert!(Value::from(1).get("hello").is_none());
    }

    #[test]
    fn json_scalars() {
        assert_eq!(Value::from(json!(null)), Value::Null);
        assert_eq!(Value::from(json!(true)), Value::Bool(true));
        assert_eq!(Value::from(json!(-7)), Value::Int(-7));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from(json!("x")), Value::from("x"));
    }

    #[test]
    fn json_object_becomes_string_keyed_map() {
        let v = Value::from(json!({"a": [1, 2]}));
        assert_eq!(
            v,
            Value::map([("a", Value::Seq(vec![Value::Int(1), Value::Int(2)]))])
        );
    }

    #[test]
    fn json_bytes_marker_roundtrip() {
        let v = Value::bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = v.to_json();
        assert_eq!(json, json!({"$bytes": "deadbeef"}));
        assert_eq!(Value::from(json), v);
    }

    #[test]
    fn json_bytes_marker_with_bad_hex_stays_map() {
        let v = Value::from(json!({"$bytes": "zz"}));
        assert_eq!(v.kind(), "map");
    }

    #[test]
    fn json_tagged_roundtrip() {
        let v = Value::tagged("Point", Value::Seq(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(Value::from(v.to_json()), v);
    }

    #[test]
    fn non_string_keys_render_as_pairs() {
        let json = sample().to_json();
        assert_eq!(
            json,
            json!([["hello", {"$bytes": "776f726c64"}], [["foo", "bar"], ["baz"]]])
        );
    }

    #[test]
    fn nan_renders_as_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
