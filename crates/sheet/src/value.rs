use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;

/// RGBA color with float channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[must_use]
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub const CLEAR: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
}

impl Default for Color {
    fn default() -> Self {
        Color::CLEAR
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGBA({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// One key of an animation curve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

/// Animation curve made of keyframes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    pub keys: Vec<Keyframe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientMode {
    #[default]
    Blend,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientColorKey {
    pub color: Color,
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientAlphaKey {
    pub alpha: f32,
    pub time: f32,
}

/// Color gradient with separate color and alpha keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Gradient {
    pub color_keys: Vec<GradientColorKey>,
    pub alpha_keys: Vec<GradientAlphaKey>,
    #[serde(default)]
    pub mode: GradientMode,
}

/// Handle to an externally owned asset or object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub guid: String,
    pub name: String,
}

impl AssetRef {
    pub fn new(guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
        }
    }
}

/// A named enum variant together with its discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub variant: String,
    pub discriminant: i64,
}

impl EnumValue {
    pub fn new(variant: impl Into<String>, discriminant: i64) -> Self {
        Self {
            variant: variant.into(),
            discriminant,
        }
    }
}

/// An instance of a registered object type: its type name and field values
/// in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectValue {
    pub type_name: String,
    pub fields: IndexMap<String, Value>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field insert.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }
}

/// A node of an object graph.
///
/// Nested objects, lists and dictionaries are owned by value, so copying a
/// `Value` never aliases another one.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    String(String),
    Enum(EnumValue),
    Color(Color),
    Curve(Curve),
    Gradient(Gradient),
    LayerMask(u32),
    Reference(AssetRef),
    List(Vec<Value>),
    /// Insertion-ordered entries with unique keys.
    Dictionary(Vec<(Value, Value)>),
    Object(ObjectValue),
}

impl Value {
    /// Check if the value is null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Color(_) => "color",
            Value::Curve(_) => "curve",
            Value::Gradient(_) => "gradient",
            Value::LayerMask(_) => "layer mask",
            Value::Reference(_) => "reference",
            Value::List(_) => "list",
            Value::Dictionary(_) => "dictionary",
            Value::Object(_) => "object",
        }
    }

    /// Try to get the value as a boolean
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::UInt(u) => Some(*u != 0),
            _ => None,
        }
    }

    /// Try to get the value as an integer
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Float(f) => Some(*f as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Enum(e) => Some(e.discriminant),
            Value::LayerMask(m) => Some(i64::from(*m)),
            _ => None,
        }
    }

    /// Try to get the value as a float
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Enum(e) => Some(&e.variant),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectValue> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dictionary(&self) -> Option<&Vec<(Value, Value)>> {
        match self {
            Value::Dictionary(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut Vec<(Value, Value)>> {
        match self {
            Value::Dictionary(entries) => Some(entries),
            _ => None,
        }
    }

    /// Number of elements for collections, `None` otherwise.
    #[must_use]
    pub fn item_count(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Dictionary(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Schema-free JSON rendering of the value.
    ///
    /// Dictionaries become JSON objects keyed by the key's display text.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(f.to_string())),
            Value::Char(c) => Json::String(c.to_string()),
            Value::String(s) => Json::String(s.clone()),
            Value::Enum(e) => Json::String(e.variant.clone()),
            Value::Color(c) => Json::String(c.to_string()),
            Value::Curve(c) => serde_json::to_value(c).unwrap_or(Json::Null),
            Value::Gradient(g) => serde_json::to_value(g).unwrap_or(Json::Null),
            Value::LayerMask(m) => Json::from(*m),
            Value::Reference(r) => serde_json::to_value(r).unwrap_or(Json::Null),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Dictionary(entries) => {
                let map: Map<String, Json> = entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect();
                Json::Object(map)
            }
            Value::Object(obj) => {
                let map: Map<String, Json> = obj
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                Json::Object(map)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(fl) => write!(f, "{fl}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Enum(e) => write!(f, "{}", e.variant),
            Value::Color(c) => write!(f, "{c}"),
            Value::LayerMask(m) => write!(f, "{m}"),
            Value::Reference(r) => write!(f, "{}", r.name),
            _ => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Value::Enum(e)
    }
}

impl From<ObjectValue> for Value {
    fn from(obj: ObjectValue) -> Self {
        Value::Object(obj)
    }
}

impl From<AssetRef> for Value {
    fn from(r: AssetRef) -> Self {
        Value::Reference(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::Int(42).as_float(), Some(42.0));
        assert_eq!(Value::Float(3.5).as_int(), Some(3));
        assert_eq!(Value::Bool(true).as_int(), Some(1));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn test_item_count() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list.item_count(), Some(2));
        assert_eq!(Value::Int(1).item_count(), None);
    }

    #[test]
    fn test_object_json() {
        let obj = ObjectValue::new("Point")
            .with_field("x", 1)
            .with_field("y", 2.5);
        let json = Value::Object(obj).to_json();
        assert_eq!(json.to_string(), r#"{"x":1,"y":2.5}"#);
    }

    #[test]
    fn test_color_display() {
        let c = Color::rgba(1.0, 0.5, 0.0, 1.0);
        assert_eq!(c.to_string(), "RGBA(1, 0.5, 0, 1)");
    }
}
