//! Declared types and the registry that describes object and enum shapes.
//!
//! The registry stands in for runtime reflection: it knows the ordered fields
//! of every object type, the variants of every enum, and how to build default
//! values or convert JSON into [`Value`]s for a declared [`TypeDesc`].

use crate::error::{Result, TableError};
use crate::value::{AssetRef, Color, Curve, EnumValue, Gradient, ObjectValue, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;

/// Objects nested deeper than this are left null when building defaults.
const MAX_DEFAULT_DEPTH: usize = 8;

/// Integer widths of the numeric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            IntKind::I8 => "i8",
            IntKind::I16 => "i16",
            IntKind::I32 => "i32",
            IntKind::I64 => "i64",
            IntKind::U8 => "u8",
            IntKind::U16 => "u16",
            IntKind::U32 => "u32",
            IntKind::U64 => "u64",
        }
    }

    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64)
    }

    /// Inclusive bounds for every kind except `U64`, which does not fit `i64`.
    #[must_use]
    pub fn bounds(self) -> (i64, i64) {
        match self {
            IntKind::I8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
            IntKind::I16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            IntKind::I32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
            IntKind::I64 | IntKind::U64 => (i64::MIN, i64::MAX),
            IntKind::U8 => (0, i64::from(u8::MAX)),
            IntKind::U16 => (0, i64::from(u16::MAX)),
            IntKind::U32 => (0, i64::from(u32::MAX)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    F32,
    F64,
}

/// The declared static type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeDesc {
    Bool,
    Int(IntKind),
    Float(FloatKind),
    Char,
    String,
    Enum(String),
    Color,
    Curve,
    Gradient,
    LayerMask,
    /// Handle to an external asset of the named kind.
    Reference(String),
    List(Box<TypeDesc>),
    Dictionary(Box<TypeDesc>, Box<TypeDesc>),
    Object(String),
    /// A type no cell kind supports.
    Other(String),
}

impl TypeDesc {
    pub fn list(element: TypeDesc) -> Self {
        TypeDesc::List(Box::new(element))
    }

    pub fn dictionary(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Dictionary(Box::new(key), Box::new(value))
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeDesc::Object(name.into())
    }

    /// Whether values of this type map to a single scalar cell.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        !matches!(
            self,
            TypeDesc::List(_) | TypeDesc::Dictionary(..) | TypeDesc::Object(_)
        )
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, TypeDesc::List(_) | TypeDesc::Dictionary(..))
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeDesc::Int(_) | TypeDesc::Float(_))
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Bool => write!(f, "bool"),
            TypeDesc::Int(kind) => write!(f, "{}", kind.name()),
            TypeDesc::Float(FloatKind::F32) => write!(f, "f32"),
            TypeDesc::Float(FloatKind::F64) => write!(f, "f64"),
            TypeDesc::Char => write!(f, "char"),
            TypeDesc::String => write!(f, "string"),
            TypeDesc::Enum(name) | TypeDesc::Object(name) | TypeDesc::Other(name) => {
                write!(f, "{name}")
            }
            TypeDesc::Color => write!(f, "color"),
            TypeDesc::Curve => write!(f, "curve"),
            TypeDesc::Gradient => write!(f, "gradient"),
            TypeDesc::LayerMask => write!(f, "layer_mask"),
            TypeDesc::Reference(kind) => write!(f, "ref<{kind}>"),
            TypeDesc::List(elem) => write!(f, "list<{elem}>"),
            TypeDesc::Dictionary(key, value) => write!(f, "dict<{key}, {value}>"),
        }
    }
}

impl FromStr for TypeDesc {
    type Err = TableError;

    /// Parse a type expression such as `i32`, `list<Item>` or
    /// `dict<string, list<f32>>`. Unknown names parse as object types; the
    /// registry rewrites names that turn out to be enums.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(inner) = generic_args(s, "list").or_else(|| generic_args(s, "array")) {
            return Ok(TypeDesc::list(inner.parse()?));
        }
        if let Some(inner) = generic_args(s, "dict") {
            let (key, value) = split_top_level_comma(inner)
                .ok_or_else(|| TableError::Parse(format!("Invalid dictionary type: {s}")))?;
            return Ok(TypeDesc::dictionary(key.parse()?, value.parse()?));
        }
        if let Some(inner) = generic_args(s, "ref") {
            return Ok(TypeDesc::Reference(inner.trim().to_string()));
        }

        let desc = match s {
            "bool" => TypeDesc::Bool,
            "i8" => TypeDesc::Int(IntKind::I8),
            "i16" => TypeDesc::Int(IntKind::I16),
            "i32" | "int" => TypeDesc::Int(IntKind::I32),
            "i64" | "long" => TypeDesc::Int(IntKind::I64),
            "u8" | "byte" => TypeDesc::Int(IntKind::U8),
            "u16" => TypeDesc::Int(IntKind::U16),
            "u32" => TypeDesc::Int(IntKind::U32),
            "u64" => TypeDesc::Int(IntKind::U64),
            "f32" | "float" => TypeDesc::Float(FloatKind::F32),
            "f64" | "double" => TypeDesc::Float(FloatKind::F64),
            "char" => TypeDesc::Char,
            "string" => TypeDesc::String,
            "color" => TypeDesc::Color,
            "curve" => TypeDesc::Curve,
            "gradient" => TypeDesc::Gradient,
            "layer_mask" => TypeDesc::LayerMask,
            "" => return Err(TableError::Parse("Empty type name".to_string())),
            name if name.contains(['<', '>', ',']) => {
                return Err(TableError::Parse(format!("Invalid type expression: {name}")))
            }
            name => TypeDesc::Object(name.to_string()),
        };
        Ok(desc)
    }
}

impl TryFrom<String> for TypeDesc {
    type Error = TableError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TypeDesc> for String {
    fn from(desc: TypeDesc) -> Self {
        desc.to_string()
    }
}

fn generic_args<'a>(s: &'a str, head: &str) -> Option<&'a str> {
    s.strip_prefix(head)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

fn split_top_level_comma(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => return Some((&s[..i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

/// A declared field of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Shape of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    /// Plain value aggregate (struct) rather than an identity-bearing class.
    #[serde(default)]
    pub value_type: bool,
    #[serde(default)]
    pub fields: Vec<FieldDesc>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            value_type: false,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub fn value_type(mut self) -> Self {
        self.value_type = true;
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: TypeDesc) -> Self {
        self.fields.push(FieldDesc::new(name, ty));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum VariantDef {
    Name(String),
    Full { name: String, value: i64 },
}

/// Shape of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EnumTypeDef", into = "EnumTypeDef")]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<(String, i64)>,
    pub flags: bool,
}

#[derive(Serialize, Deserialize)]
struct EnumTypeDef {
    name: String,
    variants: Vec<VariantDef>,
    #[serde(default)]
    flags: bool,
}

impl From<EnumTypeDef> for EnumType {
    fn from(def: EnumTypeDef) -> Self {
        let mut next = 0i64;
        let variants = def
            .variants
            .into_iter()
            .map(|v| match v {
                VariantDef::Name(name) => {
                    let value = next;
                    next += 1;
                    (name, value)
                }
                VariantDef::Full { name, value } => {
                    next = value + 1;
                    (name, value)
                }
            })
            .collect();
        EnumType {
            name: def.name,
            variants,
            flags: def.flags,
        }
    }
}

impl From<EnumType> for EnumTypeDef {
    fn from(ty: EnumType) -> Self {
        EnumTypeDef {
            name: ty.name,
            variants: ty
                .variants
                .into_iter()
                .map(|(name, value)| VariantDef::Full { name, value })
                .collect(),
            flags: ty.flags,
        }
    }
}

impl EnumType {
    /// Enum with sequential discriminants starting at zero.
    pub fn new<S: Into<String>>(name: impl Into<String>, variants: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            variants: variants
                .into_iter()
                .enumerate()
                .map(|(i, v)| (v.into(), i as i64))
                .collect(),
            flags: false,
        }
    }

    /// Resolve a variant by name (case-insensitive) or by discriminant text.
    pub fn parse(&self, text: &str) -> Result<EnumValue> {
        let text = text.trim();
        if let Some((name, value)) = self
            .variants
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(text))
        {
            return Ok(EnumValue::new(name.clone(), *value));
        }
        if let Ok(number) = text.parse::<i64>() {
            return self.from_discriminant(number);
        }
        Err(TableError::Parse(format!(
            "'{text}' is not a variant of {}",
            self.name
        )))
    }

    pub fn from_discriminant(&self, value: i64) -> Result<EnumValue> {
        if let Some((name, v)) = self.variants.iter().find(|(_, v)| *v == value) {
            return Ok(EnumValue::new(name.clone(), *v));
        }
        if self.flags {
            return Ok(EnumValue::new(value.to_string(), value));
        }
        Err(TableError::Parse(format!(
            "{value} is not a discriminant of {}",
            self.name
        )))
    }

    /// First declared variant, or discriminant zero for an empty enum.
    #[must_use]
    pub fn default_value(&self) -> EnumValue {
        self.variants
            .first()
            .map(|(name, value)| EnumValue::new(name.clone(), *value))
            .unwrap_or_else(|| EnumValue::new("0", 0))
    }
}

/// Serialized form of a registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub enums: Vec<EnumType>,
    #[serde(default)]
    pub types: Vec<ObjectType>,
}

/// Registry of object and enum types, passed explicitly to the components
/// that need type knowledge.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    objects: IndexMap<String, ObjectType>,
    enums: IndexMap<String, EnumType>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a schema, resolving names that refer to enums.
    pub fn from_schema(schema: Schema) -> Result<Self> {
        let mut registry = TypeRegistry::new();
        for ty in schema.enums {
            registry.register_enum(ty);
        }
        for ty in schema.types {
            registry.register_object(ty);
        }
        registry.resolve_names();
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry from schema JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(content)?;
        Self::from_schema(schema)
    }

    pub fn register_object(&mut self, ty: ObjectType) {
        self.objects.insert(ty.name.clone(), ty);
    }

    pub fn register_enum(&mut self, ty: EnumType) {
        self.enums.insert(ty.name.clone(), ty);
    }

    #[must_use]
    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    #[must_use]
    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    #[must_use]
    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Rewrite `Object(name)` references that name a registered enum.
    fn resolve_names(&mut self) {
        let enums: Vec<String> = self.enums.keys().cloned().collect();
        for ty in self.objects.values_mut() {
            for field in &mut ty.fields {
                resolve_desc(&mut field.ty, &enums);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        for ty in self.objects.values() {
            if let Some(base) = &ty.base {
                if !self.objects.contains_key(base) {
                    return Err(TableError::UnknownType(format!(
                        "{base} (base of {})",
                        ty.name
                    )));
                }
            }
            self.fields_of(&ty.name)?;
        }
        Ok(())
    }

    /// Resolve a possibly-unresolved type expression against this registry.
    #[must_use]
    pub fn resolve(&self, mut desc: TypeDesc) -> TypeDesc {
        let enums: Vec<String> = self.enums.keys().cloned().collect();
        resolve_desc(&mut desc, &enums);
        desc
    }

    /// All fields of an object type, base-type fields first.
    pub fn fields_of(&self, type_name: &str) -> Result<Vec<FieldDesc>> {
        let mut chain = Vec::new();
        let mut current = Some(type_name.to_string());
        while let Some(name) = current {
            if chain.contains(&name) {
                return Err(TableError::UnknownType(format!(
                    "{type_name} has a cyclic base chain"
                )));
            }
            let ty = self
                .objects
                .get(&name)
                .ok_or_else(|| TableError::UnknownType(name.clone()))?;
            current = ty.base.clone();
            chain.push(name);
        }

        let mut fields: Vec<FieldDesc> = Vec::new();
        for name in chain.iter().rev() {
            for field in &self.objects[name].fields {
                if !fields.iter().any(|f| f.name == field.name) {
                    fields.push(field.clone());
                }
            }
        }
        Ok(fields)
    }

    /// Declared type of one field of an object type.
    #[must_use]
    pub fn field_type(&self, type_name: &str, field: &str) -> Option<TypeDesc> {
        self.fields_of(type_name)
            .ok()?
            .into_iter()
            .find(|f| f.name == field)
            .map(|f| f.ty)
    }

    /// Whether `derived` is `base` or inherits from it.
    #[must_use]
    pub fn is_assignable(&self, derived: &str, base: &str) -> bool {
        let mut current = Some(derived);
        let mut steps = 0;
        while let Some(name) = current {
            if name == base {
                return true;
            }
            steps += 1;
            if steps > self.objects.len() {
                return false;
            }
            current = self.objects.get(name).and_then(|t| t.base.as_deref());
        }
        false
    }

    /// Closest common base of a set of object types, if any.
    #[must_use]
    pub fn common_base<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Option<String> {
        let names: Vec<&str> = names.into_iter().collect();
        let first = *names.first()?;
        let mut candidate = Some(first.to_string());
        while let Some(base) = candidate {
            if names.iter().all(|n| self.is_assignable(n, &base)) {
                return Some(base);
            }
            candidate = self.objects.get(&base).and_then(|t| t.base.clone());
        }
        None
    }

    /// Default value for a declared type.
    #[must_use]
    pub fn default_value(&self, desc: &TypeDesc) -> Value {
        self.default_value_at(desc, 0)
    }

    fn default_value_at(&self, desc: &TypeDesc, depth: usize) -> Value {
        match desc {
            TypeDesc::Bool => Value::Bool(false),
            TypeDesc::Int(IntKind::U64) => Value::UInt(0),
            TypeDesc::Int(_) => Value::Int(0),
            TypeDesc::Float(_) => Value::Float(0.0),
            TypeDesc::Char => Value::Char('\0'),
            TypeDesc::String => Value::String(String::new()),
            TypeDesc::Enum(name) => self
                .enum_type(name)
                .map(|e| Value::Enum(e.default_value()))
                .unwrap_or(Value::Null),
            TypeDesc::Color => Value::Color(Color::default()),
            TypeDesc::Curve => Value::Curve(Curve::default()),
            TypeDesc::Gradient => Value::Gradient(Gradient::default()),
            TypeDesc::LayerMask => Value::LayerMask(0),
            TypeDesc::Reference(_) | TypeDesc::Other(_) => Value::Null,
            TypeDesc::List(_) => Value::List(Vec::new()),
            TypeDesc::Dictionary(..) => Value::Dictionary(Vec::new()),
            TypeDesc::Object(name) => {
                if depth >= MAX_DEFAULT_DEPTH {
                    return Value::Null;
                }
                let Ok(fields) = self.fields_of(name) else {
                    return Value::Null;
                };
                let mut obj = ObjectValue::new(name.clone());
                for field in fields {
                    obj.fields
                        .insert(field.name, self.default_value_at(&field.ty, depth + 1));
                }
                Value::Object(obj)
            }
        }
    }

    /// Number of leaf values a type occupies in flattened text.
    #[must_use]
    pub fn flattened_width(&self, desc: &TypeDesc) -> usize {
        self.flattened_width_at(desc, 0)
    }

    fn flattened_width_at(&self, desc: &TypeDesc, depth: usize) -> usize {
        match desc {
            TypeDesc::Object(name) if depth < MAX_DEFAULT_DEPTH => self
                .fields_of(name)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|f| self.flattened_width_at(&f.ty, depth + 1))
                        .sum::<usize>()
                        .max(1)
                })
                .unwrap_or(1),
            _ => 1,
        }
    }

    /// Conform a value to a declared type before it is written.
    ///
    /// `Null` becomes the type's default for value kinds and stays `Null` for
    /// references and objects. Numeric kinds convert between each other and
    /// text is parsed; anything else is a type mismatch.
    pub fn coerce(&self, value: Value, desc: &TypeDesc) -> Result<Value> {
        let mismatch = |value: &Value| TableError::TypeMismatch {
            expected: desc.to_string(),
            actual: value.kind_name().to_string(),
        };

        match (value, desc) {
            (Value::Null, TypeDesc::Reference(_) | TypeDesc::Object(_) | TypeDesc::Other(_)) => {
                Ok(Value::Null)
            }
            (Value::Null, _) => Ok(self.default_value(desc)),
            (Value::String(s), desc) if !matches!(desc, TypeDesc::String) => {
                crate::scalar::parse_scalar(&s, desc, self)
            }
            (v @ Value::Bool(_), TypeDesc::Bool)
            | (v @ Value::Char(_), TypeDesc::Char)
            | (v @ Value::String(_), TypeDesc::String)
            | (v @ Value::Color(_), TypeDesc::Color)
            | (v @ Value::Curve(_), TypeDesc::Curve)
            | (v @ Value::Gradient(_), TypeDesc::Gradient)
            | (v @ Value::LayerMask(_), TypeDesc::LayerMask)
            | (v @ Value::Reference(_), TypeDesc::Reference(_)) => Ok(v),
            (Value::Int(i), TypeDesc::LayerMask) => u32::try_from(i)
                .map(Value::LayerMask)
                .map_err(|_| mismatch(&Value::Int(i))),
            (Value::UInt(u), TypeDesc::Int(IntKind::U64)) => Ok(Value::UInt(u)),
            (Value::Int(i), TypeDesc::Int(IntKind::U64)) => u64::try_from(i)
                .map(Value::UInt)
                .map_err(|_| mismatch(&Value::Int(i))),
            (v @ (Value::Int(_) | Value::UInt(_) | Value::Bool(_)), TypeDesc::Int(kind)) => {
                let n = v.as_int().ok_or_else(|| mismatch(&v))?;
                let (min, max) = kind.bounds();
                if n < min || n > max {
                    return Err(TableError::invalid_value(format!(
                        "{n} is out of range for {}",
                        kind.name()
                    )));
                }
                Ok(Value::Int(n))
            }
            (v @ (Value::Int(_) | Value::UInt(_) | Value::Float(_)), TypeDesc::Float(kind)) => {
                let f = v.as_float().ok_or_else(|| mismatch(&v))?;
                Ok(Value::Float(match kind {
                    FloatKind::F32 => f64::from(f as f32),
                    FloatKind::F64 => f,
                }))
            }
            (Value::Enum(e), TypeDesc::Enum(name)) => {
                let ty = self
                    .enum_type(name)
                    .ok_or_else(|| TableError::UnknownType(name.clone()))?;
                ty.from_discriminant(e.discriminant).map(Value::Enum)
            }
            (Value::Int(i), TypeDesc::Enum(name)) => {
                let ty = self
                    .enum_type(name)
                    .ok_or_else(|| TableError::UnknownType(name.clone()))?;
                ty.from_discriminant(i).map(Value::Enum)
            }
            (Value::List(items), TypeDesc::List(elem)) => items
                .into_iter()
                .map(|item| self.coerce(item, elem))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (Value::Dictionary(entries), TypeDesc::Dictionary(key_ty, value_ty)) => {
                let mut out: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    let key = self.coerce(k, key_ty)?;
                    if out.iter().any(|(existing, _)| *existing == key) {
                        return Err(TableError::invalid_value(format!(
                            "Duplicate dictionary key '{key}'"
                        )));
                    }
                    out.push((key, self.coerce(v, value_ty)?));
                }
                Ok(Value::Dictionary(out))
            }
            (Value::Object(obj), TypeDesc::Object(name)) => {
                if self.is_assignable(&obj.type_name, name) {
                    Ok(Value::Object(obj))
                } else {
                    Err(TableError::TypeMismatch {
                        expected: name.clone(),
                        actual: obj.type_name,
                    })
                }
            }
            (v, _) => Err(mismatch(&v)),
        }
    }

    /// Render a value as JSON through its declared type. `f32` values keep
    /// their short form instead of the widened `f64` digits.
    #[must_use]
    pub fn value_to_json(&self, value: &Value, desc: &TypeDesc) -> Json {
        match (value, desc) {
            (Value::Float(f), TypeDesc::Float(FloatKind::F32)) => {
                let short = (*f as f32).to_string().parse::<f64>().unwrap_or(*f);
                serde_json::Number::from_f64(short).map_or_else(|| value.to_json(), Json::Number)
            }
            (Value::List(items), TypeDesc::List(elem)) => Json::Array(
                items
                    .iter()
                    .map(|item| self.value_to_json(item, elem))
                    .collect(),
            ),
            (Value::Dictionary(entries), TypeDesc::Dictionary(_, value_ty)) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), self.value_to_json(v, value_ty)))
                    .collect(),
            ),
            (Value::Object(obj), _) => {
                let fields = self.fields_of(&obj.type_name).unwrap_or_default();
                Json::Object(
                    obj.fields
                        .iter()
                        .map(|(name, v)| {
                            let json = match fields.iter().find(|f| f.name == *name) {
                                Some(field) => self.value_to_json(v, &field.ty),
                                None => v.to_json(),
                            };
                            (name.clone(), json)
                        })
                        .collect(),
                )
            }
            _ => value.to_json(),
        }
    }

    /// Convert JSON into a value of the declared type.
    pub fn value_from_json(&self, json: &Json, desc: &TypeDesc) -> Result<Value> {
        if json.is_null() {
            return Ok(match desc {
                TypeDesc::Reference(_) | TypeDesc::Object(_) | TypeDesc::Other(_) => Value::Null,
                _ => self.default_value(desc),
            });
        }

        let mismatch = || TableError::TypeMismatch {
            expected: desc.to_string(),
            actual: json.to_string(),
        };

        match desc {
            TypeDesc::List(elem) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| self.value_from_json(item, elem))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            TypeDesc::Dictionary(key_ty, value_ty) => {
                let mut entries: Vec<(Value, Value)> = Vec::new();
                let mut push = |key: Value, value: Value| -> Result<()> {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(TableError::invalid_value(format!(
                            "Duplicate dictionary key '{key}'"
                        )));
                    }
                    entries.push((key, value));
                    Ok(())
                };
                match json {
                    Json::Object(map) => {
                        for (k, v) in map {
                            let key = crate::scalar::parse_scalar(k, key_ty, self)?;
                            push(key, self.value_from_json(v, value_ty)?)?;
                        }
                    }
                    Json::Array(items) => {
                        for item in items {
                            let (k, v) = match item {
                                Json::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
                                Json::Object(map) => (
                                    map.get("Key").unwrap_or(&Json::Null),
                                    map.get("Value").unwrap_or(&Json::Null),
                                ),
                                _ => return Err(mismatch()),
                            };
                            push(self.value_from_json(k, key_ty)?, self.value_from_json(v, value_ty)?)?;
                        }
                    }
                    _ => return Err(mismatch()),
                }
                Ok(Value::Dictionary(entries))
            }
            TypeDesc::Object(name) => {
                let map = json.as_object().ok_or_else(mismatch)?;
                let type_name = map
                    .get("$type")
                    .and_then(Json::as_str)
                    .filter(|t| self.is_assignable(t, name))
                    .unwrap_or(name.as_str());
                let mut obj = ObjectValue::new(type_name);
                for field in self.fields_of(type_name)? {
                    let value = match map.get(&field.name) {
                        Some(v) => self.value_from_json(v, &field.ty)?,
                        None => self.default_value(&field.ty),
                    };
                    obj.fields.insert(field.name, value);
                }
                Ok(Value::Object(obj))
            }
            TypeDesc::Curve => Ok(Value::Curve(serde_json::from_value(json.clone())?)),
            TypeDesc::Gradient => Ok(Value::Gradient(serde_json::from_value(json.clone())?)),
            TypeDesc::Reference(_) => match json {
                Json::String(s) => crate::scalar::parse_scalar(s, desc, self),
                _ => Ok(Value::Reference(serde_json::from_value::<AssetRef>(
                    json.clone(),
                )?)),
            },
            _ => {
                let text = match json {
                    Json::String(s) => s.clone(),
                    other => other.to_string(),
                };
                crate::scalar::parse_scalar(&text, desc, self)
            }
        }
    }
}

fn resolve_desc(desc: &mut TypeDesc, enums: &[String]) {
    match desc {
        TypeDesc::Object(name) if enums.contains(name) => {
            *desc = TypeDesc::Enum(name.clone());
        }
        TypeDesc::List(elem) => resolve_desc(elem, enums),
        TypeDesc::Dictionary(key, value) => {
            resolve_desc(key, enums);
            resolve_desc(value, enums);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::from_json_str(
            r#"{
                "enums": [{"name": "Rarity", "variants": ["Common", {"name": "Rare", "value": 5}, "Epic"]}],
                "types": [
                    {"name": "Base", "fields": [{"name": "id", "type": "i32"}]},
                    {"name": "Item", "base": "Base", "fields": [
                        {"name": "rarity", "type": "Rarity"},
                        {"name": "tags", "type": "list<string>"},
                        {"name": "pos", "type": "Vec2"}
                    ]},
                    {"name": "Vec2", "value_type": true, "fields": [
                        {"name": "x", "type": "f32"}, {"name": "y", "type": "f32"}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_type_expressions() {
        assert_eq!("i32".parse::<TypeDesc>().unwrap(), TypeDesc::Int(IntKind::I32));
        assert_eq!(
            "dict<string, list<f32>>".parse::<TypeDesc>().unwrap(),
            TypeDesc::dictionary(
                TypeDesc::String,
                TypeDesc::list(TypeDesc::Float(FloatKind::F32))
            )
        );
        assert_eq!(
            "ref<Texture>".parse::<TypeDesc>().unwrap(),
            TypeDesc::Reference("Texture".to_string())
        );
        assert!("dict<string>".parse::<TypeDesc>().is_err());
        let desc = TypeDesc::dictionary(TypeDesc::Char, TypeDesc::object("Item"));
        assert_eq!(desc.to_string().parse::<TypeDesc>().unwrap(), desc);
    }

    #[test]
    fn test_fields_include_base_first() {
        let reg = registry();
        let names: Vec<String> = reg
            .fields_of("Item")
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["id", "rarity", "tags", "pos"]);
        assert_eq!(
            reg.field_type("Item", "rarity"),
            Some(TypeDesc::Enum("Rarity".to_string()))
        );
    }

    #[test]
    fn test_enum_discriminants() {
        let reg = registry();
        let rarity = reg.enum_type("Rarity").unwrap();
        assert_eq!(rarity.parse("rare").unwrap(), EnumValue::new("Rare", 5));
        assert_eq!(rarity.parse("6").unwrap(), EnumValue::new("Epic", 6));
        assert!(rarity.parse("Legendary").is_err());
    }

    #[test]
    fn test_default_value_and_width() {
        let reg = registry();
        let value = reg.default_value(&TypeDesc::object("Item"));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("id"), Some(&Value::Int(0)));
        assert_eq!(obj.get("tags"), Some(&Value::List(Vec::new())));
        assert!(obj.get("pos").unwrap().as_object().is_some());
        assert_eq!(reg.flattened_width(&TypeDesc::object("Item")), 5);
    }

    #[test]
    fn test_assignable_and_common_base() {
        let reg = registry();
        assert!(reg.is_assignable("Item", "Base"));
        assert!(!reg.is_assignable("Base", "Item"));
        assert_eq!(reg.common_base(["Item", "Base"]), Some("Base".to_string()));
        assert_eq!(reg.common_base(["Item", "Vec2"]), None);
    }

    #[test]
    fn test_value_from_json() {
        let reg = registry();
        let json: Json = serde_json::from_str(
            r#"{"id": 3, "rarity": "Epic", "tags": ["a", "b"], "pos": {"x": 1.5}}"#,
        )
        .unwrap();
        let value = reg.value_from_json(&json, &TypeDesc::object("Item")).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("id"), Some(&Value::Int(3)));
        assert_eq!(obj.get("rarity"), Some(&Value::Enum(EnumValue::new("Epic", 6))));
        let pos = obj.get("pos").unwrap().as_object().unwrap();
        assert_eq!(pos.get("x"), Some(&Value::Float(1.5)));
        assert_eq!(pos.get("y"), Some(&Value::Float(0.0)));
    }

    #[test]
    fn test_value_to_json_keeps_f32_short() {
        let reg = registry();
        let json: Json =
            serde_json::from_str(r#"{"id": 1, "rarity": "Common", "tags": [], "pos": {"x": 0.1, "y": 2.5}}"#)
                .unwrap();
        let value = reg.value_from_json(&json, &TypeDesc::object("Item")).unwrap();

        let out = reg.value_to_json(&value, &TypeDesc::object("Item"));
        assert_eq!(out["pos"]["x"], serde_json::json!(0.1));
        assert_eq!(out["pos"]["y"], serde_json::json!(2.5));
        assert_eq!(out["id"], serde_json::json!(1));

        let list = Value::List(vec![Value::Float(f64::from(0.1_f32))]);
        let out = reg.value_to_json(&list, &TypeDesc::list(TypeDesc::Float(FloatKind::F32)));
        assert_eq!(out.to_string(), "[0.1]");
    }

    #[test]
    fn test_dictionary_json_rejects_duplicates() {
        let reg = registry();
        let json: Json = serde_json::from_str(r#"[["a", 1], ["a", 2]]"#).unwrap();
        let err = reg
            .value_from_json(
                &json,
                &TypeDesc::dictionary(TypeDesc::String, TypeDesc::Int(IntKind::I32)),
            )
            .unwrap_err();
        assert!(err.is_invalid_cell_value());
    }
}
