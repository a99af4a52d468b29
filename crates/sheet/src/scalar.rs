//! Plain (non-JSON) text conversion for single values.
//!
//! Numbers use Rust's shortest round-trip formatting, which is locale
//! independent; `f32` fields are formatted at `f32` precision so they parse
//! back to the identical value.

use crate::error::{Result, TableError};
use crate::types::{FloatKind, IntKind, TypeDesc, TypeRegistry};
use crate::value::{AssetRef, Color, Value};
use regex::Regex;
use std::sync::OnceLock;

/// Placeholder for missing or default values in flattened text.
pub const NULL_TOKEN: &str = "null";

fn rgba_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)rgba\(\s*([^,]+?)\s*,\s*([^,]+?)\s*,\s*([^,]+?)\s*,\s*([^)]+?)\s*\)$")
            .expect("valid RGBA regex")
    })
}

fn hex_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})?$")
            .expect("valid hex color regex")
    })
}

/// Format a value as scalar text for its declared type.
#[must_use]
pub fn format_scalar(value: &Value, desc: &TypeDesc) -> String {
    match (value, desc) {
        (Value::Null, _) => NULL_TOKEN.to_string(),
        (Value::Float(f), TypeDesc::Float(FloatKind::F32)) => (*f as f32).to_string(),
        (Value::Char('\0'), _) => String::new(),
        (Value::Color(c), _) => c.to_string(),
        (Value::Reference(_), _) => value.to_json().to_string(),
        _ => value.to_string(),
    }
}

/// Parse scalar text into a value of the declared type.
///
/// The caller handles the [`NULL_TOKEN`] sentinel; this function parses the
/// text literally.
pub fn parse_scalar(text: &str, desc: &TypeDesc, registry: &TypeRegistry) -> Result<Value> {
    let fail = || TableError::Parse(format!("Cannot parse '{text}' as {desc}"));

    match desc {
        TypeDesc::Bool => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        TypeDesc::Int(IntKind::U64) => text.trim().parse::<u64>().map(Value::UInt).map_err(|_| fail()),
        TypeDesc::Int(kind) => {
            let n = text.trim().parse::<i64>().map_err(|_| fail())?;
            let (min, max) = kind.bounds();
            if n < min || n > max {
                return Err(TableError::Parse(format!(
                    "{n} is out of range for {}",
                    kind.name()
                )));
            }
            Ok(Value::Int(n))
        }
        TypeDesc::Float(FloatKind::F32) => text
            .trim()
            .parse::<f32>()
            .map(|f| Value::Float(f64::from(f)))
            .map_err(|_| fail()),
        TypeDesc::Float(FloatKind::F64) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| fail()),
        TypeDesc::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (None, _) => Ok(Value::Char('\0')),
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(fail()),
            }
        }
        TypeDesc::String => Ok(Value::String(text.to_string())),
        TypeDesc::Enum(name) => {
            let ty = registry
                .enum_type(name)
                .ok_or_else(|| TableError::UnknownType(name.clone()))?;
            ty.parse(text).map(Value::Enum)
        }
        TypeDesc::Color => parse_color(text).map(Value::Color).ok_or_else(fail),
        TypeDesc::Curve => Ok(Value::Curve(serde_json::from_str(text)?)),
        TypeDesc::Gradient => Ok(Value::Gradient(serde_json::from_str(text)?)),
        TypeDesc::LayerMask => text.trim().parse::<u32>().map(Value::LayerMask).map_err(|_| fail()),
        TypeDesc::Reference(_) => {
            let trimmed = text.trim();
            if trimmed.starts_with('{') {
                Ok(Value::Reference(serde_json::from_str::<AssetRef>(trimmed)?))
            } else {
                Ok(Value::Reference(AssetRef::new(String::new(), trimmed)))
            }
        }
        TypeDesc::List(_) | TypeDesc::Dictionary(..) | TypeDesc::Object(_) => {
            let json: serde_json::Value = serde_json::from_str(text)?;
            registry.value_from_json(&json, desc)
        }
        TypeDesc::Other(name) => Err(TableError::Unsupported(format!(
            "No text form for type {name}"
        ))),
    }
}

/// Parse `RGBA(r, g, b, a)`, `#RRGGBB`, `#RRGGBBAA` or a JSON color object.
#[must_use]
pub fn parse_color(text: &str) -> Option<Color> {
    let text = text.trim();
    if let Some(caps) = rgba_regex().captures(text) {
        let channel = |i: usize| caps.get(i)?.as_str().parse::<f32>().ok();
        return Some(Color::rgba(channel(1)?, channel(2)?, channel(3)?, channel(4)?));
    }
    if let Some(caps) = hex_regex().captures(text) {
        let channel = |i: usize| {
            caps.get(i)
                .map(|m| u8::from_str_radix(m.as_str(), 16).map(|v| f32::from(v) / 255.0))
        };
        let r = channel(1)?.ok()?;
        let g = channel(2)?.ok()?;
        let b = channel(3)?.ok()?;
        let a = channel(4).transpose().ok()?.unwrap_or(1.0);
        return Some(Color::rgba(r, g, b, a));
    }
    if text.starts_with('{') {
        return serde_json::from_str(text).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_precision_roundtrip() {
        let reg = TypeRegistry::new();
        let f32_ty = TypeDesc::Float(FloatKind::F32);
        let value = Value::Float(f64::from(0.1f32));
        let text = format_scalar(&value, &f32_ty);
        assert_eq!(text, "0.1");
        assert_eq!(parse_scalar(&text, &f32_ty, &reg).unwrap(), value);
    }

    #[test]
    fn test_bool_literals() {
        let reg = TypeRegistry::new();
        assert_eq!(format_scalar(&Value::Bool(true), &TypeDesc::Bool), "true");
        assert_eq!(
            parse_scalar("False", &TypeDesc::Bool, &reg).unwrap(),
            Value::Bool(false)
        );
        assert!(parse_scalar("maybe", &TypeDesc::Bool, &reg).is_err());
    }

    #[test]
    fn test_int_bounds() {
        let reg = TypeRegistry::new();
        assert_eq!(
            parse_scalar("255", &TypeDesc::Int(IntKind::U8), &reg).unwrap(),
            Value::Int(255)
        );
        assert!(parse_scalar("256", &TypeDesc::Int(IntKind::U8), &reg).is_err());
        assert!(parse_scalar("-1", &TypeDesc::Int(IntKind::U32), &reg).is_err());
    }

    #[test]
    fn test_color_forms() {
        let c = Color::rgba(0.25, 0.5, 1.0, 0.75);
        assert_eq!(parse_color(&c.to_string()), Some(c));
        assert_eq!(
            parse_color("#FF000080"),
            Some(Color::rgba(1.0, 0.0, 0.0, 128.0 / 255.0))
        );
        assert_eq!(parse_color("#00FF00"), Some(Color::rgba(0.0, 1.0, 0.0, 1.0)));
        assert_eq!(parse_color("red"), None);
    }

    #[test]
    fn test_char_default() {
        let reg = TypeRegistry::new();
        assert_eq!(format_scalar(&Value::Char('\0'), &TypeDesc::Char), "");
        assert_eq!(
            parse_scalar("", &TypeDesc::Char, &reg).unwrap(),
            Value::Char('\0')
        );
        assert!(parse_scalar("ab", &TypeDesc::Char, &reg).is_err());
    }
}
